use super::run_labels;
use crate::constants::NAMESPACE_PREFIX;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::ObjectMeta;

/// Defines the namespace for a run. A pinned name targets that namespace; without one the server
/// generates a unique name.
pub fn test_namespace(name: Option<&str>) -> Namespace {
    let metadata = match name {
        Some(name) => ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
        None => ObjectMeta {
            generate_name: Some(NAMESPACE_PREFIX.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
    };
    Namespace {
        metadata,
        ..Default::default()
    }
}
