/// Encapsulates the K8S object definitions for the resources a run creates.
mod namespace;
mod rbac;
mod secrets;
mod workbench;

pub use namespace::test_namespace;
pub use rbac::{
    workbench_cluster_role, workbench_cluster_role_binding, workbench_policy_rules,
    workbench_service_account,
};
pub use secrets::{object_store_secret, serving_model_secret, ServingRole};
pub use workbench::{script_config_map, workbench_command, workbench_pod, WorkbenchPod};

use crate::constants::{APP_LABEL, APP_LABEL_KEY};
use maplit::btreemap;
use std::collections::BTreeMap;

/// The labels every object the harness creates carries.
pub(crate) fn run_labels() -> BTreeMap<String, String> {
    btreemap! {
        APP_LABEL_KEY.to_string() => APP_LABEL.to_string()
    }
}
