use super::run_labels;
use crate::constants::{
    CLUSTER_ROLE_BINDING_PREFIX, CLUSTER_ROLE_PREFIX, SERVICE_ACCOUNT_PREFIX, TRAINING_API_GROUP,
    TRAINING_JOB_PLURAL,
};
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use kube::api::ObjectMeta;

/// Defines the service account the workbench pod runs as. With no explicit name the server
/// generates one.
pub fn workbench_service_account(namespace: &str, name: Option<&str>) -> ServiceAccount {
    let metadata = match name {
        Some(name) => ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
        None => ObjectMeta {
            generate_name: Some(SERVICE_ACCOUNT_PREFIX.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
    };
    ServiceAccount {
        metadata,
        ..Default::default()
    }
}

/// Defines the cluster role granting the workflow script what it needs: it creates jobs, pods,
/// secrets, config maps, volumes and distributed-training jobs on the run's behalf and follows
/// their progress through logs and events.
pub fn workbench_cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: ObjectMeta {
            generate_name: Some(CLUSTER_ROLE_PREFIX.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
        rules: Some(workbench_policy_rules()),
        ..Default::default()
    }
}

/// The fixed policy attached to the workbench cluster role.
pub fn workbench_policy_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["pods/log".to_string()]),
            verbs: vec!["get", "list"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec!["batch".to_string()]),
            resources: Some(vec!["jobs".to_string()]),
            verbs: vec!["get", "list", "create", "watch"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["pods".to_string()]),
            verbs: vec!["get", "list", "create", "watch"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["secrets".to_string()]),
            verbs: vec!["get", "create"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["configmaps".to_string()]),
            verbs: vec!["get", "create"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec![
                "persistentvolumes".to_string(),
                "persistentvolumeclaims".to_string(),
            ]),
            verbs: vec!["list", "create"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec![TRAINING_API_GROUP.to_string()]),
            resources: Some(vec![TRAINING_JOB_PLURAL.to_string()]),
            verbs: vec!["get", "list", "create", "watch"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["events".to_string()]),
            verbs: vec!["get", "list", "watch"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        },
    ]
}

/// Defines the cluster role binding tying the run's service account to the workbench cluster
/// role.
pub fn workbench_cluster_role_binding(
    service_account: &str,
    namespace: &str,
    role: &str,
) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: ObjectMeta {
            generate_name: Some(CLUSTER_ROLE_BINDING_PREFIX.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: role.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: service_account.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn policy_covers_training_jobs() {
        let rules = workbench_policy_rules();
        let training = rules
            .iter()
            .find(|rule| {
                rule.api_groups == Some(vec![TRAINING_API_GROUP.to_string()])
            })
            .expect("no rule for the training job kind");
        assert_eq!(
            training.resources,
            Some(vec![TRAINING_JOB_PLURAL.to_string()])
        );
        assert_eq!(training.verbs, vec!["get", "list", "create", "watch"]);
    }

    #[test]
    fn log_access_is_read_only() {
        let rules = workbench_policy_rules();
        let logs = rules
            .iter()
            .find(|rule| rule.resources == Some(vec!["pods/log".to_string()]))
            .expect("no rule for pod logs");
        assert_eq!(logs.verbs, vec!["get", "list"]);
    }

    #[test]
    fn binding_references_subject_and_role() {
        let binding = workbench_cluster_role_binding("runner", "ns-1", "role-1");
        assert_eq!(binding.role_ref.name, "role-1");
        let subjects = binding.subjects.unwrap_or_default();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].name, "runner");
        assert_eq!(subjects[0].namespace.as_deref(), Some("ns-1"));
    }
}
