/*!

Teardown for the resources a run creates. Every successful create pushes a [`CleanupAction`] onto
the run's [`CleanupStack`]; at the end of the run — pass, fail or timeout — the stack executes in
reverse registration order, so a partial setup still removes everything registered before the
failure. Deletion errors are logged and never propagated: cleanup must not mask the run's
verdict.

!*/

use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::api::DeleteParams;
use kube::{Api, Client};
use log::{info, warn};
use std::fmt;

/// A single teardown step for one resource this run created. Borrowed resources (a pre-existing
/// namespace or service account) never become actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    Namespace { name: String },
    ClusterRole { name: String },
    ClusterRoleBinding { name: String },
    ServiceAccount { namespace: String, name: String },
    Secret { namespace: String, name: String },
    ConfigMap { namespace: String, name: String },
    Pod { namespace: String, name: String },
}

impl CleanupAction {
    async fn delete(&self, client: &Client) -> Result<(), kube::Error> {
        let params = DeleteParams::default();
        match self {
            Self::Namespace { name } => {
                Api::<Namespace>::all(client.clone())
                    .delete(name, &params)
                    .await?;
            }
            Self::ClusterRole { name } => {
                Api::<ClusterRole>::all(client.clone())
                    .delete(name, &params)
                    .await?;
            }
            Self::ClusterRoleBinding { name } => {
                Api::<ClusterRoleBinding>::all(client.clone())
                    .delete(name, &params)
                    .await?;
            }
            Self::ServiceAccount { namespace, name } => {
                Api::<ServiceAccount>::namespaced(client.clone(), namespace)
                    .delete(name, &params)
                    .await?;
            }
            Self::Secret { namespace, name } => {
                Api::<Secret>::namespaced(client.clone(), namespace)
                    .delete(name, &params)
                    .await?;
            }
            Self::ConfigMap { namespace, name } => {
                Api::<ConfigMap>::namespaced(client.clone(), namespace)
                    .delete(name, &params)
                    .await?;
            }
            Self::Pod { namespace, name } => {
                Api::<Pod>::namespaced(client.clone(), namespace)
                    .delete(name, &params)
                    .await?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Namespace { name } => write!(f, "Namespace '{}'", name),
            Self::ClusterRole { name } => write!(f, "ClusterRole '{}'", name),
            Self::ClusterRoleBinding { name } => write!(f, "ClusterRoleBinding '{}'", name),
            Self::ServiceAccount { namespace, name } => {
                write!(f, "ServiceAccount '{}/{}'", namespace, name)
            }
            Self::Secret { namespace, name } => write!(f, "Secret '{}/{}'", namespace, name),
            Self::ConfigMap { namespace, name } => {
                write!(f, "ConfigMap '{}/{}'", namespace, name)
            }
            Self::Pod { namespace, name } => write!(f, "Pod '{}/{}'", namespace, name),
        }
    }
}

/// The ordered teardown list for one run.
#[derive(Debug, Default)]
pub struct CleanupStack {
    actions: Vec<CleanupAction>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: CleanupAction) {
        self.actions.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Delete everything registered, most recently created first. Failures are logged and do not
    /// stop the remaining deletions.
    pub async fn run_all(&mut self, client: &Client) {
        while let Some(action) = self.actions.pop() {
            match action.delete(client).await {
                Ok(()) => info!("Deleted {}", action),
                Err(err) => warn!("Unable to delete {}: {}", action, err),
            }
        }
    }
}
