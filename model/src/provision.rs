/*!

The `provision` module creates the disposable cluster objects a run needs. Each operation blocks
until the API server acknowledges the create, returns the server-assigned object, and registers
the created object for teardown. Any create failure is fatal; an end-to-end run on a broken
cluster should stop rather than proceed with partial setup.

!*/

use crate::cleanup::{CleanupAction, CleanupStack};
use crate::system;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Pod, Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use kube::api::PostParams;
use kube::{Api, Client};
use log::info;
use snafu::{OptionExt, ResultExt, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to create {}: {}", what, source))]
    Create {
        what: &'static str,
        source: kube::Error,
    },

    #[snafu(display("Unable to get {} '{}': {}", what, name, source))]
    Get {
        what: &'static str,
        name: String,
        source: kube::Error,
    },

    #[snafu(display("The server returned a {} with no name", what))]
    Unnamed { what: &'static str },

    #[snafu(display(
        "The service account '{}' named by the environment does not exist",
        name
    ))]
    ServiceAccountMissing { name: String },
}

impl Error {
    /// `true` when the error means the environment cannot host the run (skip), rather than the
    /// run having failed.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::ServiceAccountMissing { .. })
    }
}

/// The namespace a run works in, and whether this run created it. A borrowed namespace is never
/// deleted.
#[derive(Debug, Clone)]
pub struct RunNamespace {
    pub name: String,
    pub created: bool,
}

/// Creates the run's resources and remembers what it created.
pub struct Provisioner {
    client: Client,
    cleanup: CleanupStack,
}

impl Provisioner {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cleanup: CleanupStack::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Delete everything this provisioner created, most recent first. Best-effort; failures are
    /// logged by the cleanup stack and never returned.
    pub async fn teardown(&mut self) {
        let client = self.client.clone();
        self.cleanup.run_all(&client).await;
    }

    /// Use the pinned namespace if it exists, create it if it does not, or create one with a
    /// generated name when no namespace is pinned.
    pub async fn ensure_namespace(&mut self, requested: Option<&str>) -> Result<RunNamespace> {
        let api = Api::<Namespace>::all(self.client.clone());
        if let Some(name) = requested {
            if api
                .get_opt(name)
                .await
                .context(GetSnafu {
                    what: "namespace",
                    name,
                })?
                .is_some()
            {
                info!("Using existing namespace '{}'", name);
                return Ok(RunNamespace {
                    name: name.to_string(),
                    created: false,
                });
            }
        }

        let created = api
            .create(
                &PostParams::default(),
                &system::test_namespace(requested),
            )
            .await
            .context(CreateSnafu { what: "namespace" })?;
        let name = require_name(&created.metadata.name, "namespace")?;
        self.cleanup
            .push(CleanupAction::Namespace { name: name.clone() });
        info!("Created namespace '{}' successfully", name);
        Ok(RunNamespace {
            name,
            created: true,
        })
    }

    pub async fn create_config_map(
        &mut self,
        namespace: &str,
        config_map: ConfigMap,
    ) -> Result<ConfigMap> {
        let api = Api::<ConfigMap>::namespaced(self.client.clone(), namespace);
        let created = api
            .create(&PostParams::default(), &config_map)
            .await
            .context(CreateSnafu { what: "config map" })?;
        let name = require_name(&created.metadata.name, "config map")?;
        self.cleanup.push(CleanupAction::ConfigMap {
            namespace: namespace.to_string(),
            name: name.clone(),
        });
        info!("Created ConfigMap '{}' successfully", name);
        Ok(created)
    }

    /// Resolve the run's service account. An explicitly named account is borrowed when it exists
    /// and is a precondition failure when it does not; with no explicit name a disposable account
    /// is created.
    pub async fn ensure_service_account(
        &mut self,
        namespace: &str,
        explicit: Option<&str>,
    ) -> Result<ServiceAccount> {
        let api = Api::<ServiceAccount>::namespaced(self.client.clone(), namespace);
        if let Some(name) = explicit {
            let existing = api
                .get_opt(name)
                .await
                .context(GetSnafu {
                    what: "service account",
                    name,
                })?
                .context(ServiceAccountMissingSnafu { name })?;
            info!("Using existing ServiceAccount '{}'", name);
            return Ok(existing);
        }

        let created = api
            .create(
                &PostParams::default(),
                &system::workbench_service_account(namespace, None),
            )
            .await
            .context(CreateSnafu {
                what: "service account",
            })?;
        let name = require_name(&created.metadata.name, "service account")?;
        self.cleanup.push(CleanupAction::ServiceAccount {
            namespace: namespace.to_string(),
            name: name.clone(),
        });
        info!("Created ServiceAccount '{}/{}' successfully", namespace, name);
        Ok(created)
    }

    pub async fn create_cluster_role(&mut self, role: ClusterRole) -> Result<ClusterRole> {
        let api = Api::<ClusterRole>::all(self.client.clone());
        let created = api
            .create(&PostParams::default(), &role)
            .await
            .context(CreateSnafu {
                what: "cluster role",
            })?;
        let name = require_name(&created.metadata.name, "cluster role")?;
        self.cleanup
            .push(CleanupAction::ClusterRole { name: name.clone() });
        info!("Created ClusterRole '{}' successfully", name);
        Ok(created)
    }

    pub async fn create_cluster_role_binding(
        &mut self,
        binding: ClusterRoleBinding,
    ) -> Result<ClusterRoleBinding> {
        let api = Api::<ClusterRoleBinding>::all(self.client.clone());
        let created = api
            .create(&PostParams::default(), &binding)
            .await
            .context(CreateSnafu {
                what: "cluster role binding",
            })?;
        let name = require_name(&created.metadata.name, "cluster role binding")?;
        self.cleanup
            .push(CleanupAction::ClusterRoleBinding { name: name.clone() });
        info!("Created ClusterRoleBinding '{}' successfully", name);
        Ok(created)
    }

    pub async fn create_secret(&mut self, namespace: &str, secret: Secret) -> Result<Secret> {
        let api = Api::<Secret>::namespaced(self.client.clone(), namespace);
        let created = api
            .create(&PostParams::default(), &secret)
            .await
            .context(CreateSnafu { what: "secret" })?;
        let name = require_name(&created.metadata.name, "secret")?;
        self.cleanup.push(CleanupAction::Secret {
            namespace: namespace.to_string(),
            name: name.clone(),
        });
        info!("Created Secret '{}' successfully", name);
        Ok(created)
    }

    pub async fn create_pod(&mut self, namespace: &str, pod: Pod) -> Result<Pod> {
        let api = Api::<Pod>::namespaced(self.client.clone(), namespace);
        let created = api
            .create(&PostParams::default(), &pod)
            .await
            .context(CreateSnafu { what: "pod" })?;
        let name = require_name(&created.metadata.name, "pod")?;
        self.cleanup.push(CleanupAction::Pod {
            namespace: namespace.to_string(),
            name: name.clone(),
        });
        info!("Created Pod '{}' successfully", name);
        Ok(created)
    }
}

fn require_name(name: &Option<String>, what: &'static str) -> Result<String> {
    name.clone().context(UnnamedSnafu { what })
}
