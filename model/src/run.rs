/*!

The single flow of a run: provision the disposable resources in order, launch the workbench pod,
wait for it to succeed, and tear down everything that was created regardless of the outcome.

!*/

use crate::config::RunConfig;
use crate::constants::SCRIPT_CONFIG_MAP_KEY;
use crate::provision::{self, Provisioner};
use crate::system::{self, ServingRole, WorkbenchPod};
use crate::wait::{self, PodPhaseSource, WaitSettings};
use kube::{Client, ResourceExt};
use log::info;
use maplit::btreemap;
use snafu::{ResultExt, Snafu};
use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}", source))]
    Provision { source: provision::Error },

    #[snafu(display("{}", source))]
    Watch { source: wait::Error },
}

impl Error {
    /// `true` when the run could not start in this environment and should be reported as skipped
    /// rather than failed.
    pub fn is_precondition(&self) -> bool {
        match self {
            Error::Provision { source } => source.is_precondition(),
            Error::Watch { .. } => false,
        }
    }
}

/// Where a run happened, for reporting.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub namespace: String,
    pub pod: String,
}

/// One end-to-end validation run of the training workflow.
pub struct TrainingRun {
    config: RunConfig,
    script: String,
    wait: WaitSettings,
    cancel: CancellationToken,
}

impl TrainingRun {
    /// A run for `config` that will execute `script` (the workflow script's content) in the
    /// workbench pod.
    pub fn new(config: RunConfig, script: String) -> Self {
        let wait = WaitSettings {
            timeout: config.timeout,
            ..Default::default()
        };
        Self {
            config,
            script,
            wait,
            cancel: CancellationToken::new(),
        }
    }

    /// A token an external caller can use to abort the completion wait promptly.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The completion-wait settings, for callers that want to tune the poll interval or turn off
    /// fail-fast.
    pub fn wait_settings_mut(&mut self) -> &mut WaitSettings {
        &mut self.wait
    }

    /// Execute the whole flow. Teardown of everything created runs whether the run passes,
    /// fails, or times out.
    pub async fn execute(&self, client: Client) -> Result<RunReport> {
        let mut provisioner = Provisioner::new(client);
        let result = self.provision_and_wait(&mut provisioner).await;
        provisioner.teardown().await;
        result
    }

    async fn provision_and_wait(&self, provisioner: &mut Provisioner) -> Result<RunReport> {
        let namespace = provisioner
            .ensure_namespace(self.config.namespace.as_deref())
            .await
            .context(ProvisionSnafu)?;
        let ns = namespace.name.as_str();

        let config_map = provisioner
            .create_config_map(
                ns,
                system::script_config_map(
                    ns,
                    btreemap! {
                        SCRIPT_CONFIG_MAP_KEY.to_string() => self.script.clone()
                    },
                ),
            )
            .await
            .context(ProvisionSnafu)?;

        let service_account = provisioner
            .ensure_service_account(ns, self.config.service_account.as_deref())
            .await
            .context(ProvisionSnafu)?;

        let cluster_role = provisioner
            .create_cluster_role(system::workbench_cluster_role())
            .await
            .context(ProvisionSnafu)?;

        let sa_name = service_account.name_any();
        provisioner
            .create_cluster_role_binding(system::workbench_cluster_role_binding(
                &sa_name,
                ns,
                &cluster_role.name_any(),
            ))
            .await
            .context(ProvisionSnafu)?;

        let object_store_secret = provisioner
            .create_secret(ns, system::object_store_secret(ns, &self.config.object_store))
            .await
            .context(ProvisionSnafu)?;
        let sdg_secret = provisioner
            .create_secret(
                ns,
                system::serving_model_secret(ns, ServingRole::Sdg, &self.config.sdg),
            )
            .await
            .context(ProvisionSnafu)?;
        let judge_secret = provisioner
            .create_secret(
                ns,
                system::serving_model_secret(ns, ServingRole::Judge, &self.config.judge),
            )
            .await
            .context(ProvisionSnafu)?;

        let cm_name = config_map.name_any();
        let object_store_name = object_store_secret.name_any();
        let sdg_name = sdg_secret.name_any();
        let judge_name = judge_secret.name_any();
        let params = WorkbenchPod {
            config: &self.config,
            namespace: ns,
            service_account: &sa_name,
            script_config_map: &cm_name,
            object_store_secret: &object_store_name,
            sdg_model_secret: &sdg_name,
            judge_model_secret: &judge_name,
        };
        let pod = provisioner
            .create_pod(ns, system::workbench_pod(&params))
            .await
            .context(ProvisionSnafu)?;
        let pod_name = pod.name_any();

        info!(
            "Waiting up to {:?} for pod '{}' to succeed",
            self.wait.timeout, pod_name
        );
        let mut source = PodPhaseSource::new(provisioner.client().clone(), ns, &pod_name);
        wait::wait_for_success(&mut source, &self.wait, &self.cancel)
            .await
            .context(WatchSnafu)?;
        info!("Pod '{}' succeeded", pod_name);

        Ok(RunReport {
            namespace: ns.to_string(),
            pod: pod_name,
        })
    }
}
