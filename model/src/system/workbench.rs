use super::run_labels;
use crate::config::RunConfig;
use crate::constants::{
    CONFIG_MAP_PREFIX, KEY_ACCESS_KEY, KEY_BUCKET, KEY_DATA_KEY, KEY_ENDPOINT, KEY_REGION,
    KEY_SECRET_KEY, KEY_VERIFY_TLS, SCRIPT_CONFIG_MAP_KEY, SCRIPT_MOUNT_PATH, SCRIPT_VOLUME,
    SDG_PIPELINE_DIR, WORKBENCH_CONTAINER, WORKBENCH_POD_PREFIX,
};
use k8s_openapi::api::core::v1::{
    Capabilities, ConfigMap, ConfigMapVolumeSource, Container, EnvVar, EnvVarSource, Pod, PodSpec,
    SeccompProfile, SecretKeySelector, SecurityContext, Volume, VolumeMount,
};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// Names the workbench pod composition depends on: the run configuration plus the
/// server-assigned names of the objects provisioned before it.
#[derive(Debug, Clone)]
pub struct WorkbenchPod<'a> {
    pub config: &'a RunConfig,
    pub namespace: &'a str,
    pub service_account: &'a str,
    pub script_config_map: &'a str,
    pub object_store_secret: &'a str,
    pub sdg_model_secret: &'a str,
    pub judge_model_secret: &'a str,
}

/// Defines the config map carrying the workflow script, mounted into the workbench pod.
pub fn script_config_map(namespace: &str, data: BTreeMap<String, String>) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            generate_name: Some(CONFIG_MAP_PREFIX.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

/// Defines the pod that runs the workflow script. The container is hardened (no added
/// capabilities, no privilege escalation, runtime-default seccomp) and sources the object-store
/// credentials from the secret key by key.
pub fn workbench_pod(params: &WorkbenchPod<'_>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            generate_name: Some(WORKBENCH_POD_PREFIX.to_string()),
            namespace: Some(params.namespace.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            service_account_name: Some(params.service_account.to_string()),
            restart_policy: Some("OnFailure".to_string()),
            containers: vec![Container {
                name: WORKBENCH_CONTAINER.to_string(),
                image: Some(params.config.workbench_image.clone()),
                command: Some(workbench_command(params)),
                env: Some(container_env(
                    params.object_store_secret,
                    params.judge_model_secret,
                )),
                security_context: Some(SecurityContext {
                    allow_privilege_escalation: Some(false),
                    capabilities: Some(Capabilities {
                        drop: Some(vec!["ALL".to_string()]),
                        ..Default::default()
                    }),
                    seccomp_profile: Some(SeccompProfile {
                        type_: "RuntimeDefault".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                volume_mounts: Some(vec![VolumeMount {
                    name: SCRIPT_VOLUME.to_string(),
                    mount_path: SCRIPT_MOUNT_PATH.to_string(),
                    sub_path: Some(SCRIPT_CONFIG_MAP_KEY.to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: SCRIPT_VOLUME.to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: Some(params.script_config_map.to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The command line handed to the workflow script. Kept separate from the pod composition so the
/// rendered arguments can be checked against the configuration that produced them.
pub fn workbench_command(params: &WorkbenchPod<'_>) -> Vec<String> {
    let nproc_per_node = params.config.nproc_per_node.to_string();
    [
        "python3",
        SCRIPT_MOUNT_PATH,
        "run",
        "--namespace",
        params.namespace,
        "--judge-serving-model-secret",
        params.judge_model_secret,
        "--sdg-serving-model-secret",
        params.sdg_model_secret,
        "--sdg-in-cluster",
        "--sdg-pipeline",
        SDG_PIPELINE_DIR,
        "--sdg-sampling-size",
        &params.config.sampling_size,
        "--nproc-per-node",
        &nproc_per_node,
        "--storage-class",
        &params.config.storage_class,
        "--sdg-object-store-secret",
        params.object_store_secret,
        "--taxonomy-repo-pr",
        "-1",
        "--force-pull",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn secret_env(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: Some(secret.to_string()),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn container_env(object_store_secret: &str, judge_model_secret: &str) -> Vec<EnvVar> {
    vec![
        secret_env("SDG_OBJECT_STORE_ENDPOINT", object_store_secret, KEY_ENDPOINT),
        secret_env("SDG_OBJECT_STORE_BUCKET", object_store_secret, KEY_BUCKET),
        secret_env(
            "SDG_OBJECT_STORE_ACCESS_KEY",
            object_store_secret,
            KEY_ACCESS_KEY,
        ),
        secret_env(
            "SDG_OBJECT_STORE_SECRET_KEY",
            object_store_secret,
            KEY_SECRET_KEY,
        ),
        secret_env("SDG_OBJECT_STORE_REGION", object_store_secret, KEY_REGION),
        secret_env("SDG_OBJECT_STORE_DATA_KEY", object_store_secret, KEY_DATA_KEY),
        secret_env(
            "SDG_OBJECT_STORE_VERIFY_TLS",
            object_store_secret,
            KEY_VERIFY_TLS,
        ),
        EnvVar {
            name: "JUDGE_SERVING_MODEL_SECRET".to_string(),
            value: Some(judge_model_secret.to_string()),
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::config::{ObjectStoreConfig, ServingModelConfig};
    use std::time::Duration;

    fn config() -> RunConfig {
        RunConfig {
            workbench_image: "quay.io/example/workbench:latest".to_string(),
            storage_class: "nfs-csi".to_string(),
            timeout: Duration::from_secs(3600),
            namespace: None,
            service_account: None,
            nproc_per_node: 2,
            sampling_size: "0.0002".to_string(),
            object_store: ObjectStoreConfig::default(),
            sdg: ServingModelConfig::default(),
            judge: ServingModelConfig::default(),
        }
    }

    fn params(config: &RunConfig) -> WorkbenchPod<'_> {
        WorkbenchPod {
            config,
            namespace: "test-ns-abc12",
            service_account: "test-sa-def34",
            script_config_map: "test-cm-ghi56",
            object_store_secret: "test-secret-jkl78",
            sdg_model_secret: "test-secret-mno90",
            judge_model_secret: "test-secret-pqr12",
        }
    }

    /// Walk a rendered command line back into its `--flag value` pairs and standalone switches.
    fn parse_command(
        command: &[String],
    ) -> (
        std::collections::BTreeMap<String, String>,
        Vec<String>,
    ) {
        let mut values = std::collections::BTreeMap::new();
        let mut switches = Vec::new();
        let mut args = command.iter().skip(3).peekable();
        while let Some(arg) = args.next() {
            let flag = arg.strip_prefix("--").expect("expected a flag");
            match args.peek() {
                Some(next) if !next.starts_with("--") => {
                    values.insert(flag.to_string(), args.next().unwrap().to_string());
                }
                _ => switches.push(flag.to_string()),
            }
        }
        (values, switches)
    }

    #[test]
    fn command_round_trips_the_configuration() {
        let config = config();
        let params = params(&config);
        let command = workbench_command(&params);
        assert_eq!(
            &command[..3],
            &["python3".to_string(), SCRIPT_MOUNT_PATH.to_string(), "run".to_string()]
        );

        let (values, switches) = parse_command(&command);
        assert_eq!(values.get("namespace").unwrap(), params.namespace);
        assert_eq!(
            values.get("judge-serving-model-secret").unwrap(),
            params.judge_model_secret
        );
        assert_eq!(
            values.get("sdg-serving-model-secret").unwrap(),
            params.sdg_model_secret
        );
        assert_eq!(
            values.get("sdg-object-store-secret").unwrap(),
            params.object_store_secret
        );
        assert_eq!(values.get("sdg-pipeline").unwrap(), SDG_PIPELINE_DIR);
        assert_eq!(values.get("sdg-sampling-size").unwrap(), &config.sampling_size);
        assert_eq!(
            values.get("nproc-per-node").unwrap(),
            &config.nproc_per_node.to_string()
        );
        assert_eq!(values.get("storage-class").unwrap(), &config.storage_class);
        assert_eq!(switches, vec!["sdg-in-cluster", "force-pull"]);
    }

    #[test]
    fn taxonomy_pr_sentinel_stays_attached_to_its_flag() {
        let config = config();
        let command = workbench_command(&params(&config));
        let at = command
            .iter()
            .position(|arg| arg == "--taxonomy-repo-pr")
            .unwrap();
        assert_eq!(command[at + 1], "-1");
    }

    #[test]
    fn object_store_env_is_sourced_key_by_key() {
        let config = config();
        let params = params(&config);
        let pod = workbench_pod(&params);
        let container = &pod.spec.as_ref().unwrap().containers[0];
        let env = container.env.as_ref().unwrap();

        let sourced: Vec<&EnvVar> = env
            .iter()
            .filter(|var| var.value_from.is_some())
            .collect();
        assert_eq!(sourced.len(), 7);
        for var in sourced {
            let selector = var
                .value_from
                .as_ref()
                .unwrap()
                .secret_key_ref
                .as_ref()
                .expect("env var not sourced from a secret");
            assert_eq!(selector.name.as_deref(), Some(params.object_store_secret));
        }

        let judge = env
            .iter()
            .find(|var| var.name == "JUDGE_SERVING_MODEL_SECRET")
            .unwrap();
        assert_eq!(judge.value.as_deref(), Some(params.judge_model_secret));
    }

    #[test]
    fn container_is_hardened() {
        let config = config();
        let pod = workbench_pod(&params(&config));
        let spec = pod.spec.unwrap();
        assert_eq!(spec.restart_policy.as_deref(), Some("OnFailure"));
        assert_eq!(spec.service_account_name.as_deref(), Some("test-sa-def34"));
        let security = spec.containers[0].security_context.as_ref().unwrap();
        assert_eq!(security.allow_privilege_escalation, Some(false));
        assert_eq!(
            security.capabilities.as_ref().unwrap().drop,
            Some(vec!["ALL".to_string()])
        );
        assert_eq!(
            security.seccomp_profile.as_ref().unwrap().type_,
            "RuntimeDefault"
        );
    }

    #[test]
    fn script_is_mounted_from_the_config_map() {
        let config = config();
        let params = params(&config);
        let pod = workbench_pod(&params);
        let spec = pod.spec.unwrap();
        let mount = &spec.containers[0].volume_mounts.as_ref().unwrap()[0];
        assert_eq!(mount.mount_path, SCRIPT_MOUNT_PATH);
        assert_eq!(mount.sub_path.as_deref(), Some(SCRIPT_CONFIG_MAP_KEY));
        let volume = &spec.volumes.as_ref().unwrap()[0];
        assert_eq!(mount.name, volume.name);
        assert_eq!(
            volume.config_map.as_ref().unwrap().name.as_deref(),
            Some(params.script_config_map)
        );
    }
}
