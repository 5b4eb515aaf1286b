use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, PersistentVolumeClaim, PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource,
    PodSpec, PodTemplateSpec, ResourceRequirements, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use maplit::btreemap;

const MODEL_VOLUME: &str = "model-storage";
const MODEL_MOUNT_PATH: &str = "/mnt/models";
const AUTH_VOLUME: &str = "registry-auth";
const AUTH_MOUNT_PATH: &str = "/auth";
const AUTH_FILE: &str = "/auth/.dockerconfigjson";
const COPY_IMAGE: &str = "quay.io/skopeo/stable:v1.14";

/// Inputs for the one-shot job that copies a model artifact out of an OCI registry and onto the
/// serving volume.
#[derive(Clone, Debug)]
pub struct ModelImport {
    pub name: String,
    /// Source reference of the model artifact, e.g.
    /// `docker://registry.redhat.io/rhelai1/modelcar-mixtral-8x7b-instruct-v0-1:1.4`.
    pub image_ref: String,
    /// The claim the model lands on.
    pub claim_name: String,
    /// Secret holding a registry auth file under the `.dockerconfigjson` key.
    pub pull_creds_secret: String,
}

/// Defines the claim that backs the serving volume.
pub fn model_volume_claim(
    namespace: &str,
    name: &str,
    storage_class: &str,
    size: &str,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: Some(storage_class.to_string()),
            resources: Some(ResourceRequirements {
                requests: Some(btreemap! {
                    "storage".to_string() => Quantity(size.to_string())
                }),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Defines the copy job. It runs once, mounts the registry credentials read-only, and writes the
/// artifact under the claim's mount.
pub fn model_import_job(namespace: &str, import: &ModelImport) -> Job {
    Job {
        metadata: ObjectMeta {
            name: Some(import.name.clone()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(2),
            template: PodTemplateSpec {
                metadata: None,
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    containers: vec![Container {
                        name: "model-import".to_string(),
                        image: Some(COPY_IMAGE.to_string()),
                        command: Some(import_command(import)),
                        volume_mounts: Some(vec![
                            VolumeMount {
                                name: MODEL_VOLUME.to_string(),
                                mount_path: MODEL_MOUNT_PATH.to_string(),
                                ..Default::default()
                            },
                            VolumeMount {
                                name: AUTH_VOLUME.to_string(),
                                mount_path: AUTH_MOUNT_PATH.to_string(),
                                read_only: Some(true),
                                ..Default::default()
                            },
                        ]),
                        ..Default::default()
                    }],
                    volumes: Some(vec![
                        Volume {
                            name: MODEL_VOLUME.to_string(),
                            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                                claim_name: import.claim_name.clone(),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                        Volume {
                            name: AUTH_VOLUME.to_string(),
                            secret: Some(SecretVolumeSource {
                                secret_name: Some(import.pull_creds_secret.clone()),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                    ]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn import_command(import: &ModelImport) -> Vec<String> {
    vec![
        "skopeo".to_string(),
        "copy".to_string(),
        "--authfile".to_string(),
        AUTH_FILE.to_string(),
        import.image_ref.clone(),
        format!("oci:{}/model", MODEL_MOUNT_PATH),
    ]
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn import() -> ModelImport {
        ModelImport {
            name: "import-mixtral".to_string(),
            image_ref:
                "docker://registry.redhat.io/rhelai1/modelcar-mixtral-8x7b-instruct-v0-1:1.4"
                    .to_string(),
            claim_name: "sdg-model-storage".to_string(),
            pull_creds_secret: "registry-pull-creds".to_string(),
        }
    }

    #[test]
    fn job_runs_once_and_copies_onto_the_claim() {
        let job = model_import_job("serving", &import());
        let spec = job.spec.unwrap();
        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));

        let command = pod.containers[0].command.as_ref().unwrap();
        assert_eq!(command[0], "skopeo");
        assert!(command.last().unwrap().starts_with("oci:/mnt/models"));

        let volumes = pod.volumes.as_ref().unwrap();
        let claim = volumes
            .iter()
            .find_map(|v| v.persistent_volume_claim.as_ref())
            .unwrap();
        assert_eq!(claim.claim_name, "sdg-model-storage");
    }

    #[test]
    fn registry_credentials_are_mounted_read_only() {
        let job = model_import_job("serving", &import());
        let pod = job.spec.unwrap().template.spec.unwrap();
        let auth_mount = pod.containers[0]
            .volume_mounts
            .as_ref()
            .unwrap()
            .iter()
            .find(|m| m.name == AUTH_VOLUME)
            .unwrap();
        assert_eq!(auth_mount.read_only, Some(true));

        let secret = pod
            .volumes
            .as_ref()
            .unwrap()
            .iter()
            .find_map(|v| v.secret.as_ref())
            .unwrap();
        assert_eq!(secret.secret_name.as_deref(), Some("registry-pull-creds"));
    }

    #[test]
    fn claim_requests_storage_from_the_given_class() {
        let claim = model_volume_claim("serving", "sdg-model-storage", "nfs-csi", "100Gi");
        let spec = claim.spec.unwrap();
        assert_eq!(spec.storage_class_name.as_deref(), Some("nfs-csi"));
        assert_eq!(
            spec.resources
                .unwrap()
                .requests
                .unwrap()
                .get("storage"),
            Some(&Quantity("100Gi".to_string()))
        );
    }
}
