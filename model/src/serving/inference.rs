use k8s_openapi::api::core::v1::{ResourceRequirements, Toleration};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use maplit::btreemap;
use serde::{Deserialize, Serialize};

/// A KServe `InferenceService` manifest. Only the fields this repository sets are modeled; the
/// CRD itself belongs to the cluster's KServe installation.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceService {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: InferenceServiceSpec,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InferenceServiceSpec {
    pub predictor: PredictorSpec,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictorSpec {
    pub min_replicas: i32,
    pub max_replicas: i32,
    pub model: ModelSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerations: Option<Vec<Toleration>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub model_format: ModelFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    pub resources: ResourceRequirements,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ModelFormat {
    pub name: String,
}

/// What to serve and how much hardware to give it.
#[derive(Clone, Debug)]
pub struct ServingModel {
    pub name: String,
    pub storage_uri: String,
    pub gpus: i64,
    pub tensor_parallel: i64,
    pub dtype: String,
    pub cpu: String,
    pub memory: String,
}

impl ServingModel {
    /// The teacher endpoint the SDG stage queries.
    pub fn sdg_default() -> Self {
        Self {
            name: "mixtral-8x7b-instruct".to_string(),
            storage_uri: "oci://registry.redhat.io/rhelai1/modelcar-mixtral-8x7b-instruct-v0-1:1.4"
                .to_string(),
            gpus: 4,
            tensor_parallel: 4,
            dtype: "bfloat16".to_string(),
            cpu: "8".to_string(),
            memory: "48Gi".to_string(),
        }
    }

    /// The judge endpoint consulted during evaluation.
    pub fn judge_default() -> Self {
        Self {
            name: "prometheus-8x7b-v2".to_string(),
            storage_uri: "oci://registry.redhat.io/rhelai1/modelcar-prometheus-8x7b-v2-0:1.4"
                .to_string(),
            gpus: 4,
            tensor_parallel: 4,
            dtype: "bfloat16".to_string(),
            cpu: "8".to_string(),
            memory: "48Gi".to_string(),
        }
    }
}

/// Defines the `InferenceService` for `model`: a single vLLM replica with identical resource
/// requests and limits, tolerating the GPU node taint.
pub fn inference_service(namespace: &str, model: &ServingModel) -> InferenceService {
    let resources = btreemap! {
        "cpu".to_string() => Quantity(model.cpu.clone()),
        "memory".to_string() => Quantity(model.memory.clone()),
        "nvidia.com/gpu".to_string() => Quantity(model.gpus.to_string()),
    };
    InferenceService {
        api_version: "serving.kserve.io/v1beta1".to_string(),
        kind: "InferenceService".to_string(),
        metadata: ObjectMeta {
            name: Some(model.name.clone()),
            namespace: Some(namespace.to_string()),
            annotations: Some(btreemap! {
                "serving.kserve.io/deploymentMode".to_string() => "RawDeployment".to_string()
            }),
            ..Default::default()
        },
        spec: InferenceServiceSpec {
            predictor: PredictorSpec {
                min_replicas: 1,
                max_replicas: 1,
                model: ModelSpec {
                    model_format: ModelFormat {
                        name: "vLLM".to_string(),
                    },
                    storage_uri: Some(model.storage_uri.clone()),
                    args: Some(vec![
                        format!("--tensor-parallel-size={}", model.tensor_parallel),
                        format!("--dtype={}", model.dtype),
                    ]),
                    resources: ResourceRequirements {
                        limits: Some(resources.clone()),
                        requests: Some(resources),
                        ..Default::default()
                    },
                },
                tolerations: Some(vec![Toleration {
                    key: Some("nvidia.com/gpu".to_string()),
                    operator: Some("Exists".to_string()),
                    effect: Some("NoSchedule".to_string()),
                    ..Default::default()
                }]),
            },
        },
    }
}
