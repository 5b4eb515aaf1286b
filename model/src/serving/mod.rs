/// Declarative manifests for serving the workflow's models. These are rendered to YAML by the
/// `yamlgen` crate rather than applied by the harness itself.
mod import;
mod inference;

pub use import::{model_import_job, model_volume_claim, ModelImport};
pub use inference::{
    inference_service, InferenceService, InferenceServiceSpec, ModelFormat, ModelSpec,
    PredictorSpec, ServingModel,
};
