/*!

The serving manifests are modeled as Rust structs in the model crate. Here we generate the
corresponding k8s yaml file: the two `InferenceService`s the workflow consults (the SDG teacher
model and the judge model), the claim the model artifacts land on, and the one-shot import job
that fills it. Crates that depend on this file can add yamlgen as a build dependency to ensure it
is current. Scripts can call `cargo build --package yamlgen`.

!*/

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use trainsys_model::serving::{
    inference_service, model_import_job, model_volume_claim, ModelImport, ServingModel,
};

const YAMLGEN_DIR: &str = env!("CARGO_MANIFEST_DIR");
const HEADER: &str = "# This file is generated. Do not edit.\n";
const NAMESPACE: &str = "ilab-serving";
const MODEL_CLAIM: &str = "sdg-model-storage";

fn main() {
    // Re-run this build script if the model changes.
    println!("cargo:rerun-if-changed=../model/src");

    let path = PathBuf::from(YAMLGEN_DIR).join("deploy").join("serving.yaml");

    let mut f = File::create(&path).expect(&format!(
        "unable to open file '{}' for writing",
        path.display()
    ));

    f.write(HEADER.as_bytes())
        .expect("unable to write file header");

    let sdg = ServingModel::sdg_default();
    let judge = ServingModel::judge_default();
    serde_yaml::to_writer(&f, &inference_service(NAMESPACE, &sdg))
        .expect("unable to write the SDG InferenceService");
    serde_yaml::to_writer(&f, &inference_service(NAMESPACE, &judge))
        .expect("unable to write the judge InferenceService");
    serde_yaml::to_writer(
        &f,
        &model_volume_claim(NAMESPACE, MODEL_CLAIM, "nfs-csi", "100Gi"),
    )
    .expect("unable to write the model claim");
    serde_yaml::to_writer(
        &f,
        &model_import_job(
            NAMESPACE,
            &ModelImport {
                name: "import-mixtral-8x7b-instruct".to_string(),
                image_ref: format!("docker://{}", sdg.storage_uri.trim_start_matches("oci://")),
                claim_name: MODEL_CLAIM.to_string(),
                pull_creds_secret: "registry-pull-creds".to_string(),
            },
        ),
    )
    .expect("unable to write the model import job");
}
