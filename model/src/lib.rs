/*!

This library provides the building blocks for validating an InstructLab-style
synthetic-data-generation and fine-tuning workflow end-to-end on an
OpenShift/Kubernetes cluster.

A run resolves its configuration from the environment once
([`config::RunConfig`]), provisions a disposable set of cluster objects — a
namespace, the workflow script config map, a service account with a cluster
role and binding, credential secrets, and the workbench pod that drives the
workflow ([`provision::Provisioner`], [`system`]) — then polls the pod until
it reaches a terminal phase ([`wait`]) and tears down everything it created
([`cleanup`]). The [`serving`] module models the declarative KServe
`InferenceService` manifests used to serve the resulting models; the
`yamlgen` crate renders them to YAML.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use cleanup::{CleanupAction, CleanupStack};
pub use config::{ObjectStoreConfig, RunConfig, ServingModelConfig};
pub use provision::{Provisioner, RunNamespace};
pub use run::{RunReport, TrainingRun};
pub use wait::{PhaseSource, PodPhase, PodPhaseSource, WaitSettings};

pub mod cleanup;
pub mod config;
pub mod constants;
pub mod provision;
pub mod run;
pub mod serving;
pub mod system;
pub mod wait;
