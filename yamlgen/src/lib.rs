/*!

This crate is used to write out the YAML representation of the serving manifests: the KServe
`InferenceService` definitions and the model-import job. These constructs are defined in Rust in
the model crate; the YAML representations are what gets applied to a cluster.

This `lib.rs` file is intentionally empty as `yamlgen` provides a `build.rs` that is invoked
during builds of other crates that specify `yamlgen` as a `build-dependency`.

!*/
