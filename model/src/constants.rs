// Label applied to every object the harness creates so that leftovers from an interrupted run can
// be found with a single selector.
pub const APP_LABEL_KEY: &str = "app";
pub const APP_LABEL: &str = "ilab-on-ocp-e2e";

// Prefixes for server-side name generation. Generated suffixes are what keep concurrent runs in
// the same cluster from colliding on cluster-scoped names.
pub const NAMESPACE_PREFIX: &str = "test-ns-";
pub const CONFIG_MAP_PREFIX: &str = "test-cm-";
pub const SERVICE_ACCOUNT_PREFIX: &str = "test-sa-";
pub const CLUSTER_ROLE_PREFIX: &str = "test-cr-";
pub const CLUSTER_ROLE_BINDING_PREFIX: &str = "test-crb-";
pub const SECRET_PREFIX: &str = "test-secret-";
pub const WORKBENCH_POD_PREFIX: &str = "test-workbench-pod-";

// Environment variables. These names are the literal contract with CI.
pub const ENV_WORKBENCH_IMAGE: &str = "RHELAI_WORKBENCH_IMAGE";
pub const ENV_RUN_TIMEOUT: &str = "TEST_RUN_TIMEOUT";
pub const ENV_STORAGE_BUCKET: &str = "AWS_STORAGE_BUCKET";
pub const ENV_STORAGE_ACCESS_KEY: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_STORAGE_SECRET_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_STORAGE_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_STORAGE_ENDPOINT: &str = "AWS_DEFAULT_ENDPOINT";
pub const ENV_STORAGE_DATA_KEY: &str = "SDG_OBJECT_STORE_DATA_KEY";
pub const ENV_STORAGE_VERIFY_TLS: &str = "SDG_OBJECT_STORE_VERIFY_TLS";
pub const ENV_STORAGE_CLASS: &str = "TEST_ILAB_STORAGE_CLASS_NAME";
pub const ENV_TEST_NAMESPACE: &str = "TEST_NAMESPACE";
pub const ENV_TEST_SERVICE_ACCOUNT: &str = "TEST_SERVICE_ACCOUNT";
pub const ENV_SAMPLING_SIZE: &str = "SDG_SAMPLING_SIZE";
pub const ENV_JUDGE_API_KEY: &str = "JUDGE_API_KEY";
pub const ENV_JUDGE_NAME: &str = "JUDGE_NAME";
pub const ENV_JUDGE_ENDPOINT: &str = "JUDGE_ENDPOINT";
pub const ENV_JUDGE_CA_FROM_OPENSHIFT: &str = "JUDGE_CA_CERT_FROM_OPENSHIFT";
pub const ENV_SDG_API_KEY: &str = "SDG_SERVING_MODEL_API_KEY";
pub const ENV_SDG_NAME: &str = "SDG_NAME";
pub const ENV_SDG_ENDPOINT: &str = "SDG_ENDPOINT";
pub const ENV_SDG_CA_FROM_OPENSHIFT: &str = "SDG_CA_CERT_FROM_OPENSHIFT";

// Defaults used when the optional environment variables are absent.
pub const DEFAULT_WORKBENCH_IMAGE: &str =
    "quay.io/opendatahub/workbench-images:jupyter-datascience-ubi9-python-3.11-20241004-609ffb8";
pub const DEFAULT_STORAGE_CLASS: &str = "nfs-csi";
// A reduced sample size keeps SDG and training times manageable. For a production-level run set
// SDG_SAMPLING_SIZE to 1.0.
pub const DEFAULT_SAMPLING_SIZE: &str = "0.0002";
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 10 * 60 * 60;
pub const POLL_INTERVAL_SECS: u64 = 2;

// Workbench pod details.
pub const WORKBENCH_CONTAINER: &str = "workbench-container";
pub const SCRIPT_CONFIG_MAP_KEY: &str = "standalone.py";
pub const SCRIPT_MOUNT_PATH: &str = "/home/standalone.py";
pub const SCRIPT_VOLUME: &str = "script-volume";
pub const SDG_PIPELINE_DIR: &str = "/usr/share/instructlab/sdg/pipelines/agentic";

// Keys of the object-store credentials secret. The workbench pod sources each one into its
// environment individually.
pub const KEY_BUCKET: &str = "bucket";
pub const KEY_ACCESS_KEY: &str = "access_key";
pub const KEY_SECRET_KEY: &str = "secret_key";
pub const KEY_DATA_KEY: &str = "data_key";
pub const KEY_ENDPOINT: &str = "endpoint";
pub const KEY_REGION: &str = "region";
pub const KEY_VERIFY_TLS: &str = "verify_tls";

// The well-known root-CA config map every OpenShift namespace carries, and the key of the
// certificate within it. Referenced from the serving-model secrets when the platform CA toggle is
// set instead of literal certificate material.
pub const PLATFORM_CA_CONFIG_MAP: &str = "kube-root-ca.crt";
pub const PLATFORM_CA_KEY: &str = "ca.crt";

// The distributed-training job kind the workflow script creates.
pub const TRAINING_API_GROUP: &str = "kubeflow.org";
pub const TRAINING_JOB_PLURAL: &str = "pytorchjobs";
