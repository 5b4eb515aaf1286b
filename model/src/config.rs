/*!

The `config` module resolves the run configuration from the environment, once, at startup. The
resolver is a pure function over an injected lookup so that nothing ever re-reads process state
mid-run and tests can script the environment.

!*/

use crate::constants::{
    DEFAULT_RUN_TIMEOUT_SECS, DEFAULT_SAMPLING_SIZE, DEFAULT_STORAGE_CLASS,
    DEFAULT_WORKBENCH_IMAGE, ENV_JUDGE_API_KEY, ENV_JUDGE_CA_FROM_OPENSHIFT, ENV_JUDGE_ENDPOINT,
    ENV_JUDGE_NAME, ENV_RUN_TIMEOUT, ENV_SAMPLING_SIZE, ENV_SDG_API_KEY,
    ENV_SDG_CA_FROM_OPENSHIFT, ENV_SDG_ENDPOINT, ENV_SDG_NAME, ENV_STORAGE_ACCESS_KEY,
    ENV_STORAGE_BUCKET, ENV_STORAGE_CLASS, ENV_STORAGE_DATA_KEY, ENV_STORAGE_ENDPOINT,
    ENV_STORAGE_REGION, ENV_STORAGE_SECRET_KEY, ENV_STORAGE_VERIFY_TLS, ENV_TEST_NAMESPACE,
    ENV_TEST_SERVICE_ACCOUNT, ENV_WORKBENCH_IMAGE,
};
use snafu::{OptionExt, Snafu};
use std::collections::VecDeque;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Required environment variable '{}' is not set", var))]
    MissingRequired { var: &'static str },

    #[snafu(display("Unable to parse '{}' value '{}' as a duration", var, input))]
    InvalidDuration { var: &'static str, input: String },
}

impl Error {
    /// `true` when the error means the environment cannot host a run at all, as opposed to being
    /// broken. A missing required variable is a reason to skip, not to fail.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::MissingRequired { .. })
    }
}

/// Credentials for the object store holding the SDG input data and training artifacts. Only the
/// bucket and data key are required; the rest pass through to the workload verbatim, empty when
/// absent.
#[derive(Debug, Clone, Default)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub endpoint: String,
    pub data_key: String,
    pub verify_tls: String,
}

/// Credentials for one of the serving endpoints the workflow consults (the SDG teacher model or
/// the judge model).
#[derive(Debug, Clone, Default)]
pub struct ServingModelConfig {
    pub api_key: String,
    pub model_name: String,
    pub endpoint: String,
    /// When set, the endpoint's CA is the platform root CA and the credential secret references
    /// the well-known config map instead of carrying certificate material.
    pub platform_ca: bool,
}

/// The immutable, environment-derived settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub workbench_image: String,
    pub storage_class: String,
    pub timeout: Duration,
    /// Reuse this namespace instead of creating a disposable one.
    pub namespace: Option<String>,
    /// Reuse this service account instead of creating one. The run is skipped if it names an
    /// account that does not exist.
    pub service_account: Option<String>,
    /// GPUs per training node. Not part of the environment contract; callers set it directly.
    pub nproc_per_node: i32,
    pub sampling_size: String,
    pub object_store: ObjectStoreConfig,
    pub sdg: ServingModelConfig,
    pub judge: ServingModelConfig,
}

impl RunConfig {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(|var| std::env::var(var).ok())
    }

    /// Resolve the configuration from `lookup`. Absent required variables abort resolution with
    /// an error classified as a precondition failure; optional variables fall back to their
    /// documented defaults.
    pub fn resolve<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |var: &'static str| lookup(var).context(MissingRequiredSnafu { var });

        let timeout = match lookup(ENV_RUN_TIMEOUT) {
            Some(input) => parse_duration(&input).context(InvalidDurationSnafu {
                var: ENV_RUN_TIMEOUT,
                input: input.as_str(),
            })?,
            None => Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
        };

        Ok(Self {
            workbench_image: lookup(ENV_WORKBENCH_IMAGE)
                .unwrap_or_else(|| DEFAULT_WORKBENCH_IMAGE.to_string()),
            storage_class: lookup(ENV_STORAGE_CLASS)
                .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string()),
            timeout,
            namespace: lookup(ENV_TEST_NAMESPACE),
            service_account: lookup(ENV_TEST_SERVICE_ACCOUNT),
            nproc_per_node: 1,
            sampling_size: lookup(ENV_SAMPLING_SIZE)
                .unwrap_or_else(|| DEFAULT_SAMPLING_SIZE.to_string()),
            object_store: ObjectStoreConfig {
                bucket: required(ENV_STORAGE_BUCKET)?,
                access_key: lookup(ENV_STORAGE_ACCESS_KEY).unwrap_or_default(),
                secret_key: lookup(ENV_STORAGE_SECRET_KEY).unwrap_or_default(),
                region: lookup(ENV_STORAGE_REGION).unwrap_or_default(),
                endpoint: lookup(ENV_STORAGE_ENDPOINT).unwrap_or_default(),
                data_key: required(ENV_STORAGE_DATA_KEY)?,
                verify_tls: lookup(ENV_STORAGE_VERIFY_TLS).unwrap_or_default(),
            },
            sdg: ServingModelConfig {
                api_key: required(ENV_SDG_API_KEY)?,
                model_name: required(ENV_SDG_NAME)?,
                endpoint: required(ENV_SDG_ENDPOINT)?,
                platform_ca: is_enabled(lookup(ENV_SDG_CA_FROM_OPENSHIFT)),
            },
            judge: ServingModelConfig {
                api_key: required(ENV_JUDGE_API_KEY)?,
                model_name: required(ENV_JUDGE_NAME)?,
                endpoint: required(ENV_JUDGE_ENDPOINT)?,
                platform_ca: is_enabled(lookup(ENV_JUDGE_CA_FROM_OPENSHIFT)),
            },
        })
    }
}

/// The toggles are enabled only by the literal string `true`.
fn is_enabled(value: Option<String>) -> bool {
    value.as_deref() == Some("true")
}

const UNITS: [(char, u64); 3] = [('d', 86400), ('h', 3600), ('m', 60)];

/// Parse a duration string such as `10h`, `1h30m`, `90m` or a bare number of seconds.
fn parse_duration(input: &str) -> Option<Duration> {
    if input.is_empty() {
        return None;
    }
    let mut secs: u64 = 0;
    let mut rest = input;
    for (unit, scale) in UNITS {
        let mut parts: VecDeque<&str> = rest.split(unit).collect();
        if parts.len() > 1 {
            secs += parts.pop_front()?.parse::<u64>().ok()? * scale;
        }
        rest = parts.pop_front()?;
    }
    let mut parts: VecDeque<&str> = rest.split('s').collect();
    let seconds = parts.pop_front()?;
    if !seconds.is_empty() {
        secs += seconds.parse::<u64>().ok()?;
    }
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use std::collections::BTreeMap;

    fn full_env() -> BTreeMap<&'static str, &'static str> {
        let mut env = BTreeMap::new();
        env.insert(ENV_STORAGE_BUCKET, "ilab-bucket");
        env.insert(ENV_STORAGE_DATA_KEY, "data/sdg.tar.gz");
        env.insert(ENV_SDG_API_KEY, "sdg-key");
        env.insert(ENV_SDG_NAME, "mixtral");
        env.insert(ENV_SDG_ENDPOINT, "https://sdg.example.com/v1");
        env.insert(ENV_JUDGE_API_KEY, "judge-key");
        env.insert(ENV_JUDGE_NAME, "prometheus");
        env.insert(ENV_JUDGE_ENDPOINT, "https://judge.example.com/v1");
        env
    }

    fn resolve(env: &BTreeMap<&'static str, &'static str>) -> Result<RunConfig> {
        RunConfig::resolve(|var| env.get(var).map(|value| value.to_string()))
    }

    #[test]
    fn defaults_when_optional_vars_absent() {
        let config = resolve(&full_env()).unwrap();
        assert_eq!(config.workbench_image, DEFAULT_WORKBENCH_IMAGE);
        assert_eq!(config.storage_class, DEFAULT_STORAGE_CLASS);
        assert_eq!(config.sampling_size, DEFAULT_SAMPLING_SIZE);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS));
        assert_eq!(config.nproc_per_node, 1);
        assert!(config.namespace.is_none());
        assert!(config.service_account.is_none());
        assert!(!config.sdg.platform_ca);
        assert!(!config.judge.platform_ca);
        assert_eq!(config.object_store.access_key, "");
    }

    #[test]
    fn missing_bucket_is_a_precondition_failure() {
        let mut env = full_env();
        env.remove(ENV_STORAGE_BUCKET);
        let error = resolve(&env).unwrap_err();
        assert!(error.is_precondition());
        assert!(error.to_string().contains(ENV_STORAGE_BUCKET));
    }

    #[test]
    fn missing_judge_endpoint_is_a_precondition_failure() {
        let mut env = full_env();
        env.remove(ENV_JUDGE_ENDPOINT);
        assert!(resolve(&env).unwrap_err().is_precondition());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut env = full_env();
        env.insert(ENV_WORKBENCH_IMAGE, "quay.io/example/workbench:latest");
        env.insert(ENV_STORAGE_CLASS, "gp3-csi");
        env.insert(ENV_SAMPLING_SIZE, "1.0");
        env.insert(ENV_RUN_TIMEOUT, "2h30m");
        env.insert(ENV_TEST_NAMESPACE, "existing-ns");
        env.insert(ENV_TEST_SERVICE_ACCOUNT, "existing-sa");
        let config = resolve(&env).unwrap();
        assert_eq!(config.workbench_image, "quay.io/example/workbench:latest");
        assert_eq!(config.storage_class, "gp3-csi");
        assert_eq!(config.sampling_size, "1.0");
        assert_eq!(config.timeout, Duration::from_secs(9000));
        assert_eq!(config.namespace.as_deref(), Some("existing-ns"));
        assert_eq!(config.service_account.as_deref(), Some("existing-sa"));
    }

    #[test]
    fn ca_toggle_requires_the_literal_true() {
        for (value, expected) in [("true", true), ("True", false), ("1", false), ("yes", false)] {
            let mut env = full_env();
            env.insert(ENV_JUDGE_CA_FROM_OPENSHIFT, value);
            let config = resolve(&env).unwrap();
            assert_eq!(config.judge.platform_ca, expected, "value {:?}", value);
            assert!(!config.sdg.platform_ca);
        }
    }

    #[test]
    fn invalid_timeout_is_not_a_precondition_failure() {
        let mut env = full_env();
        env.insert(ENV_RUN_TIMEOUT, "10 hours");
        let error = resolve(&env).unwrap_err();
        assert!(!error.is_precondition());
    }

    #[test]
    fn duration_all_units() {
        assert_eq!(parse_duration("1d2h3m4s"), Some(Duration::from_secs(93784)));
    }

    #[test]
    fn duration_hours_only() {
        assert_eq!(parse_duration("10h"), Some(Duration::from_secs(36000)));
    }

    #[test]
    fn duration_bare_seconds() {
        assert_eq!(parse_duration("5123"), Some(Duration::from_secs(5123)));
    }

    #[test]
    fn duration_wrong_order() {
        assert_eq!(parse_duration("10m5h"), None);
    }

    #[test]
    fn duration_empty() {
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn duration_invalid_unit() {
        assert_eq!(parse_duration("5y40s"), None);
    }
}
