use super::run_labels;
use crate::config::{ObjectStoreConfig, ServingModelConfig};
use crate::constants::{
    KEY_ACCESS_KEY, KEY_BUCKET, KEY_DATA_KEY, KEY_ENDPOINT, KEY_REGION, KEY_SECRET_KEY,
    KEY_VERIFY_TLS, PLATFORM_CA_CONFIG_MAP, PLATFORM_CA_KEY, SECRET_PREFIX,
};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use maplit::btreemap;
use std::collections::BTreeMap;

/// Which serving endpoint a credential secret is for. The two secrets use different key schemas;
/// the workflow script reads each by its own convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingRole {
    /// The teacher model the SDG stage queries.
    Sdg,
    /// The judge model consulted during evaluation.
    Judge,
}

impl ServingRole {
    fn api_key_key(&self) -> &'static str {
        match self {
            ServingRole::Sdg => "api_key",
            ServingRole::Judge => "JUDGE_API_KEY",
        }
    }

    fn endpoint_key(&self) -> &'static str {
        match self {
            ServingRole::Sdg => "endpoint",
            ServingRole::Judge => "JUDGE_ENDPOINT",
        }
    }

    fn model_key(&self) -> &'static str {
        match self {
            ServingRole::Sdg => "model",
            ServingRole::Judge => "JUDGE_NAME",
        }
    }

    fn ca_cert_key(&self) -> &'static str {
        match self {
            ServingRole::Sdg => "SDG_CA_CERT",
            ServingRole::Judge => "JUDGE_CA_CERT",
        }
    }

    fn ca_cert_config_map_key(&self) -> &'static str {
        match self {
            ServingRole::Sdg => "SDG_CA_CERT_CM_KEY",
            ServingRole::Judge => "JUDGE_CA_CERT_CM_KEY",
        }
    }
}

/// Defines the opaque secret holding one serving endpoint's credentials. When the platform CA
/// toggle is set, the secret references the well-known root-CA config map instead of carrying
/// certificate material.
pub fn serving_model_secret(
    namespace: &str,
    role: ServingRole,
    config: &ServingModelConfig,
) -> Secret {
    let mut data = btreemap! {
        role.api_key_key().to_string() => config.api_key.clone(),
        role.endpoint_key().to_string() => config.endpoint.clone(),
        role.model_key().to_string() => config.model_name.clone(),
    };
    if config.platform_ca {
        data.insert(
            role.ca_cert_key().to_string(),
            PLATFORM_CA_CONFIG_MAP.to_string(),
        );
        data.insert(
            role.ca_cert_config_map_key().to_string(),
            PLATFORM_CA_KEY.to_string(),
        );
    }
    opaque_secret(namespace, data)
}

/// Defines the opaque secret holding the object-store credentials the workbench pod sources into
/// its environment.
pub fn object_store_secret(namespace: &str, config: &ObjectStoreConfig) -> Secret {
    opaque_secret(
        namespace,
        btreemap! {
            KEY_BUCKET.to_string() => config.bucket.clone(),
            KEY_ACCESS_KEY.to_string() => config.access_key.clone(),
            KEY_SECRET_KEY.to_string() => config.secret_key.clone(),
            KEY_DATA_KEY.to_string() => config.data_key.clone(),
            KEY_ENDPOINT.to_string() => config.endpoint.clone(),
            KEY_REGION.to_string() => config.region.clone(),
            KEY_VERIFY_TLS.to_string() => config.verify_tls.clone(),
        },
    )
}

fn opaque_secret(namespace: &str, data: BTreeMap<String, String>) -> Secret {
    Secret {
        metadata: ObjectMeta {
            generate_name: Some(SECRET_PREFIX.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(run_labels()),
            ..Default::default()
        },
        string_data: Some(data),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn serving_config(platform_ca: bool) -> ServingModelConfig {
        ServingModelConfig {
            api_key: "key".to_string(),
            model_name: "model-name".to_string(),
            endpoint: "https://models.example.com/v1".to_string(),
            platform_ca,
        }
    }

    #[test]
    fn judge_secret_uses_env_var_shaped_keys() {
        let secret = serving_model_secret("ns", ServingRole::Judge, &serving_config(false));
        let data = secret.string_data.unwrap();
        assert_eq!(data.get("JUDGE_API_KEY").map(String::as_str), Some("key"));
        assert_eq!(
            data.get("JUDGE_NAME").map(String::as_str),
            Some("model-name")
        );
        assert_eq!(
            data.get("JUDGE_ENDPOINT").map(String::as_str),
            Some("https://models.example.com/v1")
        );
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn sdg_secret_uses_plain_keys() {
        let secret = serving_model_secret("ns", ServingRole::Sdg, &serving_config(false));
        let data = secret.string_data.unwrap();
        assert_eq!(data.get("api_key").map(String::as_str), Some("key"));
        assert_eq!(data.get("model").map(String::as_str), Some("model-name"));
        assert_eq!(
            data.get("endpoint").map(String::as_str),
            Some("https://models.example.com/v1")
        );
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn platform_ca_injects_exactly_two_reference_keys() {
        for (role, cert_key, cm_key) in [
            (ServingRole::Judge, "JUDGE_CA_CERT", "JUDGE_CA_CERT_CM_KEY"),
            (ServingRole::Sdg, "SDG_CA_CERT", "SDG_CA_CERT_CM_KEY"),
        ] {
            let secret = serving_model_secret("ns", role, &serving_config(true));
            let data = secret.string_data.unwrap();
            assert_eq!(
                data.get(cert_key).map(String::as_str),
                Some(PLATFORM_CA_CONFIG_MAP)
            );
            assert_eq!(data.get(cm_key).map(String::as_str), Some(PLATFORM_CA_KEY));
            assert_eq!(data.len(), 5);
        }
    }

    #[test]
    fn without_the_toggle_no_ca_keys_appear() {
        let secret = serving_model_secret("ns", ServingRole::Judge, &serving_config(false));
        let data = secret.string_data.unwrap();
        assert!(!data.contains_key("JUDGE_CA_CERT"));
        assert!(!data.contains_key("JUDGE_CA_CERT_CM_KEY"));
    }

    #[test]
    fn object_store_secret_carries_all_seven_keys() {
        let secret = object_store_secret(
            "ns",
            &ObjectStoreConfig {
                bucket: "bucket-1".to_string(),
                access_key: "ak".to_string(),
                secret_key: "sk".to_string(),
                region: "us-east-1".to_string(),
                endpoint: "https://s3.example.com".to_string(),
                data_key: "data/sdg.tar.gz".to_string(),
                verify_tls: "false".to_string(),
            },
        );
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        assert_eq!(
            secret.metadata.generate_name.as_deref(),
            Some(SECRET_PREFIX)
        );
        let data = secret.string_data.unwrap();
        assert_eq!(data.len(), 7);
        assert_eq!(data.get(KEY_BUCKET).map(String::as_str), Some("bucket-1"));
        assert_eq!(
            data.get(KEY_DATA_KEY).map(String::as_str),
            Some("data/sdg.tar.gz")
        );
        assert_eq!(data.get(KEY_VERIFY_TLS).map(String::as_str), Some("false"));
    }
}
