//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{CredentialSource, PubSubConfig, SubhookConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &SubhookConfig) -> ConfigResult<()> {
    validate_pubsub_config(&config.pubsub)?;

    if config.activation.call_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "activation.call_timeout_ms must be greater than 0",
        ));
    }
    if config.activation.max_concurrency == 0 {
        return Err(ConfigError::validation(
            "activation.max_concurrency must be at least 1",
        ));
    }

    Ok(())
}

/// Validates the `SERVICE_ACCOUNT_JSON` option.
pub fn validate_pubsub_config(config: &PubSubConfig) -> ConfigResult<()> {
    match &config.service_account_json {
        None => Ok(()),
        Some(CredentialSource::Path(path)) => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::validation(
                    "SERVICE_ACCOUNT_JSON path must not be empty",
                ));
            }
            Ok(())
        }
        Some(CredentialSource::Inline(key)) => {
            if key.client_email.trim().is_empty() {
                return Err(ConfigError::validation(
                    "SERVICE_ACCOUNT_JSON is missing client_email",
                ));
            }
            if key.private_key.trim().is_empty() {
                return Err(ConfigError::validation(
                    "SERVICE_ACCOUNT_JSON is missing private_key",
                ));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subhook_core::ServiceAccountKey;

    fn key(email: &str, private_key: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            key_type: "service_account".into(),
            project_id: None,
            private_key_id: None,
            private_key: private_key.into(),
            client_email: email.into(),
            client_id: None,
            token_uri: None,
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&SubhookConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_empty_path() {
        let config = PubSubConfig {
            service_account_json: Some(CredentialSource::Path("".into())),
        };
        assert!(validate_pubsub_config(&config).is_err());
    }

    #[test]
    fn test_rejects_incomplete_inline_key() {
        let config = PubSubConfig {
            service_account_json: Some(CredentialSource::Inline(key("", "pk"))),
        };
        assert!(validate_pubsub_config(&config).is_err());

        let config = PubSubConfig {
            service_account_json: Some(CredentialSource::Inline(key("a@b", " "))),
        };
        assert!(validate_pubsub_config(&config).is_err());

        let config = PubSubConfig {
            service_account_json: Some(CredentialSource::Inline(key("a@b", "pk"))),
        };
        assert!(validate_pubsub_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = SubhookConfig::default();
        config.activation.max_concurrency = 0;
        assert!(validate_config(&config).is_err());
    }
}
