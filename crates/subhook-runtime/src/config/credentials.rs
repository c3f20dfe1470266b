//! Turning `SERVICE_ACCOUNT_JSON` into client credentials.

use subhook_core::{Credentials, ServiceAccountKey};
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::schema::{CredentialSource, PubSubConfig};
use super::validation::validate_pubsub_config;

/// Resolves the configured credential source.
///
/// Returns `Ok(None)` when no explicit credentials are configured, in which
/// case the client falls back to its default credential discovery.
pub fn resolve_credentials(config: &PubSubConfig) -> ConfigResult<Option<Credentials>> {
    validate_pubsub_config(config)?;

    let key = match &config.service_account_json {
        None => return Ok(None),
        Some(CredentialSource::Inline(key)) => key.clone(),
        Some(CredentialSource::Path(path)) => {
            debug!(path = %path.display(), "Reading service account key");
            let raw = std::fs::read_to_string(path).map_err(|source| {
                ConfigError::CredentialsRead {
                    path: path.clone(),
                    source,
                }
            })?;
            serde_json::from_str::<ServiceAccountKey>(&raw)?
        }
    };

    Ok(Some(Credentials::new(key)))
}
