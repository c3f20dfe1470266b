//! Service-account credentials handed to a backend client factory.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Audience used when minting subscriber tokens from a service account.
pub const SUBSCRIBER_AUDIENCE: &str = "https://pubsub.googleapis.com/google.pubsub.v1.Subscriber";

/// A service-account key in the JSON layout cloud consoles export.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default = "default_key_type")]
    pub key_type: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

fn default_key_type() -> String {
    "service_account".to_string()
}

// Keeps the private key out of logs.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

/// Explicit credentials for building a subscriber client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    key: ServiceAccountKey,
    audience: String,
}

impl Credentials {
    /// Wraps a key with the default subscriber audience.
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            audience: SUBSCRIBER_AUDIENCE.to_string(),
        }
    }

    /// Overrides the token audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Project the key belongs to, if the key names one.
    pub fn project_id(&self) -> Option<&str> {
        self.key.project_id.as_deref()
    }
}
