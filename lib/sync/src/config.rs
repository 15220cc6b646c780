//! Twilio Sync connection settings.

use serde::Deserialize;

/// Default Sync REST API root.
pub const DEFAULT_BASE_URL: &str = "https://sync.twilio.com/v1";

/// Configuration for the Twilio Sync store.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Twilio account SID, used as the basic-auth user.
    pub account_sid: String,
    /// Twilio auth token, used as the basic-auth password.
    pub auth_token: String,
    /// Friendly name of the Sync service holding the conversation logs.
    /// The service is created on startup if none has this name.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Sync service SID. When set, the name lookup is skipped.
    #[serde(default)]
    pub service_sid: Option<String>,
    /// REST API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_service_name() -> String {
    "lasting-sessions".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl SyncConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            service_name: default_service_name(),
            service_sid: None,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Points the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Uses a known service SID instead of looking it up by name.
    #[must_use]
    pub fn with_service_sid(mut self, service_sid: impl Into<String>) -> Self {
        self.service_sid = Some(service_sid.into());
        self
    }

    /// Sets the friendly name used to find or create the service.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }
}
