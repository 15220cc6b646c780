//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`SYNC__ACCOUNT_SID`, `DIALOGFLOW__AGENT_ID`, ...).
//!
//! See [`SyncConfig`] and [`DialogflowConfig`] for the collaborator settings.

use lasting_dialogflow::DialogflowConfig;
use lasting_sync::SyncConfig;
use serde::Deserialize;

/// Server configuration composed from library configs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Language code used when a turn does not name one.
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Conversation store selection.
    #[serde(default)]
    pub store: StoreConfig,

    /// Twilio Sync settings. Required for the `sync` backend.
    #[serde(default)]
    pub sync: Option<SyncConfig>,

    /// Dialogflow CX agent settings.
    pub dialogflow: DialogflowConfig,
}

/// Conversation store selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Which store implementation to run with.
    #[serde(default)]
    pub backend: StoreBackend,
}

/// Available conversation store implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Twilio Sync maps.
    #[default]
    Sync,
    /// Process memory. State does not survive a restart.
    Memory,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_language_code() -> String {
    "en".to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
