//! Dialogflow CX agent settings.

use lasting_core::SessionId;
use serde::Deserialize;

/// Location whose API host has no regional prefix.
pub const GLOBAL_LOCATION: &str = "global";

/// Configuration for the Dialogflow CX client.
#[derive(Debug, Clone, Deserialize)]
pub struct DialogflowConfig {
    /// Google Cloud project id.
    pub project_id: String,
    /// Agent location, e.g. `global` or `us-central1`.
    #[serde(default = "default_location")]
    pub location: String,
    /// Agent id.
    pub agent_id: String,
    /// OAuth2 access token sent as a bearer token.
    ///
    /// Used as-is for the life of the process. Google access tokens expire
    /// after about an hour, after which every turn fails with a 401 until
    /// the server is restarted with a fresh token.
    pub access_token: String,
    /// API root override. Derived from `location` when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_location() -> String {
    GLOBAL_LOCATION.to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl DialogflowConfig {
    /// Creates a configuration for a global agent.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        agent_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: default_location(),
            agent_id: agent_id.into(),
            access_token: access_token.into(),
            endpoint: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Sets the agent location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Points the client at a different API root.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// API root for this agent.
    #[must_use]
    pub fn api_root(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None if self.location == GLOBAL_LOCATION => {
                "https://dialogflow.googleapis.com".to_string()
            }
            None => format!("https://{}-dialogflow.googleapis.com", self.location),
        }
    }

    /// Resource name of a session of this agent.
    #[must_use]
    pub fn session_path(&self, session_id: &SessionId) -> String {
        format!(
            "projects/{}/locations/{}/agents/{}/sessions/{}",
            self.project_id, self.location, self.agent_id, session_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_agent_uses_unprefixed_host() {
        let config = DialogflowConfig::new("acme", "agent-1", "token");
        assert_eq!(config.api_root(), "https://dialogflow.googleapis.com");
    }

    #[test]
    fn regional_agent_uses_prefixed_host() {
        let config = DialogflowConfig::new("acme", "agent-1", "token").with_location("us-central1");
        assert_eq!(
            config.api_root(),
            "https://us-central1-dialogflow.googleapis.com"
        );
        assert_eq!(
            config.session_path(&SessionId::new("s1")),
            "projects/acme/locations/us-central1/agents/agent-1/sessions/s1"
        );
    }

    #[test]
    fn endpoint_override_wins() {
        let config = DialogflowConfig::new("acme", "agent-1", "token")
            .with_location("europe-west1")
            .with_endpoint("http://127.0.0.1:8085");
        assert_eq!(config.api_root(), "http://127.0.0.1:8085");
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config: DialogflowConfig = serde_json::from_str(
            r#"{ "project_id": "acme", "agent_id": "agent-1", "access_token": "t" }"#,
        )
        .expect("deserialize");
        assert_eq!(config.location, "global");
        assert_eq!(config.request_timeout_secs, 15);
        assert!(config.endpoint.is_none());
    }
}
