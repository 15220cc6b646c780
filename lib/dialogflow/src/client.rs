//! Dialogflow CX dialogue engine client.

use crate::config::DialogflowConfig;
use crate::wire::{DetectIntentRequest, DetectIntentResponse, GoogleErrorBody};
use async_trait::async_trait;
use lasting_conversation::{DetectRequest, DetectResponse, DialogueEngine, EngineError};
use lasting_core::SessionId;
use reqwest::Url;
use rootcause::Report;
use std::time::Duration;
use tracing::{debug, instrument};

/// Dialogflow CX implementation of [`DialogueEngine`].
#[derive(Debug, Clone)]
pub struct DialogflowClient {
    http: reqwest::Client,
    api_root: Url,
    config: DialogflowConfig,
}

impl DialogflowClient {
    /// Creates a client for one agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the API root is not a valid base URL or the HTTP
    /// client cannot be built.
    pub fn new(config: DialogflowConfig) -> Result<Self, Report<EngineError>> {
        let root = config.api_root();
        let api_root = Url::parse(&root).map_err(|e| EngineError::InvalidConfig {
            reason: format!("invalid API root '{}': {}", root, e),
        })?;
        if api_root.cannot_be_a_base() {
            return Err(EngineError::InvalidConfig {
                reason: format!("API root '{}' cannot carry a path", root),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| EngineError::InvalidConfig {
                reason: format!("HTTP client error: {}", e),
            })?;

        Ok(Self {
            http,
            api_root,
            config,
        })
    }

    fn detect_url(&self, session_id: &SessionId) -> Url {
        let mut url = self.api_root.clone();
        let method = format!("{}:detectIntent", session_id);
        // Checked in `new`: the API root can carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend([
                "v3",
                "projects",
                self.config.project_id.as_str(),
                "locations",
                self.config.location.as_str(),
                "agents",
                self.config.agent_id.as_str(),
                "sessions",
                method.as_str(),
            ]);
        }
        url
    }
}

#[async_trait]
impl DialogueEngine for DialogflowClient {
    #[instrument(
        skip_all,
        fields(session_id = %request.session_id, resumption = request.turn.is_resumption())
    )]
    async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, Report<EngineError>> {
        let body = DetectIntentRequest::from(request);
        let response = self
            .http
            .post(self.detect_url(&request.session_id))
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .map(|e| match (e.status, e.message) {
                    (Some(code), Some(message)) => format!("{}: {}", code, message),
                    (None, Some(message)) => message,
                    (Some(code), None) => code,
                    (None, None) => String::new(),
                })
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(EngineError::Rejected {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let decoded: DetectIntentResponse =
            response
                .json()
                .await
                .map_err(|e| EngineError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;
        let Some(result) = decoded.query_result else {
            return Err(EngineError::ResponseParseFailed {
                reason: "response has no queryResult".to_string(),
            }
            .into());
        };

        let detected = result.into_detect_response();
        debug!(
            page = %detected.current_page.display_name,
            replies = detected.reply_messages.len(),
            "Turn detected"
        );
        Ok(detected)
    }
}
