//! Turn execution: exactly one engine call per inbound message.

use crate::engine::{DetectRequest, DetectResponse, DialogueEngine};
use crate::error::EngineError;
use crate::resolver::ResolvedSession;
use rootcause::Report;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Issues the engine request for a resolved session.
#[derive(Clone)]
pub struct TurnExecutor {
    engine: Arc<dyn DialogueEngine>,
}

impl TurnExecutor {
    /// Creates an executor over the given engine.
    #[must_use]
    pub fn new(engine: Arc<dyn DialogueEngine>) -> Self {
        Self { engine }
    }

    /// Builds the detect request for a turn. Sentiment is always requested.
    #[must_use]
    pub fn build_request(
        session: &ResolvedSession,
        utterance: &str,
        language_code: &str,
    ) -> DetectRequest {
        DetectRequest::new(session.session_id.clone(), utterance, language_code)
            .with_turn(session.turn.clone())
            .with_sentiment()
    }

    /// Runs the turn. Failures are logged and returned without retry.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged.
    #[instrument(
        skip_all,
        fields(session_id = %session.session_id, revival = session.is_revival())
    )]
    pub async fn execute(
        &self,
        session: &ResolvedSession,
        utterance: &str,
        language_code: &str,
    ) -> Result<DetectResponse, Report<EngineError>> {
        let request = Self::build_request(session, utterance, language_code);
        match self.engine.detect(&request).await {
            Ok(response) => {
                debug!(
                    page = %response.current_page.display_name,
                    replies = response.reply_messages.len(),
                    "engine turn completed"
                );
                Ok(response)
            }
            Err(report) => {
                error!(error = %report, "dialogue engine call failed");
                Err(report)
            }
        }
    }
}
