//! Dialogue engine abstraction.
//!
//! The engine is an external collaborator: it owns intent detection and page
//! transitions. This module only fixes the shape of one detect call, in both
//! its fresh and resumption forms.

use crate::error::EngineError;
use crate::snapshot::{Page, PageState, Parameters, Sentiment};
use async_trait::async_trait;
use lasting_core::{Result, SessionId};
use serde::{Deserialize, Serialize};

/// How a turn addresses the engine's session state.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnRequest {
    /// Let the engine continue (or start) the session it already holds.
    Fresh,
    /// Re-enter a stored page with the stored parameters.
    Resumption {
        /// Page to resume on.
        current_page: Page,
        /// Parameters collected before the disconnect.
        parameters: Parameters,
    },
}

impl TurnRequest {
    /// Returns true if this request revives stored state.
    #[must_use]
    pub fn is_resumption(&self) -> bool {
        matches!(self, Self::Resumption { .. })
    }
}

/// One detect call against the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectRequest {
    /// Engine session to run the turn in.
    pub session_id: SessionId,
    /// The caller's utterance.
    pub utterance: String,
    /// Language of the utterance (e.g. "en").
    pub language_code: String,
    /// Fresh or resumed.
    pub turn: TurnRequest,
    /// Whether to ask the engine for sentiment analysis.
    pub analyze_sentiment: bool,
}

impl DetectRequest {
    /// Creates a fresh request without sentiment analysis.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        utterance: impl Into<String>,
        language_code: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            utterance: utterance.into(),
            language_code: language_code.into(),
            turn: TurnRequest::Fresh,
            analyze_sentiment: false,
        }
    }

    /// Sets the fresh/resumption mode.
    #[must_use]
    pub fn with_turn(mut self, turn: TurnRequest) -> Self {
        self.turn = turn;
        self
    }

    /// Requests sentiment analysis of the utterance.
    #[must_use]
    pub fn with_sentiment(mut self) -> Self {
        self.analyze_sentiment = true;
        self
    }
}

/// The engine's answer to one detect call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Text replies, in order.
    pub reply_messages: Vec<String>,
    /// The utterance as understood by the engine.
    pub detected_text: String,
    /// Intent match confidence.
    pub confidence: Option<f64>,
    /// Sentiment of the utterance, when analysis was requested.
    pub sentiment: Option<Sentiment>,
    /// Parameters after this turn.
    pub parameters: Parameters,
    /// Page after this turn.
    pub current_page: Page,
}

impl DetectResponse {
    /// Returns whether the session continues after this turn.
    #[must_use]
    pub fn page_state(&self) -> PageState {
        self.current_page.state()
    }
}

/// Trait for dialogue engines.
///
/// Implementations must accept both fresh and resumption requests and answer
/// with the same response shape.
#[async_trait]
pub trait DialogueEngine: Send + Sync {
    /// Runs one turn.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine call fails.
    async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_request_builder() {
        let request = DetectRequest::new(SessionId::new("s1"), "hello", "en")
            .with_turn(TurnRequest::Resumption {
                current_page: Page::new("pages/p1", "Collect Amount"),
                parameters: Parameters::new(),
            })
            .with_sentiment();

        assert!(request.analyze_sentiment);
        assert!(request.turn.is_resumption());
        assert_eq!(request.language_code, "en");
    }

    #[test]
    fn fresh_by_default() {
        let request = DetectRequest::new(SessionId::new("s1"), "hello", "en");
        assert_eq!(request.turn, TurnRequest::Fresh);
        assert!(!request.analyze_sentiment);
    }

    #[test]
    fn response_page_state() {
        let response = DetectResponse {
            reply_messages: vec!["Goodbye!".to_string()],
            detected_text: "that's all".to_string(),
            confidence: None,
            sentiment: None,
            parameters: Parameters::new(),
            current_page: Page::new("pages/end", "End Session"),
        };
        assert_eq!(response.page_state(), PageState::Terminal);
    }
}
