//! Durable conversation state.
//!
//! A [`Snapshot`] is written after every non-terminal turn. Only the session
//! id, the current page and the collected parameters matter for revival; the
//! remaining fields are kept for observability.
//!
//! The serialized field names match the storage schema already in use by the
//! calling channel (`sessionID`, `virtualAgentReply`, ...), so existing logs
//! stay readable.

use crate::engine::{DetectResponse, TurnRequest};
use lasting_core::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Display name of the page that ends a session.
pub const END_SESSION_PAGE: &str = "End Session";

/// Slot name to collected value, accumulated across turns.
pub type Parameters = Map<String, JsonValue>;

/// A page (conversation state) in the dialogue engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Full resource name, used to resume on this page.
    #[serde(default)]
    pub name: String,
    /// Human-readable page name.
    #[serde(default)]
    pub display_name: String,
}

impl Page {
    /// Creates a page reference.
    #[must_use]
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
        }
    }

    /// Classifies this page as active or terminal.
    #[must_use]
    pub fn state(&self) -> PageState {
        if self.display_name == END_SESSION_PAGE {
            PageState::Terminal
        } else {
            PageState::Active
        }
    }
}

/// Whether a session continues after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    /// The session continues; state must be persisted.
    Active,
    /// The engine reached the end-of-session page; state must be destroyed.
    Terminal,
}

impl PageState {
    /// Returns true if the session has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

/// Sentiment of the caller's utterance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentiment {
    /// Polarity from -1.0 (negative) to 1.0 (positive).
    pub score: f64,
    /// Overall strength of emotion, unbounded and non-negative.
    pub magnitude: f64,
}

/// Observability fields carried alongside the revivable state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Bot replies of the turn that produced the snapshot.
    #[serde(rename = "virtualAgentReply", default)]
    pub replies: Vec<String>,
    /// The caller's utterance as understood by the engine.
    #[serde(
        rename = "customerIntent",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detected_text: Option<String>,
    /// Sentiment score of the utterance.
    #[serde(
        rename = "sentimentAnalysisScore",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment_score: Option<f64>,
    /// Sentiment magnitude of the utterance.
    #[serde(
        rename = "sentimentAnalysisMagnitude",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment_magnitude: Option<f64>,
    /// Match confidence of the detected intent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// The durable state needed to resume a conversation.
///
/// Every field is optional on read because logs may hold entries written by
/// other tools; [`Snapshot::resumption`] enforces that the revival fields are
/// jointly present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Session that produced this snapshot.
    #[serde(rename = "sessionID", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    /// Page the conversation was on after the turn.
    #[serde(
        rename = "currentPage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_page: Option<Page>,
    /// Parameters collected so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    /// Observability data.
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl Snapshot {
    /// Captures the state after a turn.
    #[must_use]
    pub fn capture(session_id: &SessionId, response: &DetectResponse) -> Self {
        Self {
            session_id: Some(session_id.clone()),
            current_page: Some(response.current_page.clone()),
            parameters: Some(response.parameters.clone()),
            diagnostics: Diagnostics {
                replies: response.reply_messages.clone(),
                detected_text: Some(response.detected_text.clone()),
                sentiment_score: response.sentiment.map(|s| s.score),
                sentiment_magnitude: response.sentiment.map(|s| s.magnitude),
                confidence: response.confidence,
            },
        }
    }

    /// Returns true if the session id, page and parameters are all present.
    #[must_use]
    pub fn is_revivable(&self) -> bool {
        let has_session = self
            .session_id
            .as_ref()
            .is_some_and(|id| !id.as_str().is_empty());
        let has_page = self
            .current_page
            .as_ref()
            .is_some_and(|page| !page.name.is_empty());
        has_session && has_page && self.parameters.is_some()
    }

    /// Builds the request that resumes this snapshot's page and parameters.
    ///
    /// Returns `None` when the snapshot is not revivable; callers must then
    /// start a fresh session rather than attempt a partial revival.
    #[must_use]
    pub fn resumption(&self) -> Option<TurnRequest> {
        if !self.is_revivable() {
            return None;
        }
        match (&self.current_page, &self.parameters) {
            (Some(current_page), Some(parameters)) => Some(TurnRequest::Resumption {
                current_page: current_page.clone(),
                parameters: parameters.clone(),
            }),
            _ => None,
        }
    }
}
