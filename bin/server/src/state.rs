//! Shared handler state.

use lasting_conversation::{ConversationStore, DialogueEngine, TurnOrchestrator};
use std::sync::Arc;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Per-message turn flow.
    pub orchestrator: TurnOrchestrator,
    /// Direct store access for caller maintenance.
    pub store: Arc<dyn ConversationStore>,
    /// Language code for turns that do not name one.
    pub default_language_code: String,
}

impl AppState {
    /// Creates the application state over injected collaborators.
    pub fn new(
        store: Arc<dyn ConversationStore>,
        engine: Arc<dyn DialogueEngine>,
        default_language_code: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator: TurnOrchestrator::new(Arc::clone(&store), engine),
            store,
            default_language_code: default_language_code.into(),
        }
    }
}
