//! Per-message turn orchestration.
//!
//! One pass per inbound message:
//!
//! 1. Resolve the session (reuse, revive or start fresh)
//! 2. Execute the turn against the dialogue engine
//! 3. Persist the snapshot, or clean up the log on the terminal page
//! 4. Respond
//!
//! A failure at any stage fails the whole turn; there is no partial
//! success. The orchestrator holds no per-caller state between messages.

use crate::engine::{DialogueEngine, TurnRequest};
use crate::error::{PersistError, TurnError};
use crate::executor::TurnExecutor;
use crate::persister::{PersistOutcome, StatePersister};
use crate::resolver::SessionResolver;
use crate::snapshot::{Page, PageState, Parameters, Sentiment};
use crate::store::ConversationStore;
use lasting_core::{CallerId, SessionId};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A message from the calling channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Who is speaking.
    pub caller: CallerId,
    /// What they said.
    pub utterance: String,
    /// Language of the utterance.
    pub language_code: String,
    /// Session id echoed back from the previous turn, if the channel kept it.
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// The answer handed back to the calling channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    /// Session id to echo back on the next turn.
    pub session_id: SessionId,
    /// Bot replies, in order.
    pub reply_messages: Vec<String>,
    /// The utterance as understood by the engine.
    pub detected_text: String,
    /// Intent match confidence.
    pub confidence: Option<f64>,
    /// Sentiment of the utterance.
    pub sentiment: Option<Sentiment>,
    /// Parameters collected so far.
    pub parameters: Parameters,
    /// Page after this turn.
    pub current_page: Page,
    /// Whether the session continues.
    pub page_state: PageState,
    /// Whether this turn revived stored state.
    pub revived: bool,
}

/// Composes resolution, execution and persistence for each message.
#[derive(Clone)]
pub struct TurnOrchestrator {
    resolver: SessionResolver,
    executor: TurnExecutor,
    persister: StatePersister,
}

impl TurnOrchestrator {
    /// Creates an orchestrator over injected collaborators.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, engine: Arc<dyn DialogueEngine>) -> Self {
        Self {
            resolver: SessionResolver::new(Arc::clone(&store)),
            executor: TurnExecutor::new(engine),
            persister: StatePersister::new(store),
        }
    }

    /// Handles one inbound message.
    ///
    /// # Errors
    ///
    /// Returns an error naming the failed stage if the store lookup, the
    /// engine call, or the state write/delete fails.
    #[instrument(skip_all, fields(caller = %message.caller))]
    pub async fn handle(&self, message: InboundMessage) -> Result<TurnResponse, Report<TurnError>> {
        let InboundMessage {
            caller,
            utterance,
            language_code,
            session_id,
        } = message;

        let session = self
            .resolver
            .resolve(&caller, session_id)
            .await
            .map_err(|report| {
                report.context(TurnError::ResolveSession {
                    caller: caller.clone(),
                })
            })?;
        debug!(
            session_id = %session.session_id,
            revival = session.is_revival(),
            "session resolved"
        );

        let response = self
            .executor
            .execute(&session, &utterance, &language_code)
            .await
            .map_err(|report| {
                report.context(TurnError::ExecuteTurn {
                    caller: caller.clone(),
                    session_id: session.session_id.clone(),
                })
            })?;

        let outcome = self
            .persister
            .persist(&caller, &session.session_id, &response)
            .await
            .map_err(|report| {
                let context = match report.current_context() {
                    PersistError::AppendFailed { .. } => TurnError::Persist {
                        caller: caller.clone(),
                    },
                    PersistError::CleanupFailed { .. } => TurnError::Cleanup {
                        caller: caller.clone(),
                    },
                };
                report.context(context)
            })?;

        let page_state = match outcome {
            PersistOutcome::Appended { key } => {
                debug!(entry = %key, "snapshot persisted");
                PageState::Active
            }
            PersistOutcome::Cleared => PageState::Terminal,
        };
        info!(
            page = %response.current_page.display_name,
            ?page_state,
            "turn completed"
        );

        Ok(TurnResponse {
            session_id: session.session_id,
            revived: matches!(session.turn, TurnRequest::Resumption { .. }),
            reply_messages: response.reply_messages,
            detected_text: response.detected_text,
            confidence: response.confidence,
            sentiment: response.sentiment,
            parameters: response.parameters,
            current_page: response.current_page,
            page_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DetectRequest, DetectResponse};
    use crate::error::{EngineError, StoreError, TurnStage};
    use crate::memory::InMemoryConversationStore;
    use crate::snapshot::Snapshot;
    use crate::store::{EntryKey, LogHandle, StoreLookup};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Engine that answers from a queue of pages and records every request.
    struct ScriptedEngine {
        pages: Mutex<VecDeque<&'static str>>,
        requests: Mutex<Vec<DetectRequest>>,
    }

    impl ScriptedEngine {
        fn new(pages: &[&'static str]) -> Self {
            Self {
                pages: Mutex::new(pages.iter().copied().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<DetectRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DialogueEngine for ScriptedEngine {
        async fn detect(
            &self,
            request: &DetectRequest,
        ) -> Result<DetectResponse, Report<EngineError>> {
            self.requests.lock().unwrap().push(request.clone());
            let Some(page) = self.pages.lock().unwrap().pop_front() else {
                return Err(EngineError::RequestFailed {
                    reason: "script exhausted".to_string(),
                }
                .into());
            };

            let mut parameters = match &request.turn {
                TurnRequest::Resumption { parameters, .. } => parameters.clone(),
                TurnRequest::Fresh => Parameters::new(),
            };
            if page == "Collect Amount" {
                parameters.insert("amount".to_string(), json!("500"));
            }

            Ok(DetectResponse {
                reply_messages: vec![format!("Now on {page}")],
                detected_text: request.utterance.clone(),
                confidence: Some(0.9),
                sentiment: Some(Sentiment {
                    score: 0.2,
                    magnitude: 0.4,
                }),
                parameters,
                current_page: Page::new(format!("pages/{page}"), page),
            })
        }
    }

    /// Store that refuses writes but reads normally.
    struct FailingWrites(InMemoryConversationStore);

    #[async_trait]
    impl ConversationStore for FailingWrites {
        async fn ensure_log(&self, caller: &CallerId) -> Result<LogHandle, Report<StoreError>> {
            self.0.ensure_log(caller).await
        }

        async fn append(
            &self,
            _: &LogHandle,
            _: &EntryKey,
            _: &Snapshot,
        ) -> Result<(), Report<StoreError>> {
            Err(StoreError::RequestFailed {
                operation: "append".to_string(),
                reason: "503 Service Unavailable".to_string(),
            }
            .into())
        }

        async fn latest(&self, log: &LogHandle) -> Result<StoreLookup, Report<StoreError>> {
            self.0.latest(log).await
        }

        async fn delete_log(&self, log: &LogHandle) -> Result<(), Report<StoreError>> {
            self.0.delete_log(log).await
        }
    }

    fn caller() -> CallerId {
        CallerId::parse("+15551234567").expect("valid caller")
    }

    fn message(utterance: &str, session_id: Option<SessionId>) -> InboundMessage {
        InboundMessage {
            caller: caller(),
            utterance: utterance.to_string(),
            language_code: "en".to_string(),
            session_id,
        }
    }

    #[tokio::test]
    async fn first_turn_starts_fresh_and_persists() {
        let store = Arc::new(InMemoryConversationStore::new());
        let engine = Arc::new(ScriptedEngine::new(&["Collect Amount"]));
        let orchestrator = TurnOrchestrator::new(store.clone(), engine.clone());

        let response = orchestrator
            .handle(message("I want to pay", None))
            .await
            .expect("turn");

        assert!(!response.revived);
        assert_eq!(response.page_state, PageState::Active);
        assert_eq!(engine.requests()[0].turn, TurnRequest::Fresh);
        assert!(engine.requests()[0].analyze_sentiment);
        assert_eq!(store.entry_count(&LogHandle::for_caller(&caller())).await, 1);
    }

    #[tokio::test]
    async fn reconnect_revives_stored_page_and_parameters() {
        let store = Arc::new(InMemoryConversationStore::new());
        let engine = Arc::new(ScriptedEngine::new(&["Collect Amount", "Confirm Payment"]));
        let orchestrator = TurnOrchestrator::new(store.clone(), engine.clone());

        let first = orchestrator
            .handle(message("I want to pay", None))
            .await
            .expect("first turn");

        // Channel lost the session id: the next turn must revive from the log.
        let second = orchestrator
            .handle(message("yes", None))
            .await
            .expect("second turn");

        assert!(second.revived);
        assert_ne!(first.session_id, second.session_id);
        let requests = engine.requests();
        match &requests[1].turn {
            TurnRequest::Resumption {
                current_page,
                parameters,
            } => {
                assert_eq!(current_page.display_name, "Collect Amount");
                assert_eq!(parameters.get("amount"), Some(&json!("500")));
            }
            TurnRequest::Fresh => panic!("expected a resumption request"),
        }
    }

    #[tokio::test]
    async fn known_session_is_not_revived() {
        let store = Arc::new(InMemoryConversationStore::new());
        let engine = Arc::new(ScriptedEngine::new(&["Collect Amount", "Confirm Payment"]));
        let orchestrator = TurnOrchestrator::new(store, engine.clone());

        let first = orchestrator
            .handle(message("I want to pay", None))
            .await
            .expect("first turn");
        let second = orchestrator
            .handle(message("yes", Some(first.session_id.clone())))
            .await
            .expect("second turn");

        assert!(!second.revived);
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(engine.requests()[1].turn, TurnRequest::Fresh);
    }

    #[tokio::test]
    async fn end_session_destroys_log() {
        let store = Arc::new(InMemoryConversationStore::new());
        let engine = Arc::new(ScriptedEngine::new(&["Collect Amount", "End Session"]));
        let orchestrator = TurnOrchestrator::new(store.clone(), engine);

        let first = orchestrator
            .handle(message("I want to pay", None))
            .await
            .expect("first turn");
        let last = orchestrator
            .handle(message("that's all", Some(first.session_id)))
            .await
            .expect("last turn");

        let log = LogHandle::for_caller(&caller());
        assert_eq!(last.page_state, PageState::Terminal);
        assert!(!store.contains_log(&log).await);
        assert_eq!(store.latest(&log).await.expect("latest"), StoreLookup::NotFound);
    }

    #[tokio::test]
    async fn engine_failure_fails_turn_without_writing() {
        let store = Arc::new(InMemoryConversationStore::new());
        let engine = Arc::new(ScriptedEngine::new(&[]));
        let orchestrator = TurnOrchestrator::new(store.clone(), engine);

        let err = orchestrator
            .handle(message("hello", None))
            .await
            .unwrap_err();

        assert_eq!(err.current_context().stage(), TurnStage::ExecuteTurn);
        assert_eq!(store.log_count().await, 0);
    }

    #[tokio::test]
    async fn store_failure_fails_turn_after_engine_reply() {
        let store = Arc::new(FailingWrites(InMemoryConversationStore::new()));
        let engine = Arc::new(ScriptedEngine::new(&["Collect Amount"]));
        let orchestrator = TurnOrchestrator::new(store, engine.clone());

        let err = orchestrator
            .handle(message("I want to pay", None))
            .await
            .unwrap_err();

        assert_eq!(err.current_context().stage(), TurnStage::Persist);
        assert_eq!(engine.requests().len(), 1);
    }

    #[test]
    fn inbound_message_session_id_is_optional() {
        let parsed: InboundMessage = serde_json::from_value(json!({
            "caller": "+15551234567",
            "utterance": "hi",
            "language_code": "en"
        }))
        .expect("deserialize");
        assert_eq!(parsed.session_id, None);
        assert_eq!(parsed.caller.as_str(), "15551234567");
    }
}
