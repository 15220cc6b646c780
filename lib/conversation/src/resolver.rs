//! Session resolution.
//!
//! Decides, per inbound message, which engine session to use and whether to
//! revive stored state. A session id handed back by the calling channel
//! means the engine still holds the state and nothing is looked up. Without
//! one, a new id is minted and the caller's latest snapshot (if revivable)
//! supplies the page and parameters to resume from.

use crate::engine::TurnRequest;
use crate::error::StoreError;
use crate::store::{ConversationStore, LogHandle, StoreLookup};
use lasting_core::{CallerId, SessionId};
use rootcause::Report;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The session a turn runs in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSession {
    /// Engine session id for this turn.
    pub session_id: SessionId,
    /// Fresh or resumption.
    pub turn: TurnRequest,
}

impl ResolvedSession {
    /// Returns true if stored state is being revived.
    #[must_use]
    pub fn is_revival(&self) -> bool {
        self.turn.is_resumption()
    }
}

/// Resolves the session for each inbound message.
#[derive(Clone)]
pub struct SessionResolver {
    store: Arc<dyn ConversationStore>,
}

impl SessionResolver {
    /// Creates a resolver reading from the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Resolves the session for one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lookup fails. A missing, empty or
    /// unrevivable log is not an error; it yields a fresh session.
    #[instrument(skip(self, known), fields(caller = %caller))]
    pub async fn resolve(
        &self,
        caller: &CallerId,
        known: Option<SessionId>,
    ) -> Result<ResolvedSession, Report<StoreError>> {
        if let Some(session_id) = known {
            debug!(session_id = %session_id, "continuing session held by the channel");
            return Ok(ResolvedSession {
                session_id,
                turn: TurnRequest::Fresh,
            });
        }

        let session_id = SessionId::mint();
        let turn = match self.store.latest(&LogHandle::for_caller(caller)).await? {
            StoreLookup::NotFound => {
                debug!("no stored snapshot, starting fresh");
                TurnRequest::Fresh
            }
            StoreLookup::Found { key, snapshot } => match snapshot.resumption() {
                Some(turn) => {
                    info!(entry = %key, session_id = %session_id, "reviving stored session");
                    turn
                }
                None => {
                    debug!(entry = %key, "stored snapshot is not revivable, starting fresh");
                    TurnRequest::Fresh
                }
            },
        };

        Ok(ResolvedSession { session_id, turn })
    }
}
