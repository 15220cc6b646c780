//! State settlement after a turn.
//!
//! Active pages append a snapshot under the current instant's key; the
//! terminal page deletes the caller's whole log. Deleting at session end is
//! the only cleanup path: logs of abandoned conversations stay until the
//! engine reaches the terminal page for that caller again.

use crate::engine::DetectResponse;
use crate::error::{PersistError, StoreError};
use crate::snapshot::{PageState, Snapshot};
use crate::store::{ConversationStore, EntryKey, LogHandle};
use chrono::{DateTime, Utc};
use lasting_core::{CallerId, SessionId};
use rootcause::Report;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What settlement did with the caller's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// A snapshot was appended under this key.
    Appended { key: EntryKey },
    /// The session ended and the log was deleted.
    Cleared,
}

/// Persists or destroys conversation state after a turn.
#[derive(Clone)]
pub struct StatePersister {
    store: Arc<dyn ConversationStore>,
}

impl StatePersister {
    /// Creates a persister writing to the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Settles state for a completed turn, keyed by the current instant.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write or delete fails.
    pub async fn persist(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
        response: &DetectResponse,
    ) -> Result<PersistOutcome, Report<PersistError>> {
        self.persist_at(caller, session_id, response, Utc::now())
            .await
    }

    /// Settles state for a completed turn, keyed by `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write or delete fails.
    #[instrument(skip(self, session_id, response), fields(caller = %caller))]
    pub async fn persist_at(
        &self,
        caller: &CallerId,
        session_id: &SessionId,
        response: &DetectResponse,
        at: DateTime<Utc>,
    ) -> Result<PersistOutcome, Report<PersistError>> {
        match response.page_state() {
            PageState::Active => {
                let key = EntryKey::at(at);
                let snapshot = Snapshot::capture(session_id, response);
                self.append(caller, &key, &snapshot).await.map_err(|report| {
                    warn!(error = %report, "snapshot append failed");
                    report.context(PersistError::AppendFailed {
                        caller: caller.clone(),
                    })
                })?;
                Ok(PersistOutcome::Appended { key })
            }
            PageState::Terminal => {
                self.store
                    .delete_log(&LogHandle::for_caller(caller))
                    .await
                    .map_err(|report| {
                        warn!(error = %report, "conversation log delete failed");
                        report.context(PersistError::CleanupFailed {
                            caller: caller.clone(),
                        })
                    })?;
                info!("session ended, conversation log deleted");
                Ok(PersistOutcome::Cleared)
            }
        }
    }

    async fn append(
        &self,
        caller: &CallerId,
        key: &EntryKey,
        snapshot: &Snapshot,
    ) -> Result<(), Report<StoreError>> {
        let log = self.store.ensure_log(caller).await?;
        self.store.append(&log, key, snapshot).await
    }
}
