//! In-process conversation store.
//!
//! Used for local runs without a remote store and as the fake behind the
//! orchestration tests. Entries live in a `BTreeMap` per log, so the latest
//! entry is the last key.

use crate::error::StoreError;
use crate::snapshot::Snapshot;
use crate::store::{ConversationStore, EntryKey, LogHandle, StoreLookup};
use async_trait::async_trait;
use lasting_core::CallerId;
use rootcause::Report;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

type Log = BTreeMap<EntryKey, Snapshot>;

/// Conversation store held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationStore {
    logs: Arc<RwLock<HashMap<String, Log>>>,
}

impl InMemoryConversationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of logs.
    pub async fn log_count(&self) -> usize {
        self.logs.read().await.len()
    }

    /// Returns true if a log exists for the handle.
    pub async fn contains_log(&self, log: &LogHandle) -> bool {
        self.logs.read().await.contains_key(log.name())
    }

    /// Returns the number of entries in a log (zero if absent).
    pub async fn entry_count(&self, log: &LogHandle) -> usize {
        self.logs
            .read()
            .await
            .get(log.name())
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn ensure_log(&self, caller: &CallerId) -> Result<LogHandle, Report<StoreError>> {
        let handle = LogHandle::for_caller(caller);
        self.logs
            .write()
            .await
            .entry(handle.name().to_string())
            .or_default();
        Ok(handle)
    }

    async fn append(
        &self,
        log: &LogHandle,
        key: &EntryKey,
        snapshot: &Snapshot,
    ) -> Result<(), Report<StoreError>> {
        let mut logs = self.logs.write().await;
        let Some(entries) = logs.get_mut(log.name()) else {
            return Err(StoreError::RequestFailed {
                operation: "append".to_string(),
                reason: format!("log '{}' does not exist", log.name()),
            }
            .into());
        };
        entries.insert(key.clone(), snapshot.clone());
        Ok(())
    }

    async fn latest(&self, log: &LogHandle) -> Result<StoreLookup, Report<StoreError>> {
        let logs = self.logs.read().await;
        let lookup = logs
            .get(log.name())
            .and_then(|entries| entries.last_key_value())
            .map_or(StoreLookup::NotFound, |(key, snapshot)| StoreLookup::Found {
                key: key.clone(),
                snapshot: snapshot.clone(),
            });
        Ok(lookup)
    }

    async fn delete_log(&self, log: &LogHandle) -> Result<(), Report<StoreError>> {
        self.logs.write().await.remove(log.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Page, Parameters};
    use lasting_core::SessionId;

    fn caller() -> CallerId {
        CallerId::parse("+15551234567").expect("valid caller")
    }

    fn snapshot(page: &str) -> Snapshot {
        Snapshot {
            session_id: Some(SessionId::new("s1")),
            current_page: Some(Page::new(format!("pages/{page}"), page)),
            parameters: Some(Parameters::new()),
            ..Snapshot::default()
        }
    }

    #[tokio::test]
    async fn concurrent_ensure_log_creates_one_log() {
        let store = InMemoryConversationStore::new();
        let caller = caller();

        let handles = futures::future::join_all(
            (0..16).map(|_| {
                let store = store.clone();
                let caller = caller.clone();
                tokio::spawn(async move { store.ensure_log(&caller).await })
            }),
        )
        .await;

        for handle in handles {
            let log = handle.expect("task").expect("ensure_log");
            assert_eq!(log, LogHandle::for_caller(&caller));
        }
        assert_eq!(store.log_count().await, 1);
    }

    #[tokio::test]
    async fn latest_is_max_key_regardless_of_insertion_order() {
        let store = InMemoryConversationStore::new();
        let log = store.ensure_log(&caller()).await.expect("ensure_log");

        for (key, page) in [
            ("2026-10-19T08:15:30.200Z", "Middle"),
            ("2026-10-19T08:15:31.000Z", "Newest"),
            ("2026-10-19T08:15:30.100Z", "Oldest"),
        ] {
            store
                .append(&log, &EntryKey::new(key), &snapshot(page))
                .await
                .expect("append");
        }

        match store.latest(&log).await.expect("latest") {
            StoreLookup::Found { key, snapshot } => {
                assert_eq!(key.as_str(), "2026-10-19T08:15:31.000Z");
                assert_eq!(
                    snapshot.current_page.map(|p| p.display_name),
                    Some("Newest".to_string())
                );
            }
            StoreLookup::NotFound => panic!("expected an entry"),
        }
    }

    #[tokio::test]
    async fn same_key_overwrites() {
        let store = InMemoryConversationStore::new();
        let log = store.ensure_log(&caller()).await.expect("ensure_log");
        let key = EntryKey::new("2026-10-19T08:15:30.100Z");

        store.append(&log, &key, &snapshot("First")).await.expect("append");
        store.append(&log, &key, &snapshot("Second")).await.expect("append");

        assert_eq!(store.entry_count(&log).await, 1);
        let latest = store.latest(&log).await.expect("latest").into_snapshot();
        assert_eq!(
            latest.and_then(|s| s.current_page).map(|p| p.display_name),
            Some("Second".to_string())
        );
    }

    #[tokio::test]
    async fn latest_on_unknown_caller_is_not_found() {
        let store = InMemoryConversationStore::new();
        let lookup = store
            .latest(&LogHandle::for_caller(&caller()))
            .await
            .expect("latest must not fail");
        assert_eq!(lookup, StoreLookup::NotFound);
    }

    #[tokio::test]
    async fn latest_on_empty_log_is_not_found() {
        let store = InMemoryConversationStore::new();
        let log = store.ensure_log(&caller()).await.expect("ensure_log");
        assert_eq!(store.latest(&log).await.expect("latest"), StoreLookup::NotFound);
    }

    #[tokio::test]
    async fn delete_log_is_idempotent() {
        let store = InMemoryConversationStore::new();
        let log = store.ensure_log(&caller()).await.expect("ensure_log");
        store
            .append(&log, &EntryKey::now(), &snapshot("Active"))
            .await
            .expect("append");

        store.delete_log(&log).await.expect("first delete");
        store.delete_log(&log).await.expect("second delete");

        assert!(!store.contains_log(&log).await);
        assert_eq!(store.latest(&log).await.expect("latest"), StoreLookup::NotFound);
    }

    #[tokio::test]
    async fn append_without_log_fails() {
        let store = InMemoryConversationStore::new();
        let result = store
            .append(
                &LogHandle::for_caller(&caller()),
                &EntryKey::now(),
                &snapshot("Active"),
            )
            .await;
        assert!(result.is_err());
    }
}
