//! Conversation store contract.
//!
//! Each caller owns one log of snapshots keyed by ISO-8601 timestamps. Keys
//! are UTC with millisecond precision and a `Z` suffix, so lexicographic
//! order equals chronological order and "most recent" is the maximum key.

use crate::error::StoreError;
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use lasting_core::{CallerId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of one log entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryKey(String);

impl EntryKey {
    /// Wraps a key read back from a store.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for the given instant, e.g. `2026-10-19T08:15:30.123Z`.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Key for the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of one caller's log.
///
/// A handle can be derived from a caller without touching the store, so
/// lookups and deletion work whether or not the log exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogHandle {
    name: String,
}

impl LogHandle {
    /// Returns the handle for a caller's log.
    #[must_use]
    pub fn for_caller(caller: &CallerId) -> Self {
        Self {
            name: caller.as_str().to_string(),
        }
    }

    /// Returns the log's unique name within the store.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Result of reading the most recent entry.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLookup {
    /// The entry with the greatest key.
    Found {
        /// Key of the entry.
        key: EntryKey,
        /// Stored snapshot.
        snapshot: Snapshot,
    },
    /// The log is absent or empty.
    NotFound,
}

impl StoreLookup {
    /// Returns true if an entry was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Returns the snapshot, if any.
    #[must_use]
    pub fn into_snapshot(self) -> Option<Snapshot> {
        match self {
            Self::Found { snapshot, .. } => Some(snapshot),
            Self::NotFound => None,
        }
    }
}

/// Trait for conversation log storage.
///
/// Implementations must not serialize access per caller: concurrent turns
/// for one caller rely on last-write-wins per key, not on locking.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns the caller's log, creating an empty one if needed.
    ///
    /// Concurrent calls for the same caller must yield one log.
    async fn ensure_log(&self, caller: &CallerId) -> Result<LogHandle, StoreError>;

    /// Writes an entry, overwriting any entry with the same key.
    async fn append(
        &self,
        log: &LogHandle,
        key: &EntryKey,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError>;

    /// Reads the entry with the greatest key.
    ///
    /// An absent or empty log is `StoreLookup::NotFound`, not an error.
    async fn latest(&self, log: &LogHandle) -> Result<StoreLookup, StoreError>;

    /// Deletes the log and all its entries. Deleting an absent log succeeds.
    async fn delete_log(&self, log: &LogHandle) -> Result<(), StoreError>;
}
