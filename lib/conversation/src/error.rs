//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError`: Errors from conversation store operations
//! - `EngineError`: Errors from the dialogue engine
//! - `PersistError`: Which settlement step failed after a turn
//! - `TurnError`: High-level wrapper naming the failed turn stage
//!
//! "Not found" is absent from `StoreError`: a missing log or an
//! empty log is an ordinary lookup result, not a failure.

use lasting_core::{CallerId, SessionId};
use std::fmt;

/// Errors from conversation store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached.
    ConnectionFailed { reason: String },
    /// The store rejected or failed a request.
    RequestFailed { operation: String, reason: String },
    /// The store answered with something we could not interpret.
    UnexpectedResponse { operation: String, reason: String },
    /// A snapshot could not be encoded for storage.
    InvalidData { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { reason } => {
                write!(f, "conversation store unreachable: {reason}")
            }
            Self::RequestFailed { operation, reason } => {
                write!(f, "conversation store {operation} failed: {reason}")
            }
            Self::UnexpectedResponse { operation, reason } => {
                write!(
                    f,
                    "unexpected conversation store response to {operation}: {reason}"
                )
            }
            Self::InvalidData { reason } => write!(f, "invalid snapshot data: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from dialogue engine calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The request never produced a response (network, timeout).
    RequestFailed { reason: String },
    /// The engine answered with an error status.
    Rejected { status: u16, message: String },
    /// The engine response could not be parsed.
    ResponseParseFailed { reason: String },
    /// The engine client is misconfigured.
    InvalidConfig { reason: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { reason } => {
                write!(f, "dialogue engine request failed: {reason}")
            }
            Self::Rejected { status, message } => {
                write!(f, "dialogue engine rejected request ({status}): {message}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse dialogue engine response: {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid dialogue engine configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Settlement failures after a successful engine call.
///
/// Use these to add context when wrapping `StoreError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// Appending the new snapshot failed.
    AppendFailed { caller: CallerId },
    /// Deleting the caller's log at session end failed.
    CleanupFailed { caller: CallerId },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppendFailed { caller } => {
                write!(f, "failed to append snapshot for caller {caller}")
            }
            Self::CleanupFailed { caller } => {
                write!(f, "failed to delete conversation log for caller {caller}")
            }
        }
    }
}

impl std::error::Error for PersistError {}

/// The stage of a turn in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    /// Looking up a revivable snapshot.
    ResolveSession,
    /// Calling the dialogue engine.
    ExecuteTurn,
    /// Appending the new snapshot.
    Persist,
    /// Deleting the log after the terminal page.
    Cleanup,
}

impl TurnStage {
    /// Returns the stage name used in logs and error payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveSession => "resolve_session",
            Self::ExecuteTurn => "execute_turn",
            Self::Persist => "persist",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// High-level turn errors.
///
/// Use these to add context when wrapping store and engine errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// Session resolution context (use as context wrapper).
    ResolveSession { caller: CallerId },
    /// Engine call context (use as context wrapper).
    ExecuteTurn {
        caller: CallerId,
        session_id: SessionId,
    },
    /// Snapshot append context (use as context wrapper).
    Persist { caller: CallerId },
    /// Log deletion context (use as context wrapper).
    Cleanup { caller: CallerId },
}

impl TurnError {
    /// Returns the stage the turn failed in.
    #[must_use]
    pub fn stage(&self) -> TurnStage {
        match self {
            Self::ResolveSession { .. } => TurnStage::ResolveSession,
            Self::ExecuteTurn { .. } => TurnStage::ExecuteTurn,
            Self::Persist { .. } => TurnStage::Persist,
            Self::Cleanup { .. } => TurnStage::Cleanup,
        }
    }

    /// Returns the caller whose turn failed.
    #[must_use]
    pub fn caller(&self) -> &CallerId {
        match self {
            Self::ResolveSession { caller }
            | Self::ExecuteTurn { caller, .. }
            | Self::Persist { caller }
            | Self::Cleanup { caller } => caller,
        }
    }
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolveSession { caller } => {
                write!(f, "session resolution failed for caller {caller}")
            }
            Self::ExecuteTurn { caller, session_id } => {
                write!(
                    f,
                    "turn execution failed for caller {caller} in session {session_id}"
                )
            }
            Self::Persist { caller } => {
                write!(f, "state persistence failed for caller {caller}")
            }
            Self::Cleanup { caller } => {
                write!(f, "session cleanup failed for caller {caller}")
            }
        }
    }
}

impl std::error::Error for TurnError {}
