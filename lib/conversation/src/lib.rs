//! Long-lasting conversation sessions.
//!
//! This crate keeps dialogue-engine conversations alive across disconnects:
//!
//! - **Conversation Store**: Per-caller, timestamp-keyed snapshot log
//! - **Session Resolver**: Reuse, revive or start a session per message
//! - **Turn Executor**: One dialogue-engine call per message
//! - **State Persister**: Append a snapshot, or delete the log at session end
//! - **Turn Orchestrator**: The per-message flow over all of the above

pub mod engine;
pub mod error;
pub mod executor;
pub mod memory;
pub mod orchestrator;
pub mod persister;
pub mod resolver;
pub mod snapshot;
pub mod store;

pub use engine::{DetectRequest, DetectResponse, DialogueEngine, TurnRequest};
pub use error::{EngineError, PersistError, StoreError, TurnError, TurnStage};
pub use executor::TurnExecutor;
pub use memory::InMemoryConversationStore;
pub use orchestrator::{InboundMessage, TurnOrchestrator, TurnResponse};
pub use persister::{PersistOutcome, StatePersister};
pub use resolver::{ResolvedSession, SessionResolver};
pub use snapshot::{
    Diagnostics, END_SESSION_PAGE, Page, PageState, Parameters, Sentiment, Snapshot,
};
pub use store::{ConversationStore, EntryKey, LogHandle, StoreLookup};
