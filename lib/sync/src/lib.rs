//! Twilio Sync backed conversation store.
//!
//! - **Sync Client**: REST access to services, maps and map items
//! - **Sync Store**: [`ConversationStore`](lasting_conversation::ConversationStore)
//!   with one map per caller

pub mod client;
pub mod config;
pub mod error;
pub mod store;

pub use client::{SyncClient, SyncMap, SyncMapItem, SyncService};
pub use config::SyncConfig;
pub use error::SyncApiError;
pub use store::SyncConversationStore;
