//! Dialogflow CX dialogue engine.
//!
//! Implements [`DialogueEngine`](lasting_conversation::DialogueEngine) over
//! the CX v3 `detectIntent` REST method.

pub mod client;
pub mod config;
mod wire;

pub use client::DialogflowClient;
pub use config::DialogflowConfig;
