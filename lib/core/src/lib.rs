//! Core types and utilities shared by the lasting crates.
//!
//! This crate provides the identity types that address conversation state
//! (callers and dialogue sessions) and the rootcause-based `Result` alias.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{CallerId, ParseIdError, SessionId};
