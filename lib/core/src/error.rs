//! Shared result alias.
//!
//! Store, engine and turn errors live in the crates that raise them. This
//! alias only fixes the report type so every layer attaches its own context
//! with rootcause as a failure travels from a remote call up to the turn.

use rootcause::Report;

/// A result whose error is a rootcause [`Report`] with `C` as its current context.
pub type Result<T, C> = std::result::Result<T, Report<C>>;
