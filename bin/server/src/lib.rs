//! HTTP front end for long-lasting dialogue sessions.
//!
//! Exposes the turn flow and caller maintenance over JSON.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{delete, get, post},
};
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/turn", post(routes::turn))
        .route("/callers/{phone}/snapshot", get(routes::snapshot))
        .route("/callers/{phone}", delete(routes::reset))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
