//! HTTP handlers for turns and caller maintenance.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use lasting_conversation::{
    EntryKey, InboundMessage, LogHandle, Snapshot, StoreLookup, TurnResponse,
};
use lasting_core::{CallerId, SessionId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Request body for `POST /turn`.
#[derive(Debug, Deserialize)]
pub struct TurnBody {
    /// Caller identity, usually a phone number.
    pub phone: String,
    /// What the caller said.
    pub utterance: String,
    /// Language of the utterance. Defaults to the configured language.
    #[serde(default)]
    pub language_code: Option<String>,
    /// Session id from the previous turn, if the channel kept it.
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

/// Latest stored snapshot of a caller.
#[derive(Debug, Serialize)]
pub struct SnapshotView {
    /// Entry key the snapshot is stored under.
    pub key: EntryKey,
    /// The snapshot.
    pub snapshot: Snapshot,
}

/// Runs one conversation turn.
#[instrument(skip_all)]
pub async fn turn(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TurnBody>,
) -> Result<Json<TurnResponse>, ApiError> {
    let caller = CallerId::parse(&body.phone).map_err(ApiError::InvalidCaller)?;
    let message = InboundMessage {
        caller,
        utterance: body.utterance,
        language_code: body
            .language_code
            .unwrap_or_else(|| state.default_language_code.clone()),
        // An empty echo means the channel lost the session.
        session_id: body.session_id.filter(|id| !id.as_str().is_empty()),
    };

    let response = state
        .orchestrator
        .handle(message)
        .await
        .map_err(ApiError::Turn)?;
    Ok(Json(response))
}

/// Returns the caller's latest snapshot.
#[instrument(skip(state))]
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> Result<Json<SnapshotView>, ApiError> {
    let caller = CallerId::parse(&phone).map_err(ApiError::InvalidCaller)?;
    let lookup = state
        .store
        .latest(&LogHandle::for_caller(&caller))
        .await
        .map_err(ApiError::Store)?;

    match lookup {
        StoreLookup::Found { key, snapshot } => Ok(Json(SnapshotView { key, snapshot })),
        StoreLookup::NotFound => Err(ApiError::SnapshotNotFound {
            caller: caller.to_string(),
        }),
    }
}

/// Deletes the caller's conversation log.
#[instrument(skip(state))]
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
) -> Result<StatusCode, ApiError> {
    let caller = CallerId::parse(&phone).map_err(ApiError::InvalidCaller)?;
    state
        .store
        .delete_log(&LogHandle::for_caller(&caller))
        .await
        .map_err(ApiError::Store)?;
    info!(caller = %caller, "Caller log reset");
    Ok(StatusCode::NO_CONTENT)
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
