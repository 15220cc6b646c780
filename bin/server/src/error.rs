//! Server error types.
//!
//! - `StartupError`: Fatal problems while wiring the process
//! - `ApiError`: Per-request failures, rendered as JSON responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lasting_conversation::{StoreError, TurnError};
use lasting_core::ParseIdError;
use rootcause::Report;
use serde::Serialize;
use std::fmt;

/// Errors that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration is missing or invalid.
    Config { details: String },
    /// The conversation store could not be initialized.
    Store,
    /// The dialogue engine client could not be initialized.
    Engine,
    /// The listener could not bind.
    Bind { addr: String, details: String },
    /// The server stopped with an error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {}", details),
            Self::Store => write!(f, "failed to initialize conversation store"),
            Self::Engine => write!(f, "failed to initialize dialogue engine"),
            Self::Bind { addr, details } => {
                write!(f, "failed to bind to '{}': {}", addr, details)
            }
            Self::Serve { details } => write!(f, "server error: {}", details),
        }
    }
}

impl std::error::Error for StartupError {}

/// Errors returned from HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The caller identity in the request is unusable.
    InvalidCaller(ParseIdError),
    /// No snapshot is stored for the caller.
    SnapshotNotFound { caller: String },
    /// The turn failed at some stage.
    Turn(Report<TurnError>),
    /// A maintenance operation on the store failed.
    Store(Report<StoreError>),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub error: String,
    /// Failed turn stage, for turn failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::InvalidCaller(err) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: err.to_string(),
                    stage: None,
                },
            ),
            Self::SnapshotNotFound { caller } => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: format!("no snapshot stored for caller '{}'", caller),
                    stage: None,
                },
            ),
            Self::Turn(report) => {
                tracing::error!(error = %report, "Turn failed");
                let context = report.current_context();
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error: context.to_string(),
                        stage: Some(context.stage().as_str()),
                    },
                )
            }
            Self::Store(report) => {
                tracing::error!(error = %report, "Conversation store error");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        error: report.current_context().to_string(),
                        stage: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
