//! Twilio Sync API error types.

use std::fmt;

/// Errors from Twilio Sync REST calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncApiError {
    /// The request could not be sent or timed out.
    Transport {
        /// Error details.
        details: String,
    },
    /// Twilio answered with an error status.
    Api {
        /// HTTP status.
        status: u16,
        /// Twilio error code, when the body carried one.
        code: Option<u32>,
        /// Twilio error message.
        message: String,
    },
    /// A response body could not be decoded.
    Decode {
        /// Error details.
        details: String,
    },
    /// Client configuration is unusable.
    InvalidConfig {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for SyncApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { details } => write!(f, "sync request failed: {}", details),
            Self::Api {
                status,
                code: Some(code),
                message,
            } => write!(f, "sync API error {} (code {}): {}", status, code, message),
            Self::Api {
                status,
                code: None,
                message,
            } => write!(f, "sync API error {}: {}", status, message),
            Self::Decode { details } => {
                write!(f, "failed to decode sync response: {}", details)
            }
            Self::InvalidConfig { details } => {
                write!(f, "invalid sync configuration: {}", details)
            }
        }
    }
}

impl std::error::Error for SyncApiError {}
