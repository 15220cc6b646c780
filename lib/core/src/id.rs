//! Identity types for callers and dialogue sessions.
//!
//! A [`CallerId`] is the durable key a caller's conversation log is stored
//! under. A [`SessionId`] names one dialogue-engine session and is
//! short-lived: revival restores page and parameters, never the
//! old token.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an identity from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Stable identity of one conversation participant, usually a phone number.
///
/// A single leading `+` is dropped so `+15551234567` and `15551234567` address
/// the same log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Parses and normalizes a caller identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is empty, consists only of dots, or
    /// contains anything but ASCII letters, digits and `-_.:@`.
    pub fn parse(raw: &str) -> Result<Self, ParseIdError> {
        let trimmed = raw.trim();
        let normalized = trimmed.strip_prefix('+').unwrap_or(trimmed);

        if normalized.is_empty() {
            return Err(ParseIdError {
                id_type: "CallerId",
                reason: "caller identity is empty".to_string(),
            });
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.' | ':' | '@'))
        {
            return Err(ParseIdError {
                id_type: "CallerId",
                reason: format!("invalid character {bad:?}"),
            });
        }
        // The identity becomes a URL path segment; dot segments would collapse.
        if normalized.chars().all(|c| c == '.') {
            return Err(ParseIdError {
                id_type: "CallerId",
                reason: "caller identity cannot consist only of dots".to_string(),
            });
        }

        Ok(Self(normalized.to_string()))
    }

    /// Returns the normalized identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CallerId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for CallerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Opaque identifier of a dialogue-engine session.
///
/// Values echoed back by the calling channel are taken as-is; new values are
/// minted from a random ULID. Uniqueness is probabilistic, which is enough
/// because the engine scopes sessions per agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an existing session identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh random session identifier.
    #[must_use]
    pub fn mint() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
