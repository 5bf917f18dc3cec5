//! The peer endpoint a scanner connects to.
//!
//! A [`ServerAddress`] is any string that starts with [`ADDRESS_SCHEME`].
//! Nothing beyond the prefix is validated here: host, port and path errors are
//! reported by the transport when it tries to connect, which turns them into an
//! ordinary failed connection instead of a synchronous error.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scheme prefix that marks a scanned string as a connection target.
pub const ADDRESS_SCHEME: &str = "ws://";

/// Error returned when a string cannot be used as a [`ServerAddress`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must start with \"ws://\", got {0:?}")]
    MissingScheme(String),
}

/// A `ws://` URI identifying the desktop peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerAddress(String);

impl ServerAddress {
    /// Parses `raw` as a server address.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::MissingScheme`] when `raw` does not start with
    /// `ws://`.
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        if Self::is_connection_target(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AddressError::MissingScheme(raw.to_string()))
        }
    }

    /// Returns `true` if a scanned payload should be treated as a new
    /// connection target rather than as text to forward.
    pub fn is_connection_target(payload: &str) -> bool {
        payload.starts_with(ADDRESS_SCHEME)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ServerAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_connection_target(&value) {
            Ok(Self(value))
        } else {
            Err(AddressError::MissingScheme(value))
        }
    }
}

impl From<ServerAddress> for String {
    fn from(address: ServerAddress) -> Self {
        address.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
