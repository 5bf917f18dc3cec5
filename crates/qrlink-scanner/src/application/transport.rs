//! Transport port: how the session manager talks to a WebSocket.
//!
//! The session manager never touches a socket.  It asks a [`Transport`] to
//! open, write to, or close a connection identified by a [`ConnectionId`], and
//! the transport reports what actually happened as [`TransportEvent`]s on a
//! channel handed to it at construction time.
//!
//! # Why tag everything with an id?
//!
//! A connection attempt can outlive the session's interest in it: the user may
//! disconnect (or scan a different address) before the socket finishes
//! opening.  Every event carries the id of the connection that produced it, so
//! the session can recognise and ignore events from a handle it no longer owns.

use std::fmt;

use async_trait::async_trait;
use qrlink_core::ServerAddress;
use thiserror::Error;
use uuid::Uuid;

/// Identifies one connection attempt from `open` to its final `Closed` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first group is plenty to tell attempts apart in a log.
        let full = self.0.simple().to_string();
        f.write_str(&full[..8])
    }
}

/// Lifecycle events reported by a transport.
///
/// For one id, `Opened` (if it happens at all) always precedes `Closed`, and
/// `Closed` is always the last event.  `Error` may or may not be delivered
/// before `Closed`; the session must not depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The WebSocket handshake completed.
    Opened { id: ConnectionId },
    /// The connection is gone: handshake failure, remote close, local close or
    /// I/O error.
    Closed { id: ConnectionId },
    /// Something went wrong; informational only.
    Error { id: ConnectionId, message: String },
}

impl TransportEvent {
    pub fn id(&self) -> ConnectionId {
        match self {
            TransportEvent::Opened { id }
            | TransportEvent::Closed { id }
            | TransportEvent::Error { id, .. } => *id,
        }
    }
}

/// Errors returned by [`Transport::send_text`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// No open connection with this id is held by the transport.
    #[error("connection {0} is not open")]
    NotOpen(ConnectionId),
    /// Earlier frames on this connection are still waiting to be written.
    #[error("connection {0} is busy: too many frames waiting to be written")]
    Busy(ConnectionId),
    /// The frame could not be written to the socket.
    #[error("failed to send on connection {id}: {reason}")]
    Send { id: ConnectionId, reason: String },
}

/// Port implemented by the WebSocket client (and by test doubles).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Starts connecting to `address`.
    ///
    /// Returns without waiting for the handshake; the outcome is reported as
    /// `Opened`/`Error`/`Closed` events for `id`.  Malformed addresses are
    /// reported the same way.
    async fn open(&self, id: ConnectionId, address: &ServerAddress);

    /// Hands one JSON text frame to the connection `id` for writing.
    ///
    /// Must not wait on the socket: a peer that stops reading may not block
    /// the caller.  Write failures that happen later are reported as events.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] if `id` is not an open connection,
    /// [`TransportError::Busy`] if frames are piling up unwritten, or
    /// [`TransportError::Send`] if the frame is refused outright.
    async fn send_text(&self, id: ConnectionId, json: String) -> Result<(), TransportError>;

    /// Requests that connection `id` be closed.  Unknown ids are ignored, so
    /// calling this twice is harmless.
    async fn close(&self, id: ConnectionId);
}
