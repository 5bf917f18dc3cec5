//! WebSocket server: accept loop and per-session tasks.
//!
//! 1. [`PeerServer::bind`] binds the TCP listener (port 0 picks a free port).
//! 2. [`PeerServer::serve`] accepts connections until `running` is cleared,
//!    spawning one task per scanner session.
//! 3. Each session completes the WebSocket handshake, then decodes every text
//!    frame with [`decode_frame`] and forwards the text as [`ReceivedText`].
//!
//! Frames that do not decode are logged and skipped; the session stays open.
//! Binary frames are ignored.  Control frames are answered by tungstenite.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use qrlink_core::{decode_frame, OutboundFrame};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::domain::ReceivedText;

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Errors raised by the peer server.
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("failed to bind WebSocket listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("WebSocket handshake failed with {peer}: {source}")]
    Handshake {
        peer: SocketAddr,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("socket error on session {peer}: {source}")]
    Socket {
        peer: SocketAddr,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// A bound, not yet serving, peer listener.
pub struct PeerServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl PeerServer {
    /// Binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Bind`] if the address is in use or not permitted.
    pub async fn bind(addr: SocketAddr) -> Result<Self, PeerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| PeerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| PeerError::Bind { addr, source })?;
        Ok(Self { listener, local_addr })
    }

    /// The address actually bound, with the real port when bound to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop until `running` is set to `false`.
    ///
    /// Sessions already in progress keep running until their scanner
    /// disconnects or `received` is dropped.
    pub async fn serve(self, running: Arc<AtomicBool>, received: mpsc::Sender<ReceivedText>) {
        info!("QR-Link peer listening on {}", self.local_addr);

        while running.load(Ordering::Relaxed) {
            // Bounded accept so the shutdown flag is re-checked every poll.
            match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    info!("scanner connected from {peer}");
                    let tx = received.clone();
                    // One task per scanner; the accept loop never waits on a session.
                    tokio::spawn(async move {
                        handle_session(stream, peer, tx).await;
                    });
                }
                // Transient (e.g. out of file descriptors); keep serving.
                Ok(Err(e)) => error!("accept error: {e}"),
                // No connection within this poll.
                Err(_) => {}
            }
        }

        info!("shutdown flag set; accept loop stopped");
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_session(stream: TcpStream, peer: SocketAddr, received: mpsc::Sender<ReceivedText>) {
    match run_session(stream, peer, received).await {
        Ok(()) => info!("session {peer} closed"),
        Err(e) => warn!("session {peer} ended: {e}"),
    }
}

async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    received: mpsc::Sender<ReceivedText>,
) -> Result<(), PeerError> {
    // HTTP upgrade to WebSocket.
    let mut ws = accept_async(stream)
        .await
        .map_err(|source| PeerError::Handshake { peer, source })?;
    debug!("session {peer}: handshake complete");

    // `None` means the TCP stream ended without a close frame.
    while let Some(message) = ws.next().await {
        match message.map_err(|source| PeerError::Socket { peer, source })? {
            WsMessage::Text(json) => match decode_frame(json.as_str()) {
                Ok(OutboundFrame::Text { text }) => {
                    debug!("session {peer}: received {} bytes of text", text.len());
                    if received.send(ReceivedText { peer, text }).await.is_err() {
                        debug!("session {peer}: receiver dropped, closing");
                        break;
                    }
                }
                // Unknown type or malformed JSON: log and keep the session.
                Err(e) => warn!("session {peer}: skipping bad frame: {e}"),
            },
            WsMessage::Binary(data) => {
                debug!("session {peer}: ignoring {} byte binary frame", data.len());
            }
            WsMessage::Close(_) => break,
            // Ping/Pong are answered inside tungstenite.
            _ => {}
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
