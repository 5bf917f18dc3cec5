//! WebSocket client transport.
//!
//! [`WsTransport`] implements the [`Transport`] port with `tokio-tungstenite`.
//! Every `open` spawns one task that owns the socket for that connection:
//!
//! ```text
//!            open(id)                  send_text(id)           close(id)
//!               │                           │                      │
//!               ▼                           ▼                      ▼
//!   spawn connection task ◄──── frame via mpsc ────────   drop the sender
//!               │
//!               ├─► TransportEvent::Opened / Error / Closed ─► session actor
//! ```
//!
//! Closing is signalled by dropping the command sender: the task notices its
//! command channel has ended, performs the WebSocket close handshake (bounded
//! by [`CLOSE_TIMEOUT`]) and reports `Closed`.  A close that arrives while the
//! handshake is still running aborts the attempt.
//!
//! `send_text` only queues the frame for the connection task and never waits
//! for the socket, so a peer that stops reading cannot stall the caller.  A
//! full queue is reported as [`TransportError::Busy`]; a write that does not
//! finish within [`SEND_TIMEOUT`] fails the connection.
//!
//! Inbound frames from the peer are read (so control frames are answered) and
//! then discarded: the protocol is one-way.

pub mod mock;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use qrlink_core::ServerAddress;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, trace, warn};

use crate::application::transport::{ConnectionId, Transport, TransportError, TransportEvent};

/// Upper bound on how long a local close waits for the peer's close frame.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on one socket write before the connection is given up.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Frames queued per connection before `send_text` reports `Busy`.
const OUTBOUND_CAPACITY: usize = 16;

/// JSON text frames waiting to be written by a connection task.
type ConnectionMap = Arc<Mutex<HashMap<ConnectionId, mpsc::Sender<String>>>>;

/// `tokio-tungstenite` implementation of [`Transport`].
#[derive(Clone)]
pub struct WsTransport {
    events: mpsc::Sender<TransportEvent>,
    connections: ConnectionMap,
}

impl WsTransport {
    /// Creates a transport that reports lifecycle events on `events`.
    pub fn new(events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            events,
            connections: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of connection tasks still alive (opening, open or closing).
    pub async fn live_connections(&self) -> usize {
        self.connections.lock().await.len()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, id: ConnectionId, address: &ServerAddress) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        self.connections.lock().await.insert(id, tx);

        let task = ConnectionTask {
            id,
            url: address.as_str().to_string(),
            events: self.events.clone(),
            connections: Arc::clone(&self.connections),
        };
        tokio::spawn(task.run(rx));
    }

    async fn send_text(&self, id: ConnectionId, json: String) -> Result<(), TransportError> {
        let sender = self
            .connections
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(TransportError::NotOpen(id))?;

        // Queue only; the connection task owns the socket write.
        sender.try_send(json).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Busy(id),
            mpsc::error::TrySendError::Closed(_) => TransportError::NotOpen(id),
        })
    }

    async fn close(&self, id: ConnectionId) {
        if self.connections.lock().await.remove(&id).is_some() {
            debug!("close requested for connection {id}");
        }
    }
}

/// State owned by one spawned connection task.
struct ConnectionTask {
    id: ConnectionId,
    url: String,
    events: mpsc::Sender<TransportEvent>,
    connections: ConnectionMap,
}

impl ConnectionTask {
    async fn run(self, mut commands: mpsc::Receiver<String>) {
        let id = self.id;
        debug!("connection {id}: connecting to {}", self.url);

        // Race the handshake against the command channel so a close that
        // arrives mid-handshake abandons the attempt.
        let connecting = connect_async(self.url.as_str());
        tokio::pin!(connecting);

        let stream = loop {
            tokio::select! {
                result = &mut connecting => match result {
                    Ok((stream, _response)) => break stream,
                    Err(e) => {
                        warn!("connection {id}: could not connect to {}: {e}", self.url);
                        self.emit(TransportEvent::Error { id, message: e.to_string() }).await;
                        self.finish().await;
                        return;
                    }
                },
                command = commands.recv() => match command {
                    Some(_) => debug!("connection {id}: dropping frame queued before open"),
                    // Every sender dropped: `close` was called.
                    None => {
                        debug!("connection {id}: closed before the handshake completed");
                        self.finish().await;
                        return;
                    }
                },
            }
        };

        info!("connection {id}: open to {}", self.url);
        self.emit(TransportEvent::Opened { id }).await;

        // Split so outbound writes and inbound reads can be awaited together.
        let (mut sink, mut source) = stream.split();
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(json) => {
                        // A peer that stops reading fills the TCP window; give
                        // up on the connection rather than wait forever.
                        let message = match timeout(SEND_TIMEOUT, sink.send(WsMessage::text(json))).await {
                            Ok(Ok(())) => continue,
                            Ok(Err(e)) => e.to_string(),
                            Err(_) => format!("write did not complete within {SEND_TIMEOUT:?}"),
                        };
                        warn!("connection {id}: send failed: {message}");
                        self.emit(TransportEvent::Error { id, message }).await;
                        break;
                    }
                    None => {
                        debug!("connection {id}: closing");
                        // The close frame itself can stall behind unread data.
                        let _ = timeout(CLOSE_TIMEOUT, sink.close()).await;
                        // Wait for the peer's close frame so the handshake completes.
                        let _ = timeout(CLOSE_TIMEOUT, async {
                            while let Some(Ok(_)) = source.next().await {}
                        })
                        .await;
                        break;
                    }
                },
                inbound = source.next() => match inbound {
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!("connection {id}: closed by peer ({frame:?})");
                        break;
                    }
                    Some(Ok(msg)) => {
                        trace!("connection {id}: ignoring inbound {} byte frame", msg.len());
                    }
                    Some(Err(e)) => {
                        warn!("connection {id}: socket error: {e}");
                        self.emit(TransportEvent::Error { id, message: e.to_string() }).await;
                        break;
                    }
                    None => {
                        info!("connection {id}: stream ended");
                        break;
                    }
                },
            }
        }

        self.finish().await;
    }

    /// Deregisters the connection and reports `Closed`, always last.
    async fn finish(&self) {
        self.connections.lock().await.remove(&self.id);
        self.emit(TransportEvent::Closed { id: self.id }).await;
    }

    async fn emit(&self, event: TransportEvent) {
        if self.events.send(event).await.is_err() {
            trace!("connection {}: event receiver dropped", self.id);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
