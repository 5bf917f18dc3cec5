//! Recording transport for tests.
//!
//! Nothing touches the network: `open`, `send_text` and `close` calls are
//! appended to in-memory logs that tests inspect afterwards.  Lifecycle events
//! are never generated; tests deliver them to the session by hand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use qrlink_core::ServerAddress;

use crate::application::transport::{ConnectionId, Transport, TransportError};

/// Test double that records every call it receives.
#[derive(Default)]
pub struct RecordingTransport {
    opened: Mutex<Vec<(ConnectionId, ServerAddress)>>,
    sent: Mutex<Vec<(ConnectionId, String)>>,
    closed: Mutex<Vec<ConnectionId>>,
    should_fail: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `send_text` calls fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<(ConnectionId, ServerAddress)> {
        self.opened.lock().unwrap().clone()
    }

    /// JSON of every frame written, in order.
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, json)| json.clone()).collect()
    }

    pub fn closed(&self) -> Vec<ConnectionId> {
        self.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn open(&self, id: ConnectionId, address: &ServerAddress) {
        self.opened.lock().unwrap().push((id, address.clone()));
    }

    async fn send_text(&self, id: ConnectionId, json: String) -> Result<(), TransportError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(TransportError::Send { id, reason: "simulated failure".to_string() });
        }
        self.sent.lock().unwrap().push((id, json));
        Ok(())
    }

    async fn close(&self, id: ConnectionId) {
        self.closed.lock().unwrap().push(id);
    }
}
