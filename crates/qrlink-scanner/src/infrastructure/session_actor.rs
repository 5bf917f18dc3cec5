//! The task that owns the [`Session`].
//!
//! Two kinds of input reach the session: commands from the presentation layer
//! (connect, disconnect, scans, typed text, settings) and lifecycle events from
//! the transport.  Both are funnelled into one task that `select!`s over the
//! two channels and handles one message at a time, so the session itself needs
//! no locks and every transition sees a consistent state.
//!
//! ```text
//!  SessionHandle ──SessionCommand──►┐
//!                                   ├─► actor task ─► Session ─► Transport
//!  Transport ─────TransportEvent───►┘        │
//!                                            ├─► ScannerAppState (intents, snapshot)
//!                                            └─► watch::Sender<SessionSnapshot>
//! ```
//!
//! Raw camera detections go through the [`BarcodeDebouncer`] here, before the
//! session sees them, using the session's current interval.

use std::sync::Arc;
use std::time::Instant;

use qrlink_core::{BarcodeDebouncer, ScanDebounceInterval, ServerAddress};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::{ConnectOutcome, ScanAction, Session, SessionSnapshot, TransportEvent};
use crate::infrastructure::ui_bridge::ScannerAppState;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Returned by [`SessionHandle`] methods once the actor has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session actor has stopped")]
pub struct SessionStopped;

/// Requests accepted by the actor.
#[derive(Debug)]
pub enum SessionCommand {
    Connect {
        address: ServerAddress,
        reply: oneshot::Sender<ConnectOutcome>,
    },
    Disconnect {
        reply: oneshot::Sender<bool>,
    },
    /// One camera detection, timestamped when it was produced.
    RawScan {
        payload: String,
        at: Instant,
        reply: oneshot::Sender<Option<ScanAction>>,
    },
    SendText {
        text: String,
        /// Whether the text came from the manual field, which is cleared on
        /// success.
        from_field: bool,
        reply: oneshot::Sender<bool>,
    },
    SetDebounceInterval {
        raw: String,
        reply: oneshot::Sender<Option<ScanDebounceInterval>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front door to the session actor.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// User-initiated connect; the settings screen is shown once it opens.
    pub async fn connect(&self, address: ServerAddress) -> Result<ConnectOutcome, SessionStopped> {
        self.request(|reply| SessionCommand::Connect { address, reply }).await
    }

    pub async fn disconnect(&self) -> Result<bool, SessionStopped> {
        self.request(|reply| SessionCommand::Disconnect { reply }).await
    }

    /// Submits a camera detection.  `Ok(None)` means the debouncer dropped it.
    pub async fn raw_scan(
        &self,
        payload: impl Into<String>,
    ) -> Result<Option<ScanAction>, SessionStopped> {
        self.raw_scan_at(payload, Instant::now()).await
    }

    /// Like [`SessionHandle::raw_scan`] with an explicit detection time.
    pub async fn raw_scan_at(
        &self,
        payload: impl Into<String>,
        at: Instant,
    ) -> Result<Option<ScanAction>, SessionStopped> {
        let payload = payload.into();
        self.request(|reply| SessionCommand::RawScan { payload, at, reply }).await
    }

    /// Sends the contents of the manual text field.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<bool, SessionStopped> {
        let text = text.into();
        self.request(|reply| SessionCommand::SendText { text, from_field: true, reply }).await
    }

    /// Sends `text` without touching the manual text field.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<bool, SessionStopped> {
        let text = text.into();
        self.request(|reply| SessionCommand::SendText { text, from_field: false, reply }).await
    }

    pub async fn set_debounce_interval(
        &self,
        raw: impl Into<String>,
    ) -> Result<Option<ScanDebounceInterval>, SessionStopped> {
        let raw = raw.into();
        self.request(|reply| SessionCommand::SetDebounceInterval { raw, reply }).await
    }

    /// Stops the actor, closing the connection but keeping saved settings.
    /// Calling this on a stopped actor is not an error.
    pub async fn shutdown(&self) {
        let _ = self.request(|reply| SessionCommand::Shutdown { reply }).await;
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified after every processed message.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionStopped> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(make(tx)).await.map_err(|_| SessionStopped)?;
        rx.await.map_err(|_| SessionStopped)
    }
}

/// Spawns the actor.  Persisted settings are restored before the first
/// command is handled.
pub fn spawn_session(
    session: Session,
    events: mpsc::Receiver<TransportEvent>,
    app_state: Arc<ScannerAppState>,
) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

    let actor = SessionActor {
        session,
        debouncer: BarcodeDebouncer::new(),
        app_state,
        snapshots: snapshot_tx,
    };
    let join = tokio::spawn(actor.run(command_rx, events));

    (SessionHandle { commands: command_tx, snapshots: snapshot_rx }, join)
}

struct SessionActor {
    session: Session,
    debouncer: BarcodeDebouncer,
    app_state: Arc<ScannerAppState>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut events: mpsc::Receiver<TransportEvent>,
    ) {
        // Saved address and interval are applied before any command is read.
        self.session.restore().await;
        self.flush().await;
        info!("session actor started");

        let mut shutdown_reply = None;
        loop {
            // One message at a time from either source.
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Shutdown { reply }) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    // Every handle dropped.
                    None => break,
                },
                Some(event) = events.recv() => {
                    debug!("transport event {event:?}");
                    self.session.on_transport_event(event).await;
                    self.flush().await;
                }
            }
        }

        // Close the socket but keep the saved address for the next launch.
        self.session.release().await;
        self.flush().await;
        info!("session actor stopped");
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect { address, reply } => {
                let outcome = self.session.connect(address, true).await;
                self.reply(reply, outcome).await;
            }
            SessionCommand::Disconnect { reply } => {
                let changed = self.session.disconnect().await;
                self.reply(reply, changed).await;
            }
            SessionCommand::RawScan { payload, at, reply } => {
                // The debouncer gates every detection before session logic runs.
                let action = if self.debouncer.should_accept(at, self.session.debounce_interval()) {
                    Some(self.session.handle_scanned_payload(&payload).await)
                } else {
                    None
                };
                self.reply(reply, action).await;
            }
            SessionCommand::SendText { text, from_field, reply } => {
                let sent = if from_field {
                    self.session.send_text(&text).await
                } else {
                    self.session.send_message(&text).await
                };
                self.reply(reply, sent).await;
            }
            SessionCommand::SetDebounceInterval { raw, reply } => {
                let interval = self.session.set_debounce_interval(&raw).await;
                self.reply(reply, interval).await;
            }
            SessionCommand::Shutdown { reply } => {
                // Handled by the run loop.
                let _ = reply.send(());
            }
        }
    }

    /// Flushes before answering, so a caller that awaited the reply already
    /// sees the new snapshot and screen.
    async fn reply<T>(&mut self, reply: oneshot::Sender<T>, value: T) {
        self.flush().await;
        let _ = reply.send(value);
    }

    /// Pushes intents and the new snapshot out to the presentation layer.
    async fn flush(&mut self) {
        for intent in self.session.take_intents() {
            self.app_state.apply_intent(intent).await;
        }
        let snapshot = self.session.snapshot();
        self.app_state.publish(snapshot.clone()).await;
        self.snapshots.send_replace(snapshot);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::MemorySettingsStore;
    use crate::infrastructure::transport::mock::RecordingTransport;
    use qrlink_core::{ConnectionState, Screen};
    use std::time::Duration;

    fn spawn_with_recorder() -> (
        SessionHandle,
        mpsc::Sender<TransportEvent>,
        Arc<RecordingTransport>,
        Arc<ScannerAppState>,
    ) {
        let transport = Arc::new(RecordingTransport::new());
        let store = Arc::new(MemorySettingsStore::new());
        let (event_tx, event_rx) = mpsc::channel(8);
        let app_state = ScannerAppState::new();
        let session = Session::new(transport.clone(), store);
        let (handle, _join) = spawn_session(session, event_rx, app_state.clone());
        (handle, event_tx, transport, app_state)
    }

    #[tokio::test]
    async fn test_raw_scans_inside_interval_are_dropped() {
        // Arrange
        let (handle, _events, _transport, _state) = spawn_with_recorder();
        let t0 = Instant::now();

        // Act
        let first = handle.raw_scan_at("hello", t0).await.unwrap();
        let second = handle.raw_scan_at("hello", t0 + Duration::from_millis(899)).await.unwrap();
        let third = handle.raw_scan_at("hello", t0 + Duration::from_millis(900)).await.unwrap();

        // Assert
        assert_eq!(first, Some(ScanAction::Discard));
        assert_eq!(second, None);
        assert_eq!(third, Some(ScanAction::Discard));
    }

    #[tokio::test]
    async fn test_new_interval_applies_to_next_scan() {
        let (handle, _events, _transport, _state) = spawn_with_recorder();
        let t0 = Instant::now();
        handle.raw_scan_at("a", t0).await.unwrap();

        handle.set_debounce_interval("100").await.unwrap();
        let next = handle.raw_scan_at("b", t0 + Duration::from_millis(150)).await.unwrap();

        assert!(next.is_some());
    }

    #[tokio::test]
    async fn test_open_event_updates_app_state_and_snapshot() {
        // Arrange
        let (handle, events, _transport, app_state) = spawn_with_recorder();
        let address = ServerAddress::parse("ws://127.0.0.1:9").unwrap();
        let ConnectOutcome::Started(id) = handle.connect(address).await.unwrap() else {
            panic!("expected a fresh connection");
        };

        // Act
        events.send(TransportEvent::Opened { id }).await.unwrap();
        let mut rx = handle.subscribe();
        rx.wait_for(|s| s.state == ConnectionState::Connected).await.unwrap();

        // Assert
        assert_eq!(*app_state.screen.lock().await, Screen::Settings);
        assert_eq!(app_state.session.lock().await.state, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_after_shutdown() {
        let (handle, _events, _transport, _state) = spawn_with_recorder();

        handle.shutdown().await;

        assert_eq!(handle.disconnect().await, Err(SessionStopped));
    }
}
