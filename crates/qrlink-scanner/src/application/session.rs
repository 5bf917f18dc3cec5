//! Session manager: the single owner of the scanner → peer connection.
//!
//! # Responsibilities
//!
//! - Hold the [`ConnectionState`] and at most one live transport handle.
//! - Decide whether a scanned string is a new connection target, text to
//!   forward, or noise ([`route_scanned_payload`]).
//! - Persist the server address once a connection opens, and forget it when
//!   the connection closes or the user disconnects.
//! - Emit [`PresentationIntent`]s (switch screen, clear the text field) for the
//!   presentation layer to apply.  The session never renders anything.
//!
//! # Event flow (for beginners)
//!
//! ```text
//! presentation ──connect/disconnect/scan/send──► Session ──open/send/close──► Transport
//!      ▲                                          │  ▲                            │
//!      └──────────── PresentationIntent ──────────┘  └──── TransportEvent ────────┘
//! ```
//!
//! All methods take `&mut self`; the caller (the session actor) runs them one
//! at a time, which is the only synchronisation this type needs.
//!
//! # Overlapping connects
//!
//! Scanning the address of the connection that is already opening or open is a
//! no-op, so a QR code left in front of the camera does not reconnect every
//! debounce interval.  Scanning a *different* address closes the current
//! handle first and then opens the new one.

use std::sync::Arc;

use qrlink_core::{
    encode_frame, ConnectionState, OutboundFrame, ScanDebounceInterval, Screen, ServerAddress,
    SettingKey,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::settings::{load_debounce_interval, load_last_address, SettingsStore};
use super::transport::{ConnectionId, Transport, TransportEvent};

/// What the session decided to do with a scanned string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanAction {
    /// The string is a `ws://` address; a connect was requested.
    Connect(ServerAddress),
    /// Connected and not an address; the string was forwarded as a text frame.
    Forward,
    /// Not connected and not an address; nothing happened.
    Discard,
}

/// Instruction for the presentation layer.  Carries no session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationIntent {
    ShowScreen(Screen),
    /// The manual text field was sent and should be emptied.
    ClearTextInput,
}

/// Result of [`Session::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new connection attempt was started.
    Started(ConnectionId),
    /// The previous connection was closed and a new attempt started.
    Replaced {
        previous: ConnectionId,
        id: ConnectionId,
    },
    /// The requested address is already connecting or connected.
    AlreadyActive(ConnectionId),
}

/// Read-only view of the session published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub server_address: Option<ServerAddress>,
    pub debounce_interval: ScanDebounceInterval,
}

/// Decides what a scanned payload means given the current connection state.
///
/// Evaluated in order: a `ws://` prefix always wins, then "connected" forwards,
/// and everything else is discarded.  Every string maps to exactly one action.
pub fn route_scanned_payload(payload: &str, state: ConnectionState) -> ScanAction {
    if let Ok(address) = ServerAddress::parse(payload) {
        ScanAction::Connect(address)
    } else if state.is_connected() {
        ScanAction::Forward
    } else {
        ScanAction::Discard
    }
}

#[derive(Debug, Clone)]
struct ActiveConnection {
    id: ConnectionId,
    address: ServerAddress,
    manual: bool,
}

/// The session manager.  See the module documentation.
pub struct Session {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SettingsStore>,
    state: ConnectionState,
    active: Option<ActiveConnection>,
    debounce_interval: ScanDebounceInterval,
    intents: Vec<PresentationIntent>,
}

impl Session {
    /// Creates a disconnected session with the default debounce interval.
    ///
    /// Call [`Session::restore`] to load persisted settings.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            transport,
            store,
            state: ConnectionState::Disconnected,
            active: None,
            debounce_interval: ScanDebounceInterval::DEFAULT,
            intents: Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Address of the connection that is opening or open.
    pub fn server_address(&self) -> Option<&ServerAddress> {
        self.active.as_ref().map(|a| &a.address)
    }

    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn debounce_interval(&self) -> ScanDebounceInterval {
        self.debounce_interval
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            server_address: self.server_address().cloned(),
            debounce_interval: self.debounce_interval,
        }
    }

    /// Returns and clears the intents emitted since the last call.
    pub fn take_intents(&mut self) -> Vec<PresentationIntent> {
        std::mem::take(&mut self.intents)
    }

    // ── Startup ───────────────────────────────────────────────────────────────

    /// Loads persisted settings and, if an address was saved, reconnects to it
    /// without any screen change.
    pub async fn restore(&mut self) {
        self.debounce_interval = load_debounce_interval(self.store.as_ref()).await;
        debug!("debounce interval {}ms", self.debounce_interval.as_millis());

        if let Some(address) = load_last_address(self.store.as_ref()).await {
            info!("restoring connection to {address}");
            self.connect(address, false).await;
        }
    }

    // ── Operations ────────────────────────────────────────────────────────────

    /// Starts connecting to `address`.
    ///
    /// `manual` marks a user-initiated connect: once it opens, the settings
    /// screen is shown.  Automatic connects (restore, scanned addresses) leave
    /// the screen alone.
    pub async fn connect(&mut self, address: ServerAddress, manual: bool) -> ConnectOutcome {
        let mut previous = None;

        if let Some(active) = self.active.as_mut() {
            // Same address: keep the attempt that is already running.
            if active.address == address {
                debug!("connect to {address} ignored: connection {} already active", active.id);
                if manual {
                    active.manual = true;
                    if self.state.is_connected() {
                        self.intents.push(PresentationIntent::ShowScreen(Screen::Settings));
                    }
                }
                return ConnectOutcome::AlreadyActive(active.id);
            }

            // Different address: drop the old handle first so at most one is live.
            info!("replacing connection {} to {} with {address}", active.id, active.address);
            previous = Some(active.id);
            self.transport.close(active.id).await;
        }

        let id = ConnectionId::new();
        info!("connecting to {address} (connection {id}, manual={manual})");
        self.active = Some(ActiveConnection { id, address: address.clone(), manual });
        self.state = ConnectionState::Connecting;
        self.transport.open(id, &address).await;

        match previous {
            Some(previous) => ConnectOutcome::Replaced { previous, id },
            None => ConnectOutcome::Started(id),
        }
    }

    /// Closes the current connection without waiting for the transport.
    ///
    /// Returns `false` (and does nothing at all) when already disconnected.
    pub async fn disconnect(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            debug!("disconnect ignored: not connected");
            return false;
        };

        info!("disconnecting from {} (connection {})", active.address, active.id);
        self.transport.close(active.id).await;
        // Do not wait for `Closed`; it will arrive for a handle we no longer own.
        self.state = ConnectionState::Disconnected;
        self.intents.push(PresentationIntent::ShowScreen(Screen::Scan));
        self.forget(SettingKey::LastServerAddress).await;
        true
    }

    /// Routes one accepted scan.  See [`route_scanned_payload`].
    pub async fn handle_scanned_payload(&mut self, payload: &str) -> ScanAction {
        let action = route_scanned_payload(payload, self.state);
        match &action {
            ScanAction::Connect(address) => {
                self.connect(address.clone(), false).await;
            }
            ScanAction::Forward => {
                self.forward(payload).await;
            }
            ScanAction::Discard => {
                debug!("scan discarded: not connected");
            }
        }
        action
    }

    /// Sends text typed into the manual field.
    ///
    /// Same rules as [`Session::send_message`]; on success the text field is
    /// also cleared.
    pub async fn send_text(&mut self, payload: &str) -> bool {
        let sent = self.send_message(payload).await;
        if sent {
            self.intents.push(PresentationIntent::ClearTextInput);
        }
        sent
    }

    /// Sends text that did not come from the manual field, leaving the field
    /// as it is.
    ///
    /// Blank input is rejected.  Returns `true` only if a frame was handed to
    /// the transport.
    pub async fn send_message(&mut self, payload: &str) -> bool {
        let text = payload.trim();
        if text.is_empty() {
            debug!("send ignored: empty message");
            return false;
        }
        if !self.state.is_connected() {
            debug!("send ignored: not connected");
            return false;
        }

        self.forward(text).await
    }

    /// Applies a user-entered debounce interval.
    ///
    /// Invalid input leaves the current value untouched and returns `None`.
    pub async fn set_debounce_interval(&mut self, raw: &str) -> Option<ScanDebounceInterval> {
        let Some(interval) = ScanDebounceInterval::parse(raw) else {
            debug!("ignoring invalid debounce interval {raw:?}");
            return None;
        };
        self.debounce_interval = interval;
        self.persist(SettingKey::ScanDebounceMs, &interval.to_string()).await;
        info!("debounce interval set to {}ms", interval.as_millis());
        Some(interval)
    }

    /// Closes the transport handle without touching persisted settings, so the
    /// next launch reconnects to the same address.
    pub async fn release(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("releasing connection {}", active.id);
            self.transport.close(active.id).await;
        }
        self.state = ConnectionState::Disconnected;
    }

    // ── Transport events ──────────────────────────────────────────────────────

    /// Applies one lifecycle event reported by the transport.
    pub async fn on_transport_event(&mut self, event: TransportEvent) {
        let id = event.id();
        let is_current = self.current_connection() == Some(id);

        match event {
            TransportEvent::Opened { .. } if !is_current => {
                // Disconnected or replaced while the handshake was in flight.
                debug!("closing stale connection {id} that opened late");
                self.transport.close(id).await;
            }
            TransportEvent::Opened { .. } => self.on_opened().await,
            TransportEvent::Closed { .. } if !is_current => {
                debug!("ignoring close of stale connection {id}");
            }
            TransportEvent::Closed { .. } => self.on_closed().await,
            TransportEvent::Error { message, .. } => {
                if is_current {
                    warn!("connection {id} error: {message}");
                } else {
                    debug!("stale connection {id} error: {message}");
                }
            }
        }
    }

    async fn on_opened(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!("duplicate open event ignored");
            return;
        }
        let Some(active) = self.active.clone() else {
            return;
        };

        info!("connected to {} (connection {})", active.address, active.id);
        self.state = ConnectionState::Connected;
        // Only an address that actually opened is worth reconnecting to.
        self.persist(SettingKey::LastServerAddress, active.address.as_str()).await;
        if active.manual {
            self.intents.push(PresentationIntent::ShowScreen(Screen::Settings));
        }
    }

    async fn on_closed(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        if self.state.is_connected() {
            info!("connection to {} closed", active.address);
        } else {
            info!("could not connect to {}", active.address);
        }
        self.state = ConnectionState::Disconnected;
        self.intents.push(PresentationIntent::ShowScreen(Screen::Scan));
        // A closed connection is never retried on the next launch.
        self.forget(SettingKey::LastServerAddress).await;
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Hands `text` to the transport as one text frame on the current connection.
    async fn forward(&mut self, text: &str) -> bool {
        let Some(id) = self.current_connection() else {
            return false;
        };

        let json = match encode_frame(&OutboundFrame::text(text)) {
            Ok(json) => json,
            Err(e) => {
                warn!("could not encode text frame: {e}");
                return false;
            }
        };

        match self.transport.send_text(id, json).await {
            Ok(()) => {
                debug!("sent {} bytes of text on connection {id}", text.len());
                true
            }
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    async fn persist(&self, key: SettingKey, value: &str) {
        if let Err(e) = self.store.set(key, value).await {
            warn!("could not persist {key}: {e}");
        }
    }

    async fn forget(&self, key: SettingKey) {
        if let Err(e) = self.store.remove(key).await {
            warn!("could not remove {key}: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
