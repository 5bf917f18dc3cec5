//! Application layer for the scanner.
//!
//! # What lives here?
//!
//! - **`session`** – The session manager.  It owns the connection state and the
//!   single transport handle, decides what a scanned string means, and tells
//!   the presentation layer which screen to show.
//!
//! - **`transport`** – The [`transport::Transport`] port and the lifecycle
//!   events a transport reports back.  The WebSocket implementation lives in
//!   the infrastructure layer; tests inject a recording fake.
//!
//! - **`settings`** – The [`settings::SettingsStore`] port for the two
//!   persisted values, plus the helpers that turn stored strings back into
//!   domain values.
//!
//! **Dependency rule**: outside of tests, nothing in this layer imports
//! `crate::infrastructure`.

pub mod session;
pub mod settings;
pub mod transport;

pub use session::{ConnectOutcome, PresentationIntent, ScanAction, Session, SessionSnapshot};
pub use settings::{SettingsError, SettingsStore};
pub use transport::{ConnectionId, Transport, TransportError, TransportEvent};
