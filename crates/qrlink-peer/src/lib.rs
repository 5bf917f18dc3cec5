//! qrlink-peer library crate.
//!
//! The desktop side of QR-Link in its simplest form: a WebSocket server that
//! accepts scanner sessions, decodes each text frame and hands the text to
//! whoever holds the receiving end of a channel.  The binary prints it; the
//! scanner's integration tests assert on it.
//!
//! ```text
//! qrlink-scanner ──{"type":"text","text":"…"}──► PeerServer ──ReceivedText──► mpsc
//! ```
//!
//! # Layer rules
//!
//! - `domain` holds configuration and the received-text value; no I/O.
//! - `infrastructure` owns the listener and session tasks.

/// Domain layer: configuration and received values.
pub mod domain;

/// Infrastructure layer: WebSocket accept loop.
pub mod infrastructure;
