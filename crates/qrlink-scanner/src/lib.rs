//! qrlink-scanner library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the scanner do? (for beginners)
//!
//! The scanner is the phone-side half of QR-Link.  Its camera decodes QR
//! codes; each decoded string is handed to the session manager, which
//!
//! 1. connects to the desktop peer when the string is a `ws://` address,
//! 2. forwards the string as a JSON text frame when already connected, or
//! 3. drops it otherwise.
//!
//! The user can also type text on the settings screen and send it the same
//! way.  The last address and the scan debounce interval survive restarts;
//! on launch the scanner quietly reconnects to the saved address.

/// Application layer: the session manager and the ports it depends on.
pub mod application;

/// Infrastructure layer: WebSocket transport, settings file, session actor and
/// the presentation bridge.
pub mod infrastructure;

/// Line-oriented command parser used by the headless binary.
pub mod driver;
