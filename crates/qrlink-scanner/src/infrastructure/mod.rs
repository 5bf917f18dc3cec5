//! Infrastructure layer for the scanner: concrete adapters for the ports
//! defined in [`crate::application`], plus the actor that drives a
//! [`crate::application::Session`] from async events.
//!
//! - `transport` – WebSocket client ([`transport::WsTransport`]) and a
//!   recording double for tests.
//! - `storage` – TOML settings file and an in-memory store.
//! - `ui_bridge` – State and commands consumed by the presentation layer.
//! - `session_actor` – The task that owns the session.

pub mod session_actor;
pub mod storage;
pub mod transport;
pub mod ui_bridge;
