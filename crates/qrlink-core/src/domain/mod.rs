//! Domain layer: pure business values for QR-Link.
//!
//! # What belongs in the domain layer?
//!
//! - The connection state and the presentation screen selector
//! - The server address and its scheme rule
//! - The debounce interval and the debouncer value object
//! - The names of the persisted settings keys
//!
//! Nothing in here performs I/O, spawns tasks, or reads the clock; callers pass
//! timestamps in explicitly so every rule is deterministic under test.

pub mod address;
pub mod connection;
pub mod debounce;
pub mod settings;
