//! # qrlink-core
//!
//! Shared library for QR-Link containing the domain entities and the JSON wire
//! frames exchanged between the scanner and its desktop peer.
//!
//! This crate is used by both the scanner and the peer applications.
//! It has zero dependencies on sockets, files, or async runtimes.
//!
//! # Architecture overview (for beginners)
//!
//! QR-Link turns a camera into a keyboard for another machine: the scanner
//! reads QR codes, and every decoded string is either
//!
//! - a `ws://` address, which tells the scanner *where* to connect, or
//! - arbitrary text, which is forwarded to the connected peer.
//!
//! This crate (`qrlink-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Pure values with no I/O: the connection state, the server
//!   address, the scan debounce interval and the [`BarcodeDebouncer`] that
//!   filters a QR code lingering in front of the camera.
//!
//! - **`protocol`** – What travels over the WebSocket.  Every outbound message
//!   is a JSON text frame such as `{"type":"text","text":"hello"}`.

pub mod domain;
pub mod protocol;

pub use domain::address::{AddressError, ServerAddress, ADDRESS_SCHEME};
pub use domain::connection::{CameraFacing, CameraSettings, ConnectionState, Screen};
pub use domain::debounce::{BarcodeDebouncer, ScanDebounceInterval};
pub use domain::settings::SettingKey;
pub use protocol::frame::{decode_frame, encode_frame, FrameError, OutboundFrame};
