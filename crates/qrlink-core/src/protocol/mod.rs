//! Wire protocol between the scanner and its desktop peer.
//!
//! The protocol is deliberately tiny: the scanner sends JSON text frames and
//! never waits for an answer.  See [`frame`] for the exact shape.

pub mod frame;

pub use frame::{decode_frame, encode_frame, FrameError, OutboundFrame};
