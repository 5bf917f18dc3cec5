//! JSON text frames sent from the scanner to the peer.
//!
//! # JSON discriminant
//!
//! Every frame is a JSON object with a `"type"` field that identifies the
//! variant.  All other fields are flattened into the same object:
//!
//! ```json
//! {"type":"text","text":"hello world"}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` attribute handles this automatically, and
//! always writes the tag first.  Only the `text` kind exists today; new kinds
//! are new variants, and a peer that does not know a kind rejects the frame
//! with [`FrameError::Json`] instead of misreading it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame was not valid JSON or did not match any known kind.
    #[error("invalid frame JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A message the scanner sends to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundFrame {
    /// Scanned or typed text, forwarded verbatim.
    Text { text: String },
}

impl OutboundFrame {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundFrame::Text { text: text.into() }
    }
}

/// Serializes `frame` into the JSON text carried by one WebSocket text frame.
///
/// # Errors
///
/// Returns [`FrameError::Json`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use qrlink_core::protocol::{encode_frame, OutboundFrame};
///
/// let json = encode_frame(&OutboundFrame::text("hi")).unwrap();
/// assert_eq!(json, r#"{"type":"text","text":"hi"}"#);
/// ```
pub fn encode_frame(frame: &OutboundFrame) -> Result<String, FrameError> {
    Ok(serde_json::to_string(frame)?)
}

/// Parses the JSON text of one WebSocket text frame.
///
/// # Errors
///
/// Returns [`FrameError::Json`] for malformed JSON, a missing or unknown
/// `"type"`, or a missing `"text"` field.
pub fn decode_frame(json: &str) -> Result<OutboundFrame, FrameError> {
    Ok(serde_json::from_str(json)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
