//! Connection lifecycle state and the presentation-side selectors.
//!
//! # Connection lifecycle (for beginners)
//!
//! ```text
//!                 connect()            open event
//! Disconnected ─────────────► Connecting ─────────► Connected
//!      ▲                          │                     │
//!      └──────── close event / disconnect() ────────────┘
//! ```
//!
//! Only the session manager moves between these states.  `Screen`, camera
//! facing and torch are presentation choices; they live here so that the
//! scanner and any UI written against it agree on the same names.

use serde::{Deserialize, Serialize};

/// State of the single scanner → peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport handle is held.
    #[default]
    Disconnected,
    /// A handle exists and the transport has not reported `open` yet.
    Connecting,
    /// The transport reported `open`; text frames can be sent.
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }
}

/// Which screen the presentation layer should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Screen {
    /// Camera viewfinder.
    #[default]
    Scan,
    /// Connection details, debounce setting and the manual text field.
    Settings,
}

/// Which camera the scanner uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraFacing {
    #[default]
    Back,
    Front,
}

impl CameraFacing {
    /// Returns the opposite camera.
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        }
    }
}

/// Camera options exposed to the presentation layer.  Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CameraSettings {
    pub facing: CameraFacing,
    pub torch: bool,
}
