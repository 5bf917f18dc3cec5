//! Command bridge between the session and the presentation layer.
//!
//! The session decides *what* should be on screen; this module holds the
//! presentation-side state that a UI (or the headless driver) renders:
//!
//! - which [`Screen`] is visible,
//! - the camera controls (facing and torch), which never leave this layer,
//! - the manual text field,
//! - the latest [`SessionSnapshot`] published by the session actor.
//!
//! # DTOs and `CommandResult<T>`
//!
//! Commands return plain serializable DTOs wrapped in a uniform envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```
//!
//! # Async Mutex vs std Mutex
//!
//! [`ScannerAppState`] uses `tokio::sync::Mutex` because every command is an
//! `async fn` and may run concurrently with the actor publishing a snapshot.

use std::sync::Arc;

use qrlink_core::{CameraFacing, CameraSettings, Screen};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::{PresentationIntent, SessionSnapshot};

// ── Shared application state ──────────────────────────────────────────────────

/// Presentation state shared between the session actor and UI commands.
#[derive(Default)]
pub struct ScannerAppState {
    pub screen: Mutex<Screen>,
    pub camera: Mutex<CameraSettings>,
    /// Contents of the manual text field.
    pub text_input: Mutex<String>,
    /// Latest session snapshot; written only by the session actor.
    pub session: Mutex<SessionSnapshot>,
}

impl ScannerAppState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Applies one intent emitted by the session.
    pub async fn apply_intent(&self, intent: PresentationIntent) {
        debug!("applying {intent:?}");
        match intent {
            PresentationIntent::ShowScreen(screen) => *self.screen.lock().await = screen,
            PresentationIntent::ClearTextInput => self.text_input.lock().await.clear(),
        }
    }

    pub async fn publish(&self, snapshot: SessionSnapshot) {
        *self.session.lock().await = snapshot;
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// Everything the scan and settings screens need to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerStatusDto {
    /// `"Disconnected"`, `"Connecting"` or `"Connected"`.
    pub connection_state: String,
    pub server_address: Option<String>,
    pub screen: Screen,
    pub text_input: String,
}

/// Settings screen form values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerSettingsDto {
    pub scan_debounce_ms: u64,
    pub camera_facing: CameraFacing,
    pub torch: bool,
}

/// Unified response wrapper for scanner commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the current status snapshot.
pub async fn get_scanner_status(state: Arc<ScannerAppState>) -> CommandResult<ScannerStatusDto> {
    let session = state.session.lock().await.clone();
    let screen = *state.screen.lock().await;
    let text_input = state.text_input.lock().await.clone();

    CommandResult::ok(ScannerStatusDto {
        connection_state: session.state.as_str().to_string(),
        server_address: session.server_address.map(String::from),
        screen,
        text_input,
    })
}

/// Returns the values shown on the settings screen.
pub async fn get_scanner_settings(
    state: Arc<ScannerAppState>,
) -> CommandResult<ScannerSettingsDto> {
    let debounce = state.session.lock().await.debounce_interval;
    let camera = *state.camera.lock().await;

    CommandResult::ok(ScannerSettingsDto {
        scan_debounce_ms: debounce.as_millis(),
        camera_facing: camera.facing,
        torch: camera.torch,
    })
}

/// Switches between the back and front camera and returns the new facing.
pub async fn toggle_camera_facing(state: Arc<ScannerAppState>) -> CommandResult<CameraFacing> {
    let mut camera = state.camera.lock().await;
    camera.facing = camera.facing.flipped();
    CommandResult::ok(camera.facing)
}

/// Turns the torch on or off.
pub async fn set_torch(state: Arc<ScannerAppState>, on: bool) -> CommandResult<bool> {
    state.camera.lock().await.torch = on;
    CommandResult::ok(on)
}

/// Replaces the contents of the manual text field.
pub async fn set_text_input(state: Arc<ScannerAppState>, text: String) -> CommandResult<()> {
    *state.text_input.lock().await = text;
    CommandResult::ok(())
}

/// Navigates to `screen`.  The settings screen requires a live connection.
pub async fn show_screen(state: Arc<ScannerAppState>, screen: Screen) -> CommandResult<Screen> {
    if screen == Screen::Settings && !state.session.lock().await.state.is_connected() {
        return CommandResult::err("settings are only available while connected");
    }
    *state.screen.lock().await = screen;
    CommandResult::ok(screen)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use qrlink_core::{ConnectionState, ScanDebounceInterval, ServerAddress};

    fn connected_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            state: ConnectionState::Connected,
            server_address: Some(ServerAddress::parse("ws://10.0.0.3:8080").unwrap()),
            debounce_interval: ScanDebounceInterval::from_millis(500),
        }
    }

    #[tokio::test]
    async fn test_initial_status_is_disconnected_on_scan_screen() {
        // Arrange
        let state = ScannerAppState::new();

        // Act
        let result = get_scanner_status(state).await;

        // Assert
        assert!(result.success);
        let dto = result.data.unwrap();
        assert_eq!(dto.connection_state, "Disconnected");
        assert_eq!(dto.server_address, None);
        assert_eq!(dto.screen, Screen::Scan);
    }

    #[tokio::test]
    async fn test_status_reflects_published_snapshot() {
        let state = ScannerAppState::new();
        state.publish(connected_snapshot()).await;

        let dto = get_scanner_status(state).await.data.unwrap();

        assert_eq!(dto.connection_state, "Connected");
        assert_eq!(dto.server_address.as_deref(), Some("ws://10.0.0.3:8080"));
    }

    #[tokio::test]
    async fn test_apply_intents_switch_screen_and_clear_input() {
        // Arrange
        let state = ScannerAppState::new();
        set_text_input(state.clone(), "draft".to_string()).await;

        // Act
        state.apply_intent(PresentationIntent::ShowScreen(Screen::Settings)).await;
        state.apply_intent(PresentationIntent::ClearTextInput).await;

        // Assert
        assert_eq!(*state.screen.lock().await, Screen::Settings);
        assert!(state.text_input.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_camera_facing_flips_each_call() {
        let state = ScannerAppState::new();

        let first = toggle_camera_facing(state.clone()).await.data.unwrap();
        let second = toggle_camera_facing(state).await.data.unwrap();

        assert_eq!(first, CameraFacing::Front);
        assert_eq!(second, CameraFacing::Back);
    }

    #[tokio::test]
    async fn test_settings_report_torch_and_debounce() {
        let state = ScannerAppState::new();
        state.publish(connected_snapshot()).await;
        set_torch(state.clone(), true).await;

        let dto = get_scanner_settings(state).await.data.unwrap();

        assert_eq!(
            dto,
            ScannerSettingsDto {
                scan_debounce_ms: 500,
                camera_facing: CameraFacing::Back,
                torch: true,
            }
        );
    }

    #[tokio::test]
    async fn test_settings_screen_requires_connection() {
        let state = ScannerAppState::new();

        let result = show_screen(state.clone(), Screen::Settings).await;

        assert!(!result.success);
        assert!(result.error.is_some());
        assert_eq!(*state.screen.lock().await, Screen::Scan);
    }

    #[test]
    fn test_command_result_serializes_envelope() {
        let json = serde_json::to_value(CommandResult::<u8>::err("nope")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["data"], serde_json::Value::Null);
        assert_eq!(json["error"], "nope");
    }
}
