//! Line-oriented driver for running the scanner without a camera or GUI.
//!
//! Each line read from stdin is either a scanned payload or a slash command:
//!
//! | Input                  | Meaning                                          |
//! |------------------------|--------------------------------------------------|
//! | `anything else`        | a camera detection of exactly that string        |
//! | `//text`               | a detection of `/text` (escape for a leading `/`) |
//! | `/connect ws://h:p`    | manual connect                                   |
//! | `/disconnect`          | disconnect and forget the saved address          |
//! | `/type <text>`         | replace the manual text field                    |
//! | `/send [text]`         | send `text`, or the text field if omitted        |
//! | `/debounce <ms>`       | set the scan debounce interval                   |
//! | `/screen scan\|settings` | navigate                                       |
//! | `/camera`              | toggle front/back camera                         |
//! | `/torch on\|off`        | torch control                                    |
//! | `/status`              | print the status and settings                    |
//! | `/help`, `/quit`       |                                                  |
//!
//! [`parse_line`] is pure so the grammar can be tested without a runtime.
//! [`execute`] applies a parsed command through the [`SessionHandle`] and the
//! presentation commands, and returns the line to print.

use std::sync::Arc;

use qrlink_core::{AddressError, Screen, ServerAddress};
use thiserror::Error;

use crate::application::{ConnectOutcome, ScanAction};
use crate::infrastructure::session_actor::{SessionHandle, SessionStopped};
use crate::infrastructure::ui_bridge::{self, ScannerAppState};

/// Errors from [`parse_line`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("unknown command /{0} (try /help)")]
    UnknownCommand(String),

    #[error("/{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("/{command}: invalid value {value:?}")]
    InvalidArgument { command: &'static str, value: String },

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCommand {
    Scan(String),
    Connect(ServerAddress),
    Disconnect,
    Type(String),
    /// `None` sends the current text field.
    Send(Option<String>),
    Debounce(String),
    Screen(Screen),
    ToggleCamera,
    Torch(bool),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
lines are scanned as-is; commands:
  /connect ws://host:port   /disconnect
  /type <text>              /send [text]
  /debounce <ms>            /screen scan|settings
  /camera                   /torch on|off
  /status   /help   /quit   (start a scan with // to send a leading /)";

/// Parses one line of driver input.  The trailing newline must already be
/// stripped; all other whitespace in a scan is preserved.
pub fn parse_line(line: &str) -> Result<DriverCommand, CommandParseError> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(DriverCommand::Scan(line.to_string()));
    };
    if rest.starts_with('/') {
        return Ok(DriverCommand::Scan(rest.to_string()));
    }

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "connect" => {
            if arg.is_empty() {
                return Err(CommandParseError::MissingArgument {
                    command: "connect",
                    argument: "a ws:// address",
                });
            }
            Ok(DriverCommand::Connect(ServerAddress::parse(arg)?))
        }
        "disconnect" => Ok(DriverCommand::Disconnect),
        "type" => Ok(DriverCommand::Type(arg.to_string())),
        "send" if arg.is_empty() => Ok(DriverCommand::Send(None)),
        "send" => Ok(DriverCommand::Send(Some(arg.to_string()))),
        "debounce" if arg.is_empty() => Err(CommandParseError::MissingArgument {
            command: "debounce",
            argument: "a value in milliseconds",
        }),
        "debounce" => Ok(DriverCommand::Debounce(arg.to_string())),
        "screen" => match arg {
            "scan" => Ok(DriverCommand::Screen(Screen::Scan)),
            "settings" => Ok(DriverCommand::Screen(Screen::Settings)),
            "" => Err(CommandParseError::MissingArgument {
                command: "screen",
                argument: "scan or settings",
            }),
            other => Err(CommandParseError::InvalidArgument {
                command: "screen",
                value: other.to_string(),
            }),
        },
        "camera" => Ok(DriverCommand::ToggleCamera),
        "torch" => match arg {
            "on" => Ok(DriverCommand::Torch(true)),
            "off" => Ok(DriverCommand::Torch(false)),
            "" => Err(CommandParseError::MissingArgument {
                command: "torch",
                argument: "on or off",
            }),
            other => Err(CommandParseError::InvalidArgument {
                command: "torch",
                value: other.to_string(),
            }),
        },
        "status" => Ok(DriverCommand::Status),
        "help" => Ok(DriverCommand::Help),
        "quit" | "exit" => Ok(DriverCommand::Quit),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

/// What the driver loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print the message and keep reading.
    Continue(String),
    Quit,
}

/// Runs one command against the session and the presentation state.
///
/// # Errors
///
/// Returns [`SessionStopped`] if the session actor is no longer running.
pub async fn execute(
    command: DriverCommand,
    session: &SessionHandle,
    state: &Arc<ScannerAppState>,
) -> Result<Reply, SessionStopped> {
    let message = match command {
        DriverCommand::Scan(payload) => match session.raw_scan(payload).await? {
            None => "scan ignored (debounce)".to_string(),
            Some(ScanAction::Connect(address)) => format!("scanned address {address}"),
            Some(ScanAction::Forward) => "scan forwarded".to_string(),
            Some(ScanAction::Discard) => "not connected, scan discarded".to_string(),
        },
        DriverCommand::Connect(address) => match session.connect(address.clone()).await? {
            ConnectOutcome::AlreadyActive(_) => format!("already using {address}"),
            ConnectOutcome::Started(_) | ConnectOutcome::Replaced { .. } => {
                format!("connecting to {address}")
            }
        },
        DriverCommand::Disconnect => {
            if session.disconnect().await? {
                "disconnected".to_string()
            } else {
                "not connected".to_string()
            }
        }
        DriverCommand::Type(text) => {
            ui_bridge::set_text_input(Arc::clone(state), text).await;
            "text field updated".to_string()
        }
        DriverCommand::Send(text) => {
            // An explicit argument leaves any draft in the text field alone.
            let sent = match text {
                Some(text) => session.send_message(text).await?,
                None => {
                    let draft = state.text_input.lock().await.clone();
                    session.send_text(draft).await?
                }
            };
            if sent {
                "sent".to_string()
            } else {
                "not sent (empty message or not connected)".to_string()
            }
        }
        DriverCommand::Debounce(raw) => match session.set_debounce_interval(raw.as_str()).await? {
            Some(interval) => format!("debounce interval {interval}ms"),
            None => format!(
                "invalid interval {raw:?}, keeping {}ms",
                session.snapshot().debounce_interval
            ),
        },
        DriverCommand::Screen(screen) => {
            let result = ui_bridge::show_screen(Arc::clone(state), screen).await;
            match result.error {
                Some(error) => error,
                None => format!("screen: {screen:?}"),
            }
        }
        DriverCommand::ToggleCamera => {
            let facing = ui_bridge::toggle_camera_facing(Arc::clone(state))
                .await
                .data
                .unwrap_or_default();
            format!("camera: {facing:?}")
        }
        DriverCommand::Torch(on) => {
            ui_bridge::set_torch(Arc::clone(state), on).await;
            format!("torch {}", if on { "on" } else { "off" })
        }
        DriverCommand::Status => status_line(state).await,
        DriverCommand::Help => HELP.to_string(),
        DriverCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Continue(message))
}

async fn status_line(state: &Arc<ScannerAppState>) -> String {
    let status = ui_bridge::get_scanner_status(Arc::clone(state)).await.data;
    let settings = ui_bridge::get_scanner_settings(Arc::clone(state)).await.data;
    match (status, settings) {
        (Some(status), Some(settings)) => format!(
            "{} {} | screen {:?} | debounce {}ms | camera {:?} torch {} | text {:?}",
            status.connection_state,
            status.server_address.as_deref().unwrap_or("-"),
            status.screen,
            settings.scan_debounce_ms,
            settings.camera_facing,
            if settings.torch { "on" } else { "off" },
            status.text_input,
        ),
        _ => "status unavailable".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_scan_verbatim() {
        assert_eq!(
            parse_line("  hello world "),
            Ok(DriverCommand::Scan("  hello world ".to_string()))
        );
    }

    #[test]
    fn test_scanned_address_is_still_a_scan() {
        // Connecting by scan goes through the debouncer and the router.
        assert_eq!(
            parse_line("ws://10.0.0.1:8080"),
            Ok(DriverCommand::Scan("ws://10.0.0.1:8080".to_string()))
        );
    }

    #[test]
    fn test_double_slash_escapes_scan() {
        assert_eq!(parse_line("//status"), Ok(DriverCommand::Scan("/status".to_string())));
    }

    #[test]
    fn test_connect_parses_address() {
        assert_eq!(
            parse_line("/connect ws://192.168.1.5:8080"),
            Ok(DriverCommand::Connect(ServerAddress::parse("ws://192.168.1.5:8080").unwrap()))
        );
    }

    #[test]
    fn test_connect_rejects_non_ws_address() {
        assert!(matches!(
            parse_line("/connect http://example.com"),
            Err(CommandParseError::Address(_))
        ));
        assert!(matches!(
            parse_line("/connect"),
            Err(CommandParseError::MissingArgument { command: "connect", .. })
        ));
    }

    #[test]
    fn test_send_with_and_without_text() {
        assert_eq!(parse_line("/send"), Ok(DriverCommand::Send(None)));
        assert_eq!(
            parse_line("/send  hi there "),
            Ok(DriverCommand::Send(Some("hi there".to_string())))
        );
    }

    #[test]
    fn test_debounce_passes_raw_value_through() {
        // Validation belongs to the session so invalid input keeps the old value.
        assert_eq!(parse_line("/debounce abc"), Ok(DriverCommand::Debounce("abc".to_string())));
        assert!(parse_line("/debounce").is_err());
    }

    #[test]
    fn test_torch_and_screen_arguments() {
        assert_eq!(parse_line("/torch on"), Ok(DriverCommand::Torch(true)));
        assert_eq!(parse_line("/torch off"), Ok(DriverCommand::Torch(false)));
        assert_eq!(parse_line("/screen settings"), Ok(DriverCommand::Screen(Screen::Settings)));
        assert!(matches!(
            parse_line("/torch maybe"),
            Err(CommandParseError::InvalidArgument { command: "torch", .. })
        ));
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        assert_eq!(
            parse_line("/frobnicate now"),
            Err(CommandParseError::UnknownCommand("frobnicate".to_string()))
        );
    }

    // ── execute ───────────────────────────────────────────────────────────────

    mod execute {
        use super::super::*;
        use crate::application::{Session, TransportEvent};
        use crate::infrastructure::session_actor::spawn_session;
        use crate::infrastructure::storage::memory::MemorySettingsStore;
        use crate::infrastructure::transport::mock::RecordingTransport;
        use qrlink_core::ConnectionState;
        use tokio::sync::mpsc;

        async fn run(
            line: &str,
            session: &SessionHandle,
            state: &Arc<ScannerAppState>,
        ) -> Reply {
            execute(parse_line(line).unwrap(), session, state).await.unwrap()
        }

        #[tokio::test]
        async fn test_typed_text_is_sent_from_text_field_and_cleared() {
            // Arrange
            let transport = Arc::new(RecordingTransport::new());
            let (event_tx, event_rx) = mpsc::channel(8);
            let state = ScannerAppState::new();
            let session = Session::new(transport.clone(), Arc::new(MemorySettingsStore::new()));
            let (handle, _join) = spawn_session(session, event_rx, state.clone());

            run("/connect ws://127.0.0.1:9", &handle, &state).await;
            let mut snapshots = handle.subscribe();
            let id = transport.opened()[0].0;
            event_tx.send(TransportEvent::Opened { id }).await.unwrap();
            snapshots.wait_for(|s| s.state == ConnectionState::Connected).await.unwrap();

            // Act
            run("/type  hello peer ", &handle, &state).await;
            let reply = run("/send", &handle, &state).await;

            // Assert
            assert_eq!(reply, Reply::Continue("sent".to_string()));
            assert_eq!(
                transport.sent_frames(),
                vec![r#"{"type":"text","text":"hello peer"}"#.to_string()]
            );
            assert!(state.text_input.lock().await.is_empty());
        }

        #[tokio::test]
        async fn test_send_with_argument_keeps_typed_draft() {
            // Arrange
            let transport = Arc::new(RecordingTransport::new());
            let (event_tx, event_rx) = mpsc::channel(8);
            let state = ScannerAppState::new();
            let session = Session::new(transport.clone(), Arc::new(MemorySettingsStore::new()));
            let (handle, _join) = spawn_session(session, event_rx, state.clone());

            run("/connect ws://127.0.0.1:9", &handle, &state).await;
            let mut snapshots = handle.subscribe();
            let id = transport.opened()[0].0;
            event_tx.send(TransportEvent::Opened { id }).await.unwrap();
            snapshots.wait_for(|s| s.state == ConnectionState::Connected).await.unwrap();
            run("/type unfinished draft", &handle, &state).await;

            // Act
            let reply = run("/send quick note", &handle, &state).await;

            // Assert
            assert_eq!(reply, Reply::Continue("sent".to_string()));
            assert_eq!(
                transport.sent_frames(),
                vec![r#"{"type":"text","text":"quick note"}"#.to_string()]
            );
            assert_eq!(*state.text_input.lock().await, "unfinished draft");
        }

        #[tokio::test]
        async fn test_quit_and_camera_commands() {
            let (_event_tx, event_rx) = mpsc::channel(8);
            let state = ScannerAppState::new();
            let session = Session::new(
                Arc::new(RecordingTransport::new()),
                Arc::new(MemorySettingsStore::new()),
            );
            let (handle, _join) = spawn_session(session, event_rx, state.clone());

            assert_eq!(
                run("/camera", &handle, &state).await,
                Reply::Continue("camera: Front".to_string())
            );
            assert_eq!(run("/quit", &handle, &state).await, Reply::Quit);
        }
    }
}
