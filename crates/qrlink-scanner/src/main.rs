//! QR-Link scanner: headless entry point.
//!
//! Runs the session manager against a real WebSocket transport and feeds it
//! from stdin, one line per camera detection (see [`qrlink_scanner::driver`]
//! for the command syntax).  Useful for pairing with a peer from a terminal, or
//! for piping the output of an external QR decoder:
//!
//! ```text
//! zbarcam --raw | qrlink-scanner
//! ```
//!
//! # Usage
//!
//! ```text
//! qrlink-scanner [OPTIONS]
//!
//! Options:
//!   --settings-file <PATH>  Settings file [default: platform config dir]
//!   --ephemeral             Keep settings in memory only
//!   --connect <ADDR>        Connect to a ws:// address on startup
//! ```
//!
//! | Variable            | Description                          |
//! |---------------------|--------------------------------------|
//! | `QRLINK_SETTINGS`   | Same as `--settings-file`            |
//! | `RUST_LOG`          | Log filter (default `info`, stderr)  |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use qrlink_core::ServerAddress;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qrlink_scanner::application::{Session, SettingsStore};
use qrlink_scanner::driver::{self, Reply};
use qrlink_scanner::infrastructure::session_actor::spawn_session;
use qrlink_scanner::infrastructure::storage::{MemorySettingsStore, TomlSettingsStore};
use qrlink_scanner::infrastructure::transport::WsTransport;
use qrlink_scanner::infrastructure::ui_bridge::ScannerAppState;

const TRANSPORT_EVENT_CAPACITY: usize = 64;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// QR-Link scanner.
///
/// Reads scanned payloads from stdin and forwards them to the paired peer.
#[derive(Debug, Parser)]
#[command(
    name = "qrlink-scanner",
    about = "Forward scanned or typed text to a QR-Link peer over WebSocket",
    version
)]
struct Cli {
    /// Path of the settings file.
    ///
    /// Defaults to `settings.toml` in the platform config directory.
    #[arg(long, env = "QRLINK_SETTINGS", conflicts_with = "ephemeral")]
    settings_file: Option<PathBuf>,

    /// Do not read or write any settings file.
    #[arg(long)]
    ephemeral: bool,

    /// Connect to this address once started, as if entered by the user.
    #[arg(long, value_name = "ADDR")]
    connect: Option<String>,
}

impl Cli {
    /// Builds the settings store selected on the command line.
    ///
    /// # Errors
    ///
    /// Fails if no path was given and the platform config directory cannot be
    /// determined.
    fn settings_store(&self) -> anyhow::Result<Arc<dyn SettingsStore>> {
        if self.ephemeral {
            return Ok(Arc::new(MemorySettingsStore::new()));
        }
        let store = match &self.settings_file {
            Some(path) => TomlSettingsStore::new(path),
            None => TomlSettingsStore::at_default_path()
                .context("no settings path given and no platform config directory")?,
        };
        info!("settings file: {}", store.path().display());
        Ok(Arc::new(store))
    }

    /// Parses `--connect`, if present.
    fn connect_address(&self) -> anyhow::Result<Option<ServerAddress>> {
        self.connect
            .as_deref()
            .map(|raw| ServerAddress::parse(raw).with_context(|| format!("invalid --connect value '{raw}'")))
            .transpose()
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only driver replies.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = cli.settings_store()?;
    let initial_address = cli.connect_address()?;

    // Wire the transport's event channel into the session actor.
    let (event_tx, event_rx) = mpsc::channel(TRANSPORT_EVENT_CAPACITY);
    let transport = Arc::new(WsTransport::new(event_tx));
    let app_state = ScannerAppState::new();
    let session = Session::new(transport, store);
    let (handle, actor) = spawn_session(session, event_rx, Arc::clone(&app_state));

    info!("QR-Link scanner started");

    // `--connect` behaves like a manual connect entered by the user.
    if let Some(address) = initial_address {
        handle.connect(address).await?;
    }

    // One driver command per stdin line until EOF, `/quit` or Ctrl+C.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("failed to listen for Ctrl+C signal: {e}");
                }
                info!("received Ctrl+C, shutting down");
                None
            }
        };
        let Some(line) = line else { break };
        if line.is_empty() {
            continue;
        }

        let command = match driver::parse_line(&line) {
            Ok(command) => command,
            // Bad input is reported and the loop keeps going.
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        match driver::execute(command, &handle, &app_state).await? {
            Reply::Continue(message) => println!("{message}"),
            Reply::Quit => break,
        }
    }

    // Let the actor close the connection before the runtime goes away.
    handle.shutdown().await;
    actor.await.context("session actor panicked")?;
    info!("QR-Link scanner stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
