//! QR-Link peer: entry point.
//!
//! Accepts scanner connections and prints every received text on its own line
//! on stdout.  Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! qrlink-peer [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>   Interface to listen on [default: 0.0.0.0]
//!   --port <PORT>   Listener port [default: 8080]
//! ```
//!
//! | Variable            | Default   |
//! |---------------------|-----------|
//! | `QRLINK_PEER_BIND`  | `0.0.0.0` |
//! | `QRLINK_PEER_PORT`  | `8080`    |
//!
//! Show the scanner `ws://<this machine's LAN IP>:<port>` as a QR code to pair.

use std::net::{IpAddr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use qrlink_peer::domain::{PeerConfig, ReceivedText, DEFAULT_PEER_PORT};
use qrlink_peer::infrastructure::PeerServer;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// QR-Link peer.
#[derive(Debug, Parser)]
#[command(name = "qrlink-peer", about = "Receive text from a QR-Link scanner", version)]
struct Cli {
    /// IP address to bind to.  `127.0.0.1` accepts only local scanners.
    #[arg(long, default_value = "0.0.0.0", env = "QRLINK_PEER_BIND")]
    bind: String,

    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PEER_PORT, env = "QRLINK_PEER_PORT")]
    port: u16,
}

impl Cli {
    fn into_peer_config(self) -> anyhow::Result<PeerConfig> {
        let ip: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;
        Ok(PeerConfig { bind_addr: SocketAddr::new(ip, self.port) })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_peer_config()?;
    let server = PeerServer::bind(config.bind_addr).await?;
    info!("pair with ws://<this host>:{}", server.local_addr().port());

    // Ctrl+C clears the flag; the accept loop notices within one poll.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // Received text goes to stdout, one line per frame.
    let (tx, mut rx) = mpsc::channel::<ReceivedText>(64);
    let printer = tokio::spawn(async move {
        while let Some(received) = rx.recv().await {
            println!("{}", received.text);
        }
    });

    server.serve(running, tx).await;
    // Open sessions still hold senders; stop printing once the loop is done.
    printer.abort();
    info!("QR-Link peer stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
