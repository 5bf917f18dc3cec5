//! Peer configuration and the values the server hands out.

use std::net::{Ipv4Addr, SocketAddr};

/// Port the peer listens on when none is given.
pub const DEFAULT_PEER_PORT: u16 = 8080;

/// Runtime configuration for the peer server.
///
/// ```rust
/// use qrlink_peer::domain::PeerConfig;
///
/// let cfg = PeerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8080);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// `0.0.0.0` so a phone on the same LAN can reach the peer.
    pub bind_addr: SocketAddr,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PEER_PORT)),
        }
    }
}

/// One text frame received from a scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedText {
    /// Remote address of the scanner session.
    pub peer: SocketAddr,
    pub text: String,
}
