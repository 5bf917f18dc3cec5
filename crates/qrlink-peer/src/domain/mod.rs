pub mod config;

pub use config::{PeerConfig, ReceivedText, DEFAULT_PEER_PORT};
