//! Settings port and the rules for reading persisted values back.
//!
//! The store only knows strings.  Turning them into domain values (and deciding
//! what to do with garbage) happens here, so every store implementation gets
//! the same behaviour: a value that cannot be read is treated as absent.

use std::path::PathBuf;

use async_trait::async_trait;
use qrlink_core::{ScanDebounceInterval, ServerAddress, SettingKey};
use thiserror::Error;
use tracing::warn;

/// Error type for settings storage operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Backend-specific failure (used by in-memory and test stores).
    #[error("settings backend unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value storage for the scanner's two persisted settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the stored value for `key`, or `None` if it was never set.
    async fn get(&self, key: SettingKey) -> Result<Option<String>, SettingsError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: SettingKey, value: &str) -> Result<(), SettingsError>;

    /// Deletes `key`.  Removing an absent key is not an error.
    async fn remove(&self, key: SettingKey) -> Result<(), SettingsError>;
}

/// Reads `key`, logging and swallowing any storage failure.
pub async fn read_or_absent(store: &dyn SettingsStore, key: SettingKey) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("could not read setting {key}: {e}");
            None
        }
    }
}

/// Loads the debounce interval, falling back to the default when the stored
/// value is absent, unreadable or not a non-negative integer.
pub async fn load_debounce_interval(store: &dyn SettingsStore) -> ScanDebounceInterval {
    let Some(raw) = read_or_absent(store, SettingKey::ScanDebounceMs).await else {
        return ScanDebounceInterval::DEFAULT;
    };
    ScanDebounceInterval::parse(&raw).unwrap_or_else(|| {
        warn!("ignoring invalid stored debounce interval {raw:?}");
        ScanDebounceInterval::DEFAULT
    })
}

/// Loads the last server address, if one is stored and still carries the
/// `ws://` scheme.
pub async fn load_last_address(store: &dyn SettingsStore) -> Option<ServerAddress> {
    let raw = read_or_absent(store, SettingKey::LastServerAddress).await?;
    match ServerAddress::parse(&raw) {
        Ok(address) => Some(address),
        Err(e) => {
            warn!("ignoring stored server address: {e}");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
