//! TOML-backed [`SettingsStore`].
//!
//! All scanner settings live in one small file:
//! - Windows:  `%APPDATA%\QrLink\settings.toml`
//! - Linux:    `~/.config/qrlink/settings.toml` (or `$XDG_CONFIG_HOME`)
//! - macOS:    `~/Library/Application Support/QrLink/settings.toml`
//!
//! ```toml
//! last_server_address = "ws://192.168.1.5:8080"
//! scan_debounce_ms = "900"
//! ```
//!
//! Values are kept as strings, exactly as the session wrote them; parsing is
//! the job of [`crate::application::settings`].  A missing file is an empty
//! store.  So is a file that is not valid TOML: it is logged and overwritten
//! on the next write rather than blocking startup.
//!
//! # Concurrency
//!
//! Every `set`/`remove` is a read-modify-write of the whole file.  An async
//! mutex serialises them so two writes cannot interleave and lose an update.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use qrlink_core::SettingKey;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::settings::{SettingsError, SettingsStore};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// On-disk schema.  Absent keys are simply not written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_server_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scan_debounce_ms: Option<String>,
}

impl SettingsFile {
    fn slot(&mut self, key: SettingKey) -> &mut Option<String> {
        match key {
            SettingKey::LastServerAddress => &mut self.last_server_address,
            SettingKey::ScanDebounceMs => &mut self.scan_debounce_ms,
        }
    }
}

/// Settings store persisted as a TOML file.
pub struct TomlSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TomlSettingsStore {
    /// Creates a store backed by `path`.  The file is not touched until the
    /// first read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Creates a store at [`default_settings_path`].
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NoPlatformConfigDir`] if the platform config
    /// directory cannot be determined.
    pub fn at_default_path() -> Result<Self, SettingsError> {
        Ok(Self::new(default_settings_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<SettingsFile, SettingsError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match toml::from_str(&content) {
                Ok(file) => Ok(file),
                Err(e) => {
                    warn!("ignoring malformed settings file {}: {e}", self.path.display());
                    Ok(SettingsFile::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsFile::default()),
            Err(source) => Err(SettingsError::Io { path: self.path.clone(), source }),
        }
    }

    async fn save(&self, file: &SettingsFile) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|source| SettingsError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(file)?;
        tokio::fs::write(&self.path, content).await.map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("settings written to {}", self.path.display());
        Ok(())
    }

    async fn update(&self, key: SettingKey, value: Option<&str>) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let slot = file.slot(key);
        if slot.as_deref() == value {
            return Ok(());
        }
        *slot = value.map(str::to_string);
        self.save(&file).await
    }
}

#[async_trait]
impl SettingsStore for TomlSettingsStore {
    async fn get(&self, key: SettingKey) -> Result<Option<String>, SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        Ok(file.slot(key).take())
    }

    async fn set(&self, key: SettingKey, value: &str) -> Result<(), SettingsError> {
        self.update(key, Some(value)).await
    }

    async fn remove(&self, key: SettingKey) -> Result<(), SettingsError> {
        self.update(key, None).await
    }
}

/// Resolves the full path to the settings file.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    platform_config_dir()
        .map(|dir| dir.join(SETTINGS_FILE_NAME))
        .ok_or(SettingsError::NoPlatformConfigDir)
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("QrLink"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("qrlink"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("QrLink"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_store() -> (TomlSettingsStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("qrlink_test_{}", Uuid::new_v4()));
        let store = TomlSettingsStore::new(dir.join("nested").join(SETTINGS_FILE_NAME));
        (store, dir)
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let (store, _dir) = temp_store();

        assert_eq!(store.get(SettingKey::LastServerAddress).await.unwrap(), None);
        assert_eq!(store.get(SettingKey::ScanDebounceMs).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_creates_directory_and_persists_value() {
        // Arrange
        let (store, dir) = temp_store();

        // Act
        store.set(SettingKey::LastServerAddress, "ws://10.0.0.2:8080").await.unwrap();
        let reopened = TomlSettingsStore::new(store.path());

        // Assert
        assert_eq!(
            reopened.get(SettingKey::LastServerAddress).await.unwrap().as_deref(),
            Some("ws://10.0.0.2:8080")
        );
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_keys_are_stored_independently() {
        let (store, dir) = temp_store();

        store.set(SettingKey::ScanDebounceMs, "450").await.unwrap();
        store.set(SettingKey::LastServerAddress, "ws://h:1").await.unwrap();
        store.remove(SettingKey::LastServerAddress).await.unwrap();

        assert_eq!(store.get(SettingKey::LastServerAddress).await.unwrap(), None);
        assert_eq!(store.get(SettingKey::ScanDebounceMs).await.unwrap().as_deref(), Some("450"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_remove_absent_key_is_ok_and_writes_nothing() {
        let (store, _dir) = temp_store();

        store.remove(SettingKey::LastServerAddress).await.unwrap();

        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_file_uses_snake_case_key_names() {
        let (store, dir) = temp_store();

        store.set(SettingKey::ScanDebounceMs, "900").await.unwrap();
        let content = std::fs::read_to_string(store.path()).unwrap();

        assert!(content.contains(SettingKey::ScanDebounceMs.as_str()), "{content}");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_malformed_file_is_treated_as_empty_and_replaced() {
        // Arrange
        let (store, dir) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "this is = = not toml").unwrap();

        // Act
        let before = store.get(SettingKey::ScanDebounceMs).await.unwrap();
        store.set(SettingKey::ScanDebounceMs, "300").await.unwrap();

        // Assert
        assert_eq!(before, None);
        assert_eq!(store.get(SettingKey::ScanDebounceMs).await.unwrap().as_deref(), Some("300"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_default_settings_path_ends_with_file_name() {
        if let Ok(path) = default_settings_path() {
            assert!(path.ends_with(SETTINGS_FILE_NAME));
        }
    }
}
