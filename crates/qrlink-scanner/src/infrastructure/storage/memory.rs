//! In-memory [`SettingsStore`].
//!
//! Used by tests and by the `--ephemeral` scanner mode, where nothing should
//! survive the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use qrlink_core::SettingKey;

use crate::application::settings::{SettingsError, SettingsStore};

#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<SettingKey, String>>,
    writes: AtomicUsize,
    should_fail: AtomicBool,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `values`.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (SettingKey, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.values.lock().unwrap_or_else(|e| e.into_inner());
            for (key, value) in values {
                map.insert(key, value.to_string());
            }
        }
        store
    }

    /// Creates a store whose every operation fails.
    pub fn failing() -> Self {
        let store = Self::new();
        store.should_fail.store(true, Ordering::SeqCst);
        store
    }

    /// Synchronous peek at a stored value.
    pub fn value(&self, key: SettingKey) -> Option<String> {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).get(&key).cloned()
    }

    /// Number of successful `set`/`remove` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SettingsError> {
        if self.should_fail.load(Ordering::SeqCst) {
            Err(SettingsError::Unavailable("memory store set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: SettingKey) -> Result<Option<String>, SettingsError> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: SettingKey, value: &str) -> Result<(), SettingsError> {
        self.check()?;
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: SettingKey) -> Result<(), SettingsError> {
        self.check()?;
        self.values.lock().unwrap_or_else(|e| e.into_inner()).remove(&key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
