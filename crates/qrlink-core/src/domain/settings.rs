//! Names of the persisted settings.

use std::fmt;

/// The two values the scanner keeps across restarts.
///
/// Both are stored as strings: the address verbatim, the interval as a decimal
/// integer of milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    LastServerAddress,
    ScanDebounceMs,
}

impl SettingKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::LastServerAddress => "last_server_address",
            SettingKey::ScanDebounceMs => "scan_debounce_ms",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
