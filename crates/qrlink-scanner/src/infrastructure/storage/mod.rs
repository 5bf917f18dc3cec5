//! Settings store implementations.
//!
//! - [`settings_file::TomlSettingsStore`] – the real store, one TOML file in
//!   the platform config directory.
//! - [`memory::MemorySettingsStore`] – in-memory map for tests and for runs
//!   that must not touch the disk.

pub mod memory;
pub mod settings_file;

pub use memory::MemorySettingsStore;
pub use settings_file::{default_settings_path, TomlSettingsStore};
