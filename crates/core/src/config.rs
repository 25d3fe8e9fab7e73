//! Configuration for the simulator.
//!
//! Defaulted inline, layered under an optional TOML/JSON file, layered under
//! CLI flags. The shape mirrors the teacher's `Config`/`GeneralConfig`/
//! `SystemConfig` split, narrowed to what this architecture's fixed MMIO
//! layout and single-core loop actually need: RAM size, the storage device's
//! backing file, and trace verbosity.
//!
//! # Examples
//!
//! ```
//! use rvsim_core::config::Config;
//!
//! let json = r#"{ "system": { "ram_bytes": 1048576 } }"#;
//! let config: Config = serde_json::from_str(json).unwrap();
//! assert_eq!(config.system.ram_bytes, 1_048_576);
//! assert_eq!(config.general.trace, false);
//! ```

use serde::Deserialize;

use crate::common::error::HostError;

/// Default configuration constants.
mod defaults {
    /// Default RAM size (16 MiB). Large enough for a real guest program
    /// plus its stack; small enough to allocate instantly.
    pub const RAM_BYTES: u32 = 16 * 1024 * 1024;

    /// Default backing file for the block storage device.
    pub const STORAGE_PATH: &str = "storage.img";
}

/// Root configuration type; use [`Config::default`] or deserialize from
/// TOML/JSON via `--config`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// General simulation settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// RAM size and storage backing file.
    #[serde(default)]
    pub system: SystemConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            system: SystemConfig::default(),
        }
    }
}

impl Config {
    /// Loads a config file, dispatching on its extension (`.toml` or
    /// anything else treated as JSON).
    ///
    /// # Errors
    ///
    /// `HostError::Config` if the file can't be read or doesn't parse.
    pub fn load(path: &str) -> Result<Self, HostError> {
        let contents = std::fs::read_to_string(path).map_err(|source| HostError::Config {
            path: path.to_string(),
            source: Box::new(source),
        })?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|source| HostError::Config {
                path: path.to_string(),
                source: Box::new(source),
            })
        } else {
            serde_json::from_str(&contents).map_err(|source| HostError::Config {
                path: path.to_string(),
                source: Box::new(source),
            })
        }
    }
}

/// General simulation settings: tracing and nothing else, for now — there is
/// no pipeline or privilege-mode selection to configure in a single-issue,
/// fixed-ISA machine.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Print each retired instruction's address and mnemonic.
    #[serde(default)]
    pub trace: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { trace: false }
    }
}

/// RAM size and the block storage device's backing file.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Bytes of RAM starting at physical address 0.
    #[serde(default = "SystemConfig::default_ram_bytes")]
    pub ram_bytes: u32,
    /// Path to the block storage device's backing file, created if absent.
    #[serde(default = "SystemConfig::default_storage_path")]
    pub storage_path: String,
}

impl SystemConfig {
    fn default_ram_bytes() -> u32 {
        defaults::RAM_BYTES
    }

    fn default_storage_path() -> String {
        defaults::STORAGE_PATH.to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ram_bytes: Self::default_ram_bytes(),
            storage_path: Self::default_storage_path(),
        }
    }
}
