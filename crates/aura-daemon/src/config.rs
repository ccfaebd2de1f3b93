//! Daemon configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aura_core::AudioFunctionConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Audio function settings
    #[serde(default)]
    pub function: AudioFunctionConfig,
    /// Loopback harness settings
    #[serde(default)]
    pub harness: HarnessConfig,
}

/// Daemon-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Loopback harness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Service tick period in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Stop after this many ticks (runs until signalled if unset)
    #[serde(default)]
    pub ticks: Option<u64>,
    /// Bytes the host accepts per device write (unlimited if unset)
    #[serde(default)]
    pub write_budget: Option<usize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self { tick_ms: default_tick_ms(), ticks: None, write_budget: None }
    }
}

fn default_tick_ms() -> u64 {
    1
}

/// Load configuration from file or defaults.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Load configuration from `path`, falling back to defaults if it is missing.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;
        Ok(config)
    } else {
        info!(?path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("com", "aura", "Aura").context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::BitDepth;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = load_config_from(&dir.path().join("config.toml")).expect("Failed to load config");

        assert_eq!(config.daemon.log_level, "info");
        assert_eq!(config.function, AudioFunctionConfig::default());
        assert_eq!(config.harness.tick_ms, 1);
        assert_eq!(config.harness.ticks, None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[daemon]
log_level = "debug"

[function]
bit_depth = 12
buffer_samples = 48

[function.names]
register_collection = true

[harness]
ticks = 100
write_budget = 40
"#,
        )
        .expect("Failed to write config");

        let config = load_config_from(&path).expect("Failed to load config");

        assert_eq!(config.daemon.log_level, "debug");
        assert_eq!(config.function.bit_depth, BitDepth::Twelve);
        assert_eq!(config.function.buffer_samples, 48);
        assert_eq!(config.function.channels, 1);
        assert!(config.function.names.register_collection);
        assert_eq!(config.function.names.collection, "AURA MGP01");
        assert_eq!(config.harness.tick_ms, 1);
        assert_eq!(config.harness.ticks, Some(100));
        assert_eq!(config.harness.write_budget, Some(40));
    }

    #[test]
    fn test_invalid_bit_depth_fails() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[function]\nbit_depth = 24\n").expect("Failed to write config");

        assert!(load_config_from(&path).is_err());
    }
}
