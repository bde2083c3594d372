//! Configuration file support for the nodeattach CLI.
//!
//! Configuration is stored at `~/.config/nodeattach/config.toml` (XDG standard)
//! or `~/Library/Application Support/com.nodeattach.nodeattach/config.toml` on
//! macOS. `NODEATTACH_CONFIG_DIR` overrides the directory.
//!
//! # Example configuration
//!
//! ```toml
//! [defaults]
//! verbosity = 1
//!
//! [attach]
//! method = "lns"
//! dir-relative-paths = true
//! id-dir = "attachments"
//! sync-delete-empty-dir = "never"
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use nodeattach_core::AttachConfig;
use serde::Deserialize;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "NODEATTACH_CONFIG_DIR";

/// Main configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Default settings applied to all commands
    #[serde(default)]
    pub defaults: Defaults,

    /// Options passed to the attachment core
    #[serde(default)]
    pub attach: AttachConfig,
}

/// Default settings
#[derive(Debug, Default, Deserialize)]
pub struct Defaults {
    /// Default verbosity level (0-3)
    pub verbosity: Option<u8>,
}

impl Config {
    /// Load configuration from the default path, or return defaults if not found.
    pub fn load() -> Result<Self> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.attach.validate()?;
        Ok(config)
    }
}

/// Get the path to the configuration file.
///
/// Uses XDG config directory on Linux, Application Support on macOS.
pub fn config_path() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir).join("config.toml"));
    }

    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

    #[cfg(target_os = "macos")]
    {
        let config_dir = base_dirs
            .home_dir()
            .join("Library/Application Support/com.nodeattach.nodeattach");
        Ok(config_dir.join("config.toml"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        let config_dir = base_dirs.config_dir().join("nodeattach");
        Ok(config_dir.join("config.toml"))
    }
}
