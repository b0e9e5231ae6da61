//! Configuration types for the buildwatch daemon
//!
//! Two layers of configuration exist: the daemon's own settings (control
//! surface address, notification backend), loaded once at startup, and the
//! per-project settings (`.buildwatch.toml`) describing what to run when a
//! project changes.

use crate::error::{Error, Result};
use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-project configuration file name, looked up in the project root
pub const PROJECT_CONFIG_FILENAME: &str = ".buildwatch.toml";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7739
}

fn default_build_timeout() -> f64 {
    1.0
}

/// Which notification sink the daemon should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyBackend {
    /// Desktop notifications (notify-send / osascript)
    Desktop,
    /// Log-only notifications via tracing
    Log,
}

/// Daemon configuration
///
/// Loaded with layered precedence (lowest to highest):
/// 1. Hardcoded defaults
/// 2. Config file (`~/.config/buildwatch/config.toml` or `--config` path)
/// 3. Environment variables (`BUILDWATCH_*`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address the control surface binds to (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,
    /// Port the control surface binds to (default: 7739)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Notification backend (default: desktop)
    #[serde(default = "NotifyBackend::desktop")]
    pub notifications: NotifyBackend,
}

impl NotifyBackend {
    fn desktop() -> Self {
        NotifyBackend::Desktop
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            notifications: NotifyBackend::Desktop,
        }
    }
}

impl DaemonConfig {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `BUILDWATCH_`, e.g.
    /// `BUILDWATCH_PORT=9000`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut builder = ConfigLib::builder()
            .set_default("host", default_host())
            .map_err(|e| Error::config(format!("Failed to set host default: {e}")))?
            .set_default("port", default_port() as i64)
            .map_err(|e| Error::config(format!("Failed to set port default: {e}")))?
            .set_default("notifications", "desktop")
            .map_err(|e| Error::config(format!("Failed to set notifications default: {e}")))?;

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("BUILDWATCH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from the given file, or the global default path
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }

    /// The socket address string the control surface binds to
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for clients of the control surface
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Default location of the daemon config file
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| Error::config("Could not determine user config directory"))?;
    Ok(config_dir.join("buildwatch").join("config.toml"))
}

/// Per-project configuration
///
/// The `script` commands run sequentially in the project's working directory
/// once the directory has been quiet for `build_timeout` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Shell commands to run, in order; the first failure stops the build
    pub script: Vec<String>,
    /// Debounce delay in seconds (default: 1.0)
    #[serde(default = "default_build_timeout")]
    pub build_timeout: f64,
}

impl ProjectConfig {
    /// The debounce delay as a `Duration`
    ///
    /// Negative and non-finite values collapse to zero rather than panic.
    pub fn debounce_delay(&self) -> Duration {
        if self.build_timeout.is_finite() && self.build_timeout > 0.0 {
            Duration::from_secs_f64(self.build_timeout)
        } else {
            Duration::ZERO
        }
    }

    /// Reads the project config file from the given project root
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(PROJECT_CONFIG_FILENAME);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::config(format!(
                "Failed to read {}: {e}",
                path.display()
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }
}
