//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/mcp-dashboard/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/mcp-dashboard/` (~/.config/mcp-dashboard/)
//! - State/Logs: `$XDG_STATE_HOME/mcp-dashboard/` (~/.local/state/mcp-dashboard/)
//!
//! A few settings can also be overridden from the environment, see
//! [`Config::apply_env`].

use crate::error::{Error, Result};
use crate::types::LogSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding [`ServerConfig::port`]
pub const PORT_ENV: &str = "MCP_DASHBOARD_PORT";
/// Environment variable overriding [`WatchConfig::log_dir`]
pub const LOG_DIR_ENV: &str = "MCP_DASHBOARD_LOG_DIR";

const APP_DIR: &str = "mcp-dashboard";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Which log files to tail
    #[serde(default)]
    pub watch: WatchConfig,

    /// Live viewer session tuning
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Log files to tail
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct WatchConfig {
    /// Directory the MCP logging wrapper writes to (defaults to $HOME)
    pub log_dir: Option<PathBuf>,

    /// Explicit file list; relative entries are joined onto `log_dir`.
    /// Defaults to the three known MCP log files.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl WatchConfig {
    /// Directory holding the log files
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(home_dir)
    }

    /// Absolute paths of every file to tail
    pub fn paths(&self) -> Vec<PathBuf> {
        let dir = self.resolved_log_dir();
        if self.files.is_empty() {
            return LogSource::ALL
                .iter()
                .map(|source| dir.join(source.file_name()))
                .collect();
        }
        self.files.iter().map(|file| dir.join(file)).collect()
    }
}

/// Live viewer session tuning
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ViewerConfig {
    /// Messages a viewer may fall behind by before it is disconnected
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Seconds between keepalive pings
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds without any inbound frame before the viewer is considered dead
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_secs: u64,

    /// Seconds a single outbound write may take
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    /// Largest inbound message accepted from a viewer
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            ping_interval_secs: default_ping_interval(),
            pong_timeout_secs: default_pong_timeout(),
            write_timeout_secs: default_write_timeout(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl ViewerConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.pong_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::Config(
                "viewer.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.ping_interval_secs == 0 || self.ping_interval_secs >= self.pong_timeout_secs {
            return Err(Error::Config(
                "viewer.ping_interval_secs must be non-zero and shorter than viewer.pong_timeout_secs"
                    .to_string(),
            ));
        }
        if self.write_timeout_secs == 0 {
            return Err(Error::Config(
                "viewer.write_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_queue_capacity() -> usize {
    crate::broadcast::DEFAULT_QUEUE_CAPACITY
}

fn default_ping_interval() -> u64 {
    54
}

fn default_pong_timeout() -> u64 {
    60
}

fn default_write_timeout() -> u64 {
    10
}

fn default_max_message_bytes() -> usize {
    512
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,

    /// Mirror log output to stderr
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
            console: default_console(),
        }
    }
}

fn default_console() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path, then apply env overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Config::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Apply `MCP_DASHBOARD_PORT` and `MCP_DASHBOARD_LOG_DIR` when set.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {}={:?}: {}", PORT_ENV, port, e)))?;
        }
        if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
            self.watch.log_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.viewer.validate()
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/mcp-dashboard/config.toml` (~/.config/mcp-dashboard/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/mcp-dashboard/` (~/.local/state/mcp-dashboard/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }
}
