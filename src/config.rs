//! # Worker Configuration
//!
//! Configuration for connecting a worker to the federated learning coordinator.
//! Supports environment variables, config files, and command-line overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::constants::DEFAULT_POLLING_WAIT_SECS;
use crate::error::{WorkerError, WorkerResult};

/// Worker configuration for the coordinator connection and polling loop
///
/// # Examples
///
/// ```rust
/// use dcf_worker::config::WorkerConfig;
///
/// let config = WorkerConfig::default();
/// assert_eq!(config.server_url(), "http://localhost:8080");
/// assert!(config.private_key_file.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Coordinator connection settings
    pub server: ServerConfig,
    /// Private key used to authenticate; `None` runs unauthenticated.
    /// The public key is expected next to it with a `.pub` suffix.
    pub private_key_file: Option<PathBuf>,
    /// Seconds to wait between status polls
    pub polling_wait_secs: u64,
    /// Logging settings for binaries
    pub logging: LoggingConfig,
}

/// Coordinator endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `http` or `https`
    pub protocol: String,
    /// Host name or IP address of the coordinator
    pub host: String,
    /// Port the coordinator listens on
    pub port: u16,
    /// Request timeout in milliseconds; transport default when unset
    pub request_timeout_ms: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: Option<String>,
    /// Directory for JSON log files; console only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 8080,
            request_timeout_ms: None,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            private_key_file: None,
            polling_wait_secs: DEFAULT_POLLING_WAIT_SECS,
            logging: LoggingConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables and config file
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file (./dcf-worker.toml, ./config/dcf-worker.toml, user config dir)
    /// 3. Default values
    ///
    /// A discovered config file that cannot be read or parsed is an error.
    pub fn load() -> WorkerResult<Self> {
        Self::load_layered(Self::find_config_file().as_deref())
    }

    fn load_layered(config_path: Option<&Path>) -> WorkerResult<Self> {
        let mut config = match config_path {
            Some(path) => {
                debug!("Loading config from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;

        debug!("Loaded worker configuration: {:?}", config);
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> WorkerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkerError::config_error(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            WorkerError::config_error(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(config)
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut possible_paths = vec![
            PathBuf::from("./dcf-worker.toml"),
            PathBuf::from("./config/dcf-worker.toml"),
        ];
        if let Some(config_dir) = dirs::config_dir() {
            possible_paths.push(config_dir.join("dcf-worker").join("worker.toml"));
        }

        possible_paths
            .into_iter()
            .find(|path| path.exists() && path.is_file())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> WorkerResult<()> {
        if let Ok(protocol) = std::env::var("DCF_SERVER_PROTOCOL") {
            self.server.protocol = protocol;
        }
        if let Ok(host) = std::env::var("DCF_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DCF_SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| WorkerError::config_error(format!("Invalid DCF_SERVER_PORT: {e}")))?;
        }
        if let Ok(timeout) = std::env::var("DCF_REQUEST_TIMEOUT_MS") {
            self.server.request_timeout_ms = Some(timeout.parse().map_err(|e| {
                WorkerError::config_error(format!("Invalid DCF_REQUEST_TIMEOUT_MS: {e}"))
            })?);
        }
        if let Ok(key_file) = std::env::var("DCF_PRIVATE_KEY_FILE") {
            self.private_key_file = Some(PathBuf::from(key_file));
        }
        if let Ok(wait) = std::env::var("DCF_POLLING_WAIT_SECS") {
            self.polling_wait_secs = wait.parse().map_err(|e| {
                WorkerError::config_error(format!("Invalid DCF_POLLING_WAIT_SECS: {e}"))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> WorkerResult<()> {
        match self.server.protocol.as_str() {
            "http" | "https" => {}
            other => {
                return Err(WorkerError::config_error(format!(
                    "Unsupported server protocol '{other}', expected http or https"
                )))
            }
        }
        if self.server.host.trim().is_empty() {
            return Err(WorkerError::config_error("Server host must not be empty"));
        }
        Ok(())
    }

    /// Base address of the coordinator, `protocol://host:port`
    #[must_use]
    pub fn server_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.server.protocol, self.server.host, self.server.port
        )
    }

    /// True when traffic to a remote host would travel unencrypted
    #[must_use]
    pub fn is_insecure_remote(&self) -> bool {
        self.server.protocol == "http" && self.server.host != "localhost"
    }

    /// Wait period between status polls
    #[must_use]
    pub fn polling_wait_period(&self) -> Duration {
        Duration::from_secs(self.polling_wait_secs)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> WorkerResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                WorkerError::config_error(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| WorkerError::config_error(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            WorkerError::config_error(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }
}
