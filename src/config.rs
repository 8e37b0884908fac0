//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::replay::{SequencerSettings, TieBreak, DEFAULT_TOP_K};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub charts: ChartsConfig,

    #[serde(default)]
    pub replay: ReplayConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Source file locations
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Athlete roster feeding the bar and Sankey charts
    #[serde(default = "default_athletes_path")]
    pub athletes_path: PathBuf,

    /// Medal list feeding the race replay
    #[serde(default = "default_medallists_path")]
    pub medallists_path: PathBuf,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_athletes_path() -> PathBuf {
    PathBuf::from("./data/athletes.csv")
}

fn default_medallists_path() -> PathBuf {
    PathBuf::from("./data/medallists.csv")
}

fn default_delimiter() -> char {
    ','
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            athletes_path: default_athletes_path(),
            medallists_path: default_medallists_path(),
            delimiter: default_delimiter(),
        }
    }
}

/// Static chart options
#[derive(Debug, Clone, Deserialize)]
pub struct ChartsConfig {
    /// Country drawn first in the bar chart
    #[serde(default = "default_pinned_country")]
    pub pinned_country: Option<String>,
}

fn default_pinned_country() -> Option<String> {
    Some("United States".to_string())
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            pinned_country: default_pinned_country(),
        }
    }
}

/// Race replay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub tie_break: TieBreak,

    /// Start a replay as soon as the service is up
    #[serde(default = "default_autostart")]
    pub autostart: bool,
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_autostart() -> bool {
    true
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            top_k: default_top_k(),
            tie_break: TieBreak::default(),
            autostart: default_autostart(),
        }
    }
}

impl ReplayConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn sequencer_settings(&self) -> SequencerSettings {
        SequencerSettings {
            top_k: self.top_k,
            tie_break: self.tie_break,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_max_connections() -> usize {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("medalboard").join("config.toml")),
            Some(PathBuf::from("./medalboard.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env().validated_or_default()
    }

    /// Fall back to the built-in defaults when overrides leave the config unusable
    pub fn validated_or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(e) => {
                tracing::warn!("Ignoring environment overrides: {}", e);
                Config::default()
            }
        }
    }

    /// Reject settings the replay cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replay.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "replay.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.replay.top_k == 0 {
            return Err(ConfigError::Invalid(
                "replay.top_k must be greater than zero".to_string(),
            ));
        }
        if !self.data.delimiter.is_ascii() {
            return Err(ConfigError::Invalid(
                "data.delimiter must be a single ASCII character".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Data overrides
        if let Ok(path) = std::env::var("MEDALBOARD_ATHLETES") {
            self.data.athletes_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("MEDALBOARD_MEDALLISTS") {
            self.data.medallists_path = PathBuf::from(path);
        }

        // Replay overrides
        if let Ok(interval) = std::env::var("MEDALBOARD_REPLAY_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.replay.interval_ms = ms;
            }
        }
        if let Ok(top_k) = std::env::var("MEDALBOARD_REPLAY_TOP_K") {
            if let Ok(k) = top_k.parse() {
                self.replay.top_k = k;
            }
        }
        if let Ok(tie_break) = std::env::var("MEDALBOARD_REPLAY_TIE_BREAK") {
            match tie_break.parse::<TieBreak>() {
                Ok(t) => self.replay.tie_break = t,
                Err(e) => tracing::warn!("Ignoring MEDALBOARD_REPLAY_TIE_BREAK: {}", e),
            }
        }

        // API overrides
        if let Ok(host) = std::env::var("MEDALBOARD_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = std::env::var("MEDALBOARD_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("MEDALBOARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("MEDALBOARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Medalboard Configuration
#
# Environment variables override these settings:
# - MEDALBOARD_ATHLETES
# - MEDALBOARD_MEDALLISTS
# - MEDALBOARD_REPLAY_INTERVAL_MS
# - MEDALBOARD_REPLAY_TOP_K
# - MEDALBOARD_REPLAY_TIE_BREAK
# - MEDALBOARD_API_HOST
# - MEDALBOARD_API_PORT
# - MEDALBOARD_LOG_LEVEL
# - MEDALBOARD_LOG_FORMAT

[data]
# Athlete roster (columns: country, disciplines)
athletes_path = "./data/athletes.csv"

# Medal list (columns: medal_date, country_long, discipline)
medallists_path = "./data/medallists.csv"

# Field delimiter
delimiter = ","

[charts]
# Country drawn first in the bar chart
pinned_country = "United States"

[replay]
# Time between replay ticks (ms)
interval_ms = 2000

# Countries shown per snapshot
top_k = 10

# Order of equal totals: first_seen or country_name
tie_break = "first_seen"

# Start the replay when the server starts
autostart = true

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins (empty allows any)
cors_origins = []

# Maximum concurrent WebSocket connections
max_connections = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.replay.interval_ms, 2000);
        assert_eq!(config.replay.top_k, 10);
        assert_eq!(config.replay.tie_break, TieBreak::FirstSeen);
        assert_eq!(config.charts.pinned_country.as_deref(), Some("United States"));
        assert_eq!(config.api.port, 8090);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[replay]
tie_break = "country_name"
"#,
        )
        .unwrap();

        assert_eq!(config.replay.tie_break, TieBreak::CountryName);
        assert_eq!(config.replay.cadence(), Duration::from_millis(2000));
        assert_eq!(config.data.medallists_path, PathBuf::from("./data/medallists.csv"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medalboard.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[replay]\ninterval_ms = 0").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_invalid_overrides_fall_back_to_defaults() {
        let mut config = Config::default();
        config.replay.top_k = 0;
        config.replay.interval_ms = 250;

        let config = config.validated_or_default();
        assert_eq!(config.replay.top_k, Config::default().replay.top_k);
        assert_eq!(config.replay.interval_ms, Config::default().replay.interval_ms);
        assert!(config.validate().is_ok());

        let mut valid = Config::default();
        valid.replay.interval_ms = 250;
        assert_eq!(valid.validated_or_default().replay.interval_ms, 250);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/medalboard.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_api_addr() {
        let api = ApiConfig::new("127.0.0.1", 9000);
        assert_eq!(api.addr(), "127.0.0.1:9000");
    }
}
