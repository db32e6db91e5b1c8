//! Configuration management
//!
//! Manages server binding, store location and external analyzer settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ANALYZER_TIMEOUT_SECS: u64 = 60;

/// Analyzer script, relative to the working directory
pub const DEFAULT_ANALYZER_SCRIPT: &str = "scripts/process_experience_nlp.py";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Record store and artifact locations
    #[serde(default)]
    pub storage: StorageConfig,
    /// External analyzer process
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Extra mount point for every route (the web UI calls `/api/...`)
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_prefix: default_api_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding every processed experience
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Directory for transient analyzer input/output files
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

fn default_store_path() -> PathBuf {
    default_data_dir().join("processed_experiences.json")
}

fn default_artifact_dir() -> PathBuf {
    default_data_dir().join("artifacts")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// When false every submission goes straight to the heuristic fallback
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interpreter or binary to execute
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// Extra arguments placed before the script
    #[serde(default)]
    pub args: Vec<String>,
    /// Analyzer script; checked for existence before every run. An empty
    /// path runs `program` directly.
    #[serde(default = "default_script")]
    pub script: Option<PathBuf>,
    /// Upper bound on one analyzer run (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_program() -> PathBuf {
    PathBuf::from("python3")
}

fn default_script() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_ANALYZER_SCRIPT))
}

fn default_timeout_secs() -> u64 {
    DEFAULT_ANALYZER_TIMEOUT_SECS
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_program(),
            args: Vec::new(),
            script: default_script(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if self.analyzer.timeout_secs == 0 {
            return Err(Error::Config(
                "analyzer.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.storage.store_path.as_os_str().is_empty() {
            return Err(Error::Config("storage.store_path must not be empty".to_string()));
        }
        if self.server.api_prefix.trim_matches('/').contains(char::is_whitespace) {
            return Err(Error::Config(
                "server.api_prefix must not contain whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = project_dirs().context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "interview-insights", "interview-insights")
}

/// Platform data directory, or `./data` when it cannot be determined
pub fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
