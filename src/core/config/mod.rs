//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first match wins:
//! 1. An explicit path (the CLI's `--config`)
//! 2. `$GITOPS_GUARD_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gitops-guard/config.toml`
//! 4. `~/.gitops-guard/config.toml`
//!
//! A missing file is not an error: defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use gitops_guard::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("API base: {}", config.api_base());
//! println!("Poll every {:?} for at most {:?}", config.poll_interval(), config.poll_timeout());
//! ```

pub mod schema;

pub use schema::{ClusterConfig, FileConfig, ForgeConfig, PollConfig, RevertConfig, SecretsConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default User-Agent for API requests.
pub const DEFAULT_USER_AGENT: &str = "gitops-guard";

/// Default key of the token inside a credential secret.
pub const DEFAULT_TOKEN_KEY: &str = "token";

/// Default list page size for cluster queries.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GITOPS_GUARD_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: FileConfig,
    /// Where the file was loaded from, if anywhere
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path or the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated. An explicit path that does not exist is a read error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::discover() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file = Self::parse(&contents).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Parse and validate config text.
    pub fn parse(contents: &str) -> Result<FileConfig, ConfigError> {
        let file: FileConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Find the first existing config file in the default locations.
    fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitops-guard/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".gitops-guard/config.toml"))
            .filter(|path| path.exists())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Git host API base URL.
    pub fn api_base(&self) -> &str {
        self.file
            .forge
            .as_ref()
            .and_then(|f| f.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE)
    }

    /// User-Agent for git host requests.
    pub fn user_agent(&self) -> &str {
        self.file
            .forge
            .as_ref()
            .and_then(|f| f.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Explicit branch to revert, if configured.
    pub fn revert_branch(&self) -> Option<&str> {
        self.file.revert.as_ref().and_then(|r| r.branch.as_deref())
    }

    /// Whether to read the ref back after a revert.
    ///
    /// Defaults to `false`.
    pub fn verify_update(&self) -> bool {
        self.file
            .revert
            .as_ref()
            .and_then(|r| r.verify_update)
            .unwrap_or(false)
    }

    /// Delay between poll ticks.
    pub fn poll_interval(&self) -> Duration {
        self.file
            .poll
            .as_ref()
            .and_then(|p| p.interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// Total time budget for a poll.
    pub fn poll_timeout(&self) -> Duration {
        self.file
            .poll
            .as_ref()
            .and_then(|p| p.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_TIMEOUT)
    }

    /// Cluster list page size.
    pub fn page_size(&self) -> u32 {
        self.file
            .cluster
            .as_ref()
            .and_then(|c| c.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Key of the token inside credential secrets.
    pub fn token_key(&self) -> &str {
        self.file
            .secrets
            .as_ref()
            .and_then(|s| s.token_key.as_deref())
            .unwrap_or(DEFAULT_TOKEN_KEY)
    }

    /// Path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.api_base(), DEFAULT_API_BASE);
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
        assert_eq!(config.revert_branch(), None);
        assert!(!config.verify_update());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.poll_timeout(), Duration::from_secs(60));
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.token_key(), "token");
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [forge]
            api_base = "https://github.example.com/api/v3"

            [revert]
            branch = "main"
            verify_update = true

            [poll]
            interval_ms = 250
            timeout_secs = 10
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.api_base(), "https://github.example.com/api/v3");
        assert_eq!(config.revert_branch(), Some("main"));
        assert!(config.verify_update());
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.poll_timeout(), Duration::from_secs(10));
        assert_eq!(config.loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn missing_explicit_path_is_read_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn parse_error_names_the_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[poll\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        match err {
            ConfigError::ParseError { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[cluster]\npage_size = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
