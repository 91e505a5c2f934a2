//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [forge]
//! api_base = "https://github.example.com/api/v3"
//!
//! [revert]
//! branch = "main"
//! verify_update = true
//!
//! [poll]
//! interval_ms = 500
//! timeout_secs = 120
//!
//! [cluster]
//! page_size = 250
//!
//! [secrets]
//! token_key = "token"
//! ```
//!
//! # Validation
//!
//! Config values are validated after parsing. Every field is optional;
//! accessors on [`super::Config`] apply the defaults.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::RefName;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Git host API settings
    pub forge: Option<ForgeConfig>,

    /// Revert behavior
    pub revert: Option<RevertConfig>,

    /// Condition polling defaults
    pub poll: Option<PollConfig>,

    /// Cluster listing settings
    pub cluster: Option<ClusterConfig>,

    /// Credential lookup settings
    pub secrets: Option<SecretsConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(forge) = &self.forge {
            forge.validate()?;
        }
        if let Some(revert) = &self.revert {
            revert.validate()?;
        }
        if let Some(poll) = &self.poll {
            poll.validate()?;
        }
        if let Some(cluster) = &self.cluster {
            if cluster.page_size == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "cluster.page_size must be greater than zero".into(),
                ));
            }
        }
        if let Some(secrets) = &self.secrets {
            if secrets.token_key.as_deref() == Some("") {
                return Err(ConfigError::InvalidValue(
                    "secrets.token_key cannot be empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Git host API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    /// API base URL (GitHub Enterprise installs use `https://host/api/v3`)
    pub api_base: Option<String>,

    /// User-Agent sent with API requests
    pub user_agent: Option<String>,
}

impl ForgeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.api_base {
            if !(base.starts_with("https://") || base.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "forge.api_base '{}' must be an http(s) URL",
                    base
                )));
            }
        }
        if self.user_agent.as_deref() == Some("") {
            return Err(ConfigError::InvalidValue(
                "forge.user_agent cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Revert behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RevertConfig {
    /// Branch to revert. When unset the first ref the host lists is used.
    pub branch: Option<String>,

    /// Re-read the ref after updating it and fail if it did not move
    pub verify_update: Option<bool>,
}

impl RevertConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.branch {
            RefName::for_branch(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid revert.branch: {}", e))
            })?;
        }
        Ok(())
    }
}

/// Condition polling defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PollConfig {
    /// Delay between predicate evaluations, in milliseconds
    pub interval_ms: Option<u64>,

    /// Total time budget, in seconds
    pub timeout_secs: Option<u64>,
}

impl PollConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "poll.interval_ms must be greater than zero".into(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "poll.timeout_secs must be greater than zero".into(),
            ));
        }
        if let (Some(interval), Some(timeout)) = (self.interval_ms, self.timeout_secs) {
            if interval > timeout.saturating_mul(1000) {
                return Err(ConfigError::InvalidValue(format!(
                    "poll.interval_ms ({}) exceeds poll.timeout_secs ({}s)",
                    interval, timeout
                )));
            }
        }
        Ok(())
    }
}

/// Cluster listing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    /// Objects requested per list page
    pub page_size: Option<u32>,
}

/// Credential lookup settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Key inside the referenced secret that holds the token
    pub token_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(FileConfig::default().validate().is_ok());
    }

    #[test]
    fn roundtrip() {
        let config = FileConfig {
            forge: Some(ForgeConfig {
                api_base: Some("https://github.example.com/api/v3".into()),
                user_agent: None,
            }),
            revert: Some(RevertConfig {
                branch: Some("main".into()),
                verify_update: Some(true),
            }),
            poll: Some(PollConfig {
                interval_ms: Some(250),
                timeout_secs: Some(30),
            }),
            cluster: Some(ClusterConfig {
                page_size: Some(100),
            }),
            secrets: Some(SecretsConfig {
                token_key: Some("token".into()),
            }),
        };

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: FileConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<FileConfig, _> = toml::from_str("[poll]\nretries = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        let config = FileConfig {
            poll: Some(PollConfig {
                interval_ms: Some(0),
                timeout_secs: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn interval_longer_than_timeout_rejected() {
        let config = FileConfig {
            poll: Some(PollConfig {
                interval_ms: Some(5_000),
                timeout_secs: Some(2),
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn non_http_api_base_rejected() {
        let config = FileConfig {
            forge: Some(ForgeConfig {
                api_base: Some("ftp://example.com".into()),
                user_agent: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_branch_rejected() {
        let config = FileConfig {
            revert: Some(RevertConfig {
                branch: Some("bad..branch".into()),
                verify_update: None,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_page_size_rejected() {
        let config = FileConfig {
            cluster: Some(ClusterConfig { page_size: Some(0) }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
