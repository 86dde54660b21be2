//! # Market Configuration
//!
//! Settings are layered: built-in defaults, then an optional YAML file,
//! then `DORMDASH_*` environment variables. The CLI applies its own flags
//! on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding [`MarketConfig::data_dir`].
pub const ENV_DATA_DIR: &str = "DORMDASH_DATA_DIR";
/// Environment variable overriding [`MarketConfig::campus_email_domain`].
pub const ENV_EMAIL_DOMAIN: &str = "DORMDASH_EMAIL_DOMAIN";
/// Environment variable overriding [`MarketConfig::min_password_len`].
pub const ENV_MIN_PASSWORD_LEN: &str = "DORMDASH_MIN_PASSWORD_LEN";

/// Error loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for this schema.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// An environment override has an unusable value.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// The variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Marketplace settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    /// Directory the file-backed store lives in.
    pub data_dir: PathBuf,
    /// Domain every signup email must belong to.
    pub campus_email_domain: String,
    /// Minimum password length at signup.
    pub min_password_len: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".dormdash"),
            campus_email_domain: "utexas.edu".to_string(),
            min_password_len: 6,
        }
    }
}

impl MarketConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<Self>(yaml).map(Self::normalized)
    }

    /// Read a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply `DORMDASH_*` overrides read through `lookup`.
    ///
    /// Empty values are ignored.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(domain) = get(ENV_EMAIL_DOMAIN) {
            self.campus_email_domain = domain;
        }
        if let Some(raw) = get(ENV_MIN_PASSWORD_LEN) {
            self.min_password_len = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_MIN_PASSWORD_LEN,
                value: raw.clone(),
            })?;
        }
        Ok(self.normalized())
    }

    /// Campus domains compare as bare lower-case names: no padding, no `@`.
    fn normalized(mut self) -> Self {
        self.campus_email_domain = self
            .campus_email_domain
            .trim()
            .trim_start_matches('@')
            .to_lowercase();
        self
    }
}
