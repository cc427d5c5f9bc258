//! Layered sync configuration.
//!
//! # Resolution order (lowest first)
//!
//! 1. Built-in defaults
//! 2. YAML file (`~/.remsync/config.yaml` unless a path is given)
//! 3. Environment variables
//! 4. CLI flags (applied by the caller on the returned [`SyncConfig`])
//!
//! Every loader has an injectable form (`load_with`, `default_config_path_at`)
//! so tests never touch the real home directory or process environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BUCKET: &str = "main-workspace";
pub const DEFAULT_COLLECTION: &str = "ai-window-prompts";
pub const DEFAULT_SOURCE_REPO: &str =
    "https://github.com/Firefox-AI/ai-window-remote-settings-prompts.git";
pub const DEFAULT_SOURCE_BRANCH: &str = "main";
pub const DEFAULT_BATCH_SIZE: usize = 25;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REVIEW_MESSAGE: &str = "r?";

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Deployment environment of the destination server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Stage,
    Prod,
}

impl Environment {
    /// Server URL used when none is configured explicitly.
    pub fn default_server_url(self) -> &'static str {
        match self {
            Environment::Local => "http://localhost:8888/v1",
            Environment::Dev => "https://remote-settings-dev.allizom.org/v1",
            Environment::Stage => "https://remote-settings.allizom.org/v1",
            Environment::Prod => "https://remote-settings.mozilla.org/v1",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Local => write!(f, "local"),
            Environment::Dev => write!(f, "dev"),
            Environment::Stage => write!(f, "stage"),
            Environment::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "dev" => Ok(Environment::Dev),
            "stage" => Ok(Environment::Stage),
            "prod" => Ok(Environment::Prod),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Everything a sync run needs, resolved and validated.
///
/// `auth_token` and `git_token` are passed through opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub environment: Environment,
    pub server_url: String,
    pub auth_token: Option<String>,
    pub bucket_id: String,
    pub collection_id: String,
    pub batch_size: usize,
    pub git_token: Option<String>,
    pub source_repo: String,
    pub source_branch: String,
    pub dry_run: bool,
    pub request_timeout_secs: u64,
    /// Upper bound on the source `git clone`.
    pub clone_timeout_secs: u64,
    pub review_message: String,
    pub self_approve: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            environment,
            server_url: environment.default_server_url().to_string(),
            auth_token: None,
            bucket_id: DEFAULT_BUCKET.to_string(),
            collection_id: DEFAULT_COLLECTION.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            git_token: None,
            source_repo: DEFAULT_SOURCE_REPO.to_string(),
            source_branch: DEFAULT_SOURCE_BRANCH.to_string(),
            dry_run: false,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            clone_timeout_secs: DEFAULT_CLONE_TIMEOUT_SECS,
            review_message: DEFAULT_REVIEW_MESSAGE.to_string(),
            self_approve: false,
        }
    }
}

impl SyncConfig {
    /// Check invariants that CLI overrides may have broken.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(0));
        }
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::MissingServerUrl);
        }
        Ok(())
    }

    /// Lower `batch_size` to the server's per-request limit.
    ///
    /// Returns the previous size when it was lowered. A limit of 0 is ignored.
    pub fn cap_batch_size(&mut self, limit: usize) -> Option<usize> {
        if limit == 0 || self.batch_size <= limit {
            return None;
        }
        let previous = self.batch_size;
        self.batch_size = limit;
        Some(previous)
    }

    /// Server URL without a trailing slash.
    pub fn server_root(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

// ---------------------------------------------------------------------------
// Config file / environment layer
// ---------------------------------------------------------------------------

/// One optional-valued layer; the YAML file and the environment both
/// deserialize into this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub environment: Option<String>,
    pub server_url: Option<String>,
    pub auth_token: Option<String>,
    pub bucket_id: Option<String>,
    pub collection_id: Option<String>,
    pub batch_size: Option<i64>,
    pub git_token: Option<String>,
    pub source_repo: Option<String>,
    pub source_branch: Option<String>,
    pub dry_run: Option<bool>,
    pub request_timeout_secs: Option<u64>,
    pub clone_timeout_secs: Option<u64>,
    pub review_message: Option<String>,
    pub self_approve: Option<bool>,
}

impl ConfigFile {
    /// Values from `upper` win over values in `self`.
    fn overlay(self, upper: ConfigFile) -> ConfigFile {
        ConfigFile {
            environment: upper.environment.or(self.environment),
            server_url: upper.server_url.or(self.server_url),
            auth_token: upper.auth_token.or(self.auth_token),
            bucket_id: upper.bucket_id.or(self.bucket_id),
            collection_id: upper.collection_id.or(self.collection_id),
            batch_size: upper.batch_size.or(self.batch_size),
            git_token: upper.git_token.or(self.git_token),
            source_repo: upper.source_repo.or(self.source_repo),
            source_branch: upper.source_branch.or(self.source_branch),
            dry_run: upper.dry_run.or(self.dry_run),
            request_timeout_secs: upper.request_timeout_secs.or(self.request_timeout_secs),
            clone_timeout_secs: upper.clone_timeout_secs.or(self.clone_timeout_secs),
            review_message: upper.review_message.or(self.review_message),
            self_approve: upper.self_approve.or(self.self_approve),
        }
    }

    fn resolve(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let environment = match self.environment.as_deref() {
            Some(name) => name.parse()?,
            None => defaults.environment,
        };
        let batch_size = match self.batch_size {
            Some(n) if n < 1 => return Err(ConfigError::InvalidBatchSize(n)),
            Some(n) => usize::try_from(n).map_err(|_| ConfigError::InvalidValue {
                key: "batch_size".into(),
                value: n.to_string(),
            })?,
            None => defaults.batch_size,
        };

        let config = SyncConfig {
            environment,
            server_url: self
                .server_url
                .unwrap_or_else(|| environment.default_server_url().to_string()),
            auth_token: self.auth_token,
            bucket_id: self.bucket_id.unwrap_or(defaults.bucket_id),
            collection_id: self.collection_id.unwrap_or(defaults.collection_id),
            batch_size,
            git_token: self.git_token,
            source_repo: self.source_repo.unwrap_or(defaults.source_repo),
            source_branch: self.source_branch.unwrap_or(defaults.source_branch),
            dry_run: self.dry_run.unwrap_or(defaults.dry_run),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            clone_timeout_secs: self
                .clone_timeout_secs
                .unwrap_or(defaults.clone_timeout_secs),
            review_message: self.review_message.unwrap_or(defaults.review_message),
            self_approve: self
                .self_approve
                .unwrap_or(environment == Environment::Dev),
        };
        config.validate()?;
        Ok(config)
    }
}

/// `<home>/.remsync/config.yaml`. Pure, no I/O.
pub fn default_config_path_at(home: &Path) -> PathBuf {
    home.join(".remsync").join("config.yaml")
}

/// `default_config_path_at` for the current user's home directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    Ok(default_config_path_at(&home))
}

/// Read a YAML config file. A missing file yields an empty layer.
pub fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the environment-variable layer from a lookup function.
///
/// Empty values count as unset.
pub fn env_layer(lookup: impl Fn(&str) -> Option<String>) -> Result<ConfigFile, ConfigError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    Ok(ConfigFile {
        environment: get("ENVIRONMENT"),
        server_url: get("SERVER"),
        auth_token: get("AUTHORIZATION"),
        bucket_id: get("BUCKET"),
        collection_id: get("COLLECTION"),
        batch_size: get("BATCH_SIZE")
            .map(|v| parse_number("BATCH_SIZE", &v))
            .transpose()?,
        git_token: get("GIT_TOKEN"),
        source_repo: get("SOURCE_REPO"),
        source_branch: get("SOURCE_BRANCH"),
        dry_run: get("DRY_RUN").map(|v| is_truthy(&v)),
        request_timeout_secs: get("REQUEST_TIMEOUT_SECONDS")
            .map(|v| parse_number("REQUEST_TIMEOUT_SECONDS", &v))
            .transpose()?,
        clone_timeout_secs: get("CLONE_TIMEOUT_SECONDS")
            .map(|v| parse_number("CLONE_TIMEOUT_SECONDS", &v))
            .transpose()?,
        review_message: get("REVIEW_MESSAGE"),
        self_approve: get("SELF_APPROVE").map(|v| is_truthy(&v)),
    })
}

/// Resolve a config from an optional file path and an env lookup.
///
/// With `file == None` nothing is read from disk.
pub fn load_with(
    file: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SyncConfig, ConfigError> {
    let file_layer = match file {
        Some(path) => read_file(path)?,
        None => ConfigFile::default(),
    };
    file_layer.overlay(env_layer(lookup)?).resolve()
}

/// Resolve a config from `file` (or the default path) and the process environment.
pub fn load(file: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };
    load_with(Some(&path), |key| std::env::var(key).ok())
}

/// `1`, `y` and `Y` are true; anything else is false.
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "y" | "Y")
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let config = load_with(None, env(&[])).expect("config");
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.server_url, "http://localhost:8888/v1");
        assert!(!config.self_approve);
    }

    #[test]
    fn environment_picks_server_and_self_approval() {
        let config = load_with(None, env(&[("ENVIRONMENT", "DEV")])).expect("config");
        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(
            config.server_url,
            "https://remote-settings-dev.allizom.org/v1"
        );
        assert!(config.self_approve);

        let prod = load_with(None, env(&[("ENVIRONMENT", "prod")])).expect("config");
        assert!(!prod.self_approve);
    }

    #[test]
    fn explicit_server_beats_environment_default() {
        let config = load_with(
            None,
            env(&[("ENVIRONMENT", "stage"), ("SERVER", "http://kinto:8888/v1")]),
        )
        .expect("config");
        assert_eq!(config.server_url, "http://kinto:8888/v1");
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = load_with(None, env(&[("ENVIRONMENT", "qa")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEnvironment(ref e) if e == "qa"));
    }

    #[test]
    fn batch_size_must_be_positive() {
        let err = load_with(None, env(&[("BATCH_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBatchSize(0)));

        let err = load_with(None, env(&[("BATCH_SIZE", "-4")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBatchSize(-4)));

        let err = load_with(None, env(&[("BATCH_SIZE", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn empty_env_values_are_unset() {
        let config = load_with(None, env(&[("AUTHORIZATION", ""), ("GIT_TOKEN", "  ")]))
            .expect("config");
        assert!(config.auth_token.is_none());
        assert!(config.git_token.is_none());
    }

    #[test]
    fn dry_run_truthiness() {
        assert!(is_truthy("1"));
        assert!(is_truthy("y"));
        assert!(is_truthy("Y"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("yes"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn validate_catches_zeroed_batch_size() {
        let config = SyncConfig {
            batch_size: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBatchSize(0))
        ));
    }

    #[test]
    fn batch_size_is_capped_at_server_limit() {
        let mut config = SyncConfig {
            batch_size: 100,
            ..SyncConfig::default()
        };
        assert_eq!(config.cap_batch_size(25), Some(100));
        assert_eq!(config.batch_size, 25);

        assert_eq!(config.cap_batch_size(50), None);
        assert_eq!(config.cap_batch_size(0), None);
        assert_eq!(config.batch_size, 25);
    }

    #[test]
    fn clone_timeout_defaults_and_overrides() {
        let config = load_with(None, env(&[])).expect("config");
        assert_eq!(config.clone_timeout_secs, 60);

        let config = load_with(None, env(&[("CLONE_TIMEOUT_SECONDS", "5")])).expect("config");
        assert_eq!(config.clone_timeout_secs, 5);
    }

    #[test]
    fn server_root_trims_trailing_slash() {
        let config = SyncConfig {
            server_url: "http://localhost:8888/v1/".into(),
            ..SyncConfig::default()
        };
        assert_eq!(config.server_root(), "http://localhost:8888/v1");
    }
}
