//! Error types for remsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::RecordId;

/// Errors raised while building records and record sets.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Two records in one set share an identity.
    #[error("duplicate record identity '{0}'")]
    DuplicateIdentity(RecordId),

    /// The record object has no non-empty string `id` field.
    #[error("record has no string `id` field: {0}")]
    MissingIdentity(String),

    /// The value is not a JSON object.
    #[error("expected a JSON object for a record, got {0}")]
    NotAnObject(String),
}

/// Errors raised while loading or validating [`crate::SyncConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Batch size below 1.
    #[error("invalid batch size {0}: must be at least 1")]
    InvalidBatchSize(i64),

    /// `ENVIRONMENT` (or the config file) names an unknown environment.
    #[error("unknown environment '{0}'; expected: local, dev, stage, prod")]
    UnknownEnvironment(String),

    /// A value could not be parsed for the named key.
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    /// Server URL resolved to an empty string.
    #[error("server URL is empty; set SERVER or `server_url` in the config file")]
    MissingServerUrl,

    /// Reading the config file failed.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for [`crate::config::ConfigFile`].
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Failure of a single external call (fetch, write, review signal).
///
/// `status` is the HTTP status when the server answered, `None` when the
/// request never completed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    /// A failure with no HTTP response (connection refused, timeout, I/O).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// A non-success HTTP response.
    pub fn http(status: u16, body: impl AsRef<str>) -> Self {
        let body = body.as_ref().trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self {
            status: Some(status),
            message,
        }
    }
}
