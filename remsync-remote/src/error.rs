//! Error types for remsync-remote.

use std::path::PathBuf;

use thiserror::Error;

use remsync_core::{RecordError, TransportError};

/// Failures talking to the server or reading the source checkout.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// No response (DNS, connection refused, timeout, TLS).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The response body was not the JSON we expected.
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// A sub-request of a batch was rejected.
    #[error("batch write rejected: {path} returned HTTP {status}: {body}")]
    BatchRejected {
        status: u16,
        path: String,
        body: String,
    },

    #[error("invalid record: {0}")]
    Record(#[from] RecordError),

    #[error("JSON encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GIT_TOKEN not set; refusing to clone {0}")]
    MissingGitToken(String),

    #[error("git clone of {repo} failed: {stderr}")]
    Git { repo: String, stderr: String },

    #[error("git clone of {repo} timed out after {secs}s")]
    GitTimeout { repo: String, secs: u64 },

    #[error("prompts directory not found at {0}")]
    PromptsDirNotFound(PathBuf),

    #[error("invalid prompt metadata {path}: {source}")]
    PromptJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("prompt metadata {path} has no string field `{field}`")]
    PromptField { path: PathBuf, field: &'static str },
}

impl RemoteError {
    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Http { status, .. } | RemoteError::BatchRejected { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<RemoteError> for TransportError {
    fn from(err: RemoteError) -> Self {
        TransportError {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RemoteError {
    RemoteError::Io {
        path: path.into(),
        source,
    }
}
