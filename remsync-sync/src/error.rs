//! Error types for remsync-sync.

use thiserror::Error;

use remsync_core::{ConfigError, RecordError, RecordId, TransportError};

/// Fatal errors: the run stops and nothing has been written.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Batch size or another setting is unusable; raised before any fetch.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// A fetched record set contains the same identity twice.
    #[error("{side} records are malformed: {source}")]
    DuplicateIdentity {
        side: &'static str,
        #[source]
        source: RecordError,
    },

    /// The source of truth could not be read.
    #[error("source '{label}' unavailable: {source}")]
    SourceUnavailable {
        label: String,
        #[source]
        source: TransportError,
    },

    /// The destination collection could not be read.
    #[error("destination unavailable: {0}")]
    DestinationUnavailable(#[source] TransportError),
}

/// A failed batch write. Recorded in the report; later batches still run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("batch {index} ({first}..{last}) failed: {source}")]
pub struct BatchSubmissionError {
    pub index: usize,
    pub first: RecordId,
    pub last: RecordId,
    #[source]
    pub source: TransportError,
}

/// A failed review signal. Applied batches stay applied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReviewRequestError {
    #[error("review request failed: {0}")]
    Request(#[source] TransportError),

    #[error("self-approval failed: {0}")]
    Approve(#[source] TransportError),
}
