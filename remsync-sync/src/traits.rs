//! Seams to the outside world.
//!
//! The engine never talks HTTP or git itself; the CLI wires in the
//! implementations from `remsync-remote`, tests wire in in-memory fakes.

use remsync_core::{Record, TransportError};

use crate::batch::Batch;

/// The source of truth.
pub trait RecordSource {
    /// Human-readable label used in logs and errors.
    fn label(&self) -> &str;

    /// Fetch the complete source record collection.
    fn fetch_records(&self) -> Result<Vec<Record>, TransportError>;
}

/// What the destination acknowledged for a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReceipt {
    /// Highest HTTP status among the batch's writes.
    pub status: u16,
}

/// The destination collection and its review workflow.
pub trait Destination {
    /// Fetch every record currently in the collection.
    ///
    /// A collection that does not exist yet yields an empty list.
    fn fetch_records(&self) -> Result<Vec<Record>, TransportError>;

    /// Write one batch. An `Err` means the batch as a whole is failed.
    fn submit_batch(&self, batch: &Batch) -> Result<BatchReceipt, TransportError>;

    /// Move the pending changeset to review.
    fn request_review(&self, message: &str) -> Result<(), TransportError>;

    /// Approve the pending changeset (only used where self-approval is allowed).
    fn approve_changes(&self) -> Result<(), TransportError>;
}
