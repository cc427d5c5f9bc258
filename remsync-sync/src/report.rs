//! Outcome of a sync run: per-batch results plus the review step.
//!
//! Partial failure is data, not control flow: a failed batch becomes a
//! [`BatchOutcome`] with an error, and the run carries on.

use chrono::{DateTime, Utc};
use serde::Serialize;

use remsync_core::RecordId;

use crate::batch::Batch;
use crate::error::{BatchSubmissionError, ReviewRequestError};
use crate::pipeline::SyncState;
use crate::reconcile::PlanSummary;
use crate::traits::BatchReceipt;

/// Coarse HTTP-style classification of a batch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// 1xx–3xx.
    Success,
    /// 4xx.
    ClientError,
    /// 5xx (and anything else unexpected).
    ServerError,
    /// No response at all.
    Transport,
    /// Dry run: computed, never submitted.
    Planned,
}

impl StatusClass {
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            None => StatusClass::Transport,
            Some(s) if s < 400 => StatusClass::Success,
            Some(s) if s < 500 => StatusClass::ClientError,
            Some(_) => StatusClass::ServerError,
        }
    }
}

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub index: usize,
    pub first_id: RecordId,
    pub last_id: RecordId,
    pub size: usize,
    pub status: StatusClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn applied(batch: &Batch, receipt: BatchReceipt) -> Self {
        Self::new(batch, StatusClass::from_status(Some(receipt.status)), Some(receipt.status), None)
    }

    pub fn failed(batch: &Batch, err: &BatchSubmissionError) -> Self {
        Self::new(
            batch,
            StatusClass::from_status(err.source.status),
            err.source.status,
            Some(err.to_string()),
        )
    }

    pub fn planned(batch: &Batch) -> Self {
        Self::new(batch, StatusClass::Planned, None, None)
    }

    fn new(
        batch: &Batch,
        status: StatusClass,
        http_status: Option<u16>,
        error: Option<String>,
    ) -> Self {
        Self {
            index: batch.index(),
            first_id: batch.first_id().clone(),
            last_id: batch.last_id().clone(),
            size: batch.len(),
            status,
            http_status,
            error,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == StatusClass::Success
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self.status, StatusClass::Success | StatusClass::Planned)
    }
}

/// What happened at the review gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// Nothing changed, so there is nothing to review.
    NotNeeded,
    /// Dry run, or no batch was applied.
    Skipped,
    /// The changeset is waiting for a reviewer.
    Requested,
    /// Review requested and self-approved.
    Approved,
    /// The signal failed; applied batches are untouched.
    Failed(String),
}

impl From<ReviewRequestError> for ReviewOutcome {
    fn from(err: ReviewRequestError) -> Self {
        ReviewOutcome::Failed(err.to_string())
    }
}

/// Everything a sync run returns to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub source_count: usize,
    pub destination_count: usize,
    pub plan: PlanSummary,
    /// SHA-256 of the operation sequence; equal inputs give equal values.
    pub fingerprint: String,
    pub batches: Vec<BatchOutcome>,
    /// Operations in successfully submitted batches.
    pub applied: usize,
    pub review: ReviewOutcome,
    /// States visited, in order.
    pub states: Vec<SyncState>,
}

impl SyncReport {
    /// `false` when any batch failed or the review signal failed.
    pub fn succeeded(&self) -> bool {
        !self.batches.iter().any(BatchOutcome::is_failure)
            && !matches!(self.review, ReviewOutcome::Failed(_))
    }

    /// Source and destination already agreed.
    pub fn in_sync(&self) -> bool {
        self.plan.is_empty()
    }

    pub fn failed_batches(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.batches.iter().filter(|b| b.is_failure())
    }
}
