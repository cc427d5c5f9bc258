//! # remsync-sync
//!
//! Reconciliation engine and sync orchestration.
//!
//! [`reconcile`] computes the minimal ordered plan between two record sets,
//! [`batch`] chunks it, and [`pipeline::run`] drives a full run against a
//! [`RecordSource`] and a [`Destination`].

pub mod batch;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod review;
pub mod traits;

pub use batch::{batch, Batch};
pub use diff::{preview, OperationPreview};
pub use error::{BatchSubmissionError, ReviewRequestError, SyncError};
pub use pipeline::{Orchestrator, SyncState};
pub use reconcile::{reconcile, PlanSummary};
pub use report::{BatchOutcome, ReviewOutcome, StatusClass, SyncReport};
pub use review::ReviewRequester;
pub use traits::{BatchReceipt, Destination, RecordSource};
