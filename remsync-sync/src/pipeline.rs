//! Sync orchestrator: fetch, diff, batch, submit, review.
//!
//! ## States
//!
//! ```text
//! Init → SourceFetched → DestinationFetched → Diffed → Batched
//!      → Submitting → ReviewRequested → Done
//! ```
//!
//! Any fatal error moves to `Failed`. Fatal errors can only happen before the
//! first write; once `Submitting` is entered, batch and review failures are
//! recorded in the [`SyncReport`] instead.

use std::fmt;

use chrono::Utc;
use serde::Serialize;

use remsync_core::{Record, RecordSet, SyncConfig};

use crate::batch::{batch, Batch};
use crate::error::{BatchSubmissionError, SyncError};
use crate::fingerprint::plan_fingerprint;
use crate::reconcile::{reconcile, PlanSummary};
use crate::report::{BatchOutcome, ReviewOutcome, SyncReport};
use crate::review::ReviewRequester;
use crate::traits::{Destination, RecordSource};

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Init,
    SourceFetched,
    DestinationFetched,
    Diffed,
    Batched,
    Submitting,
    ReviewRequested,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Init => "init",
            SyncState::SourceFetched => "source-fetched",
            SyncState::DestinationFetched => "destination-fetched",
            SyncState::Diffed => "diffed",
            SyncState::Batched => "batched",
            SyncState::Submitting => "submitting",
            SyncState::ReviewRequested => "review-requested",
            SyncState::Done => "done",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives one sync run. Single-threaded; batches go out one at a time.
pub struct Orchestrator<'a> {
    config: &'a SyncConfig,
    source: &'a dyn RecordSource,
    destination: &'a dyn Destination,
    state: SyncState,
    trail: Vec<SyncState>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a SyncConfig,
        source: &'a dyn RecordSource,
        destination: &'a dyn Destination,
    ) -> Self {
        Self {
            config,
            source,
            destination,
            state: SyncState::Init,
            trail: vec![SyncState::Init],
        }
    }

    /// Current state; `Done` or `Failed` after [`Orchestrator::run`].
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Run the whole pipeline once.
    pub fn run(&mut self) -> Result<SyncReport, SyncError> {
        match self.execute() {
            Ok(report) => Ok(report),
            Err(err) => {
                tracing::error!("sync aborted: {err}");
                self.enter(SyncState::Failed);
                Err(err)
            }
        }
    }

    fn enter(&mut self, next: SyncState) {
        tracing::debug!("state {} -> {}", self.state, next);
        self.state = next;
        self.trail.push(next);
    }

    fn execute(&mut self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        self.config.validate()?;

        let source = self.fetch_source()?;
        self.enter(SyncState::SourceFetched);

        let destination = self.fetch_destination()?;
        self.enter(SyncState::DestinationFetched);

        let operations = reconcile(&source, &destination);
        let plan = PlanSummary::of(&operations);
        let fingerprint = plan_fingerprint(&operations);
        self.enter(SyncState::Diffed);
        tracing::info!(
            "plan: {} creates, {} updates, {} deletes",
            plan.creates,
            plan.updates,
            plan.deletes
        );

        let batches = batch(operations, self.config.batch_size)?;
        self.enter(SyncState::Batched);

        let (outcomes, review) = if plan.is_empty() {
            tracing::info!("records are already in sync");
            (Vec::new(), ReviewOutcome::NotNeeded)
        } else if self.config.dry_run {
            tracing::info!("[dry-run] {} batches not submitted", batches.len());
            (
                batches.iter().map(BatchOutcome::planned).collect(),
                ReviewOutcome::Skipped,
            )
        } else {
            self.enter(SyncState::Submitting);
            let outcomes: Vec<BatchOutcome> =
                batches.iter().map(|b| self.submit(b)).collect();
            let review = if outcomes.iter().any(BatchOutcome::succeeded) {
                self.enter(SyncState::ReviewRequested);
                self.request_review()
            } else {
                tracing::warn!("no batch was applied; skipping review request");
                ReviewOutcome::Skipped
            };
            (outcomes, review)
        };

        let applied = outcomes
            .iter()
            .filter(|o| o.succeeded())
            .map(|o| o.size)
            .sum();
        self.enter(SyncState::Done);

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: self.config.dry_run,
            source_count: source.len(),
            destination_count: destination.len(),
            plan,
            fingerprint,
            batches: outcomes,
            applied,
            review,
            states: self.trail.clone(),
        })
    }

    fn fetch_source(&self) -> Result<RecordSet, SyncError> {
        let label = self.source.label().to_string();
        tracing::info!("fetching source records from {label}");
        let records = self
            .source
            .fetch_records()
            .map_err(|source| SyncError::SourceUnavailable {
                label: label.clone(),
                source,
            })?;
        tracing::info!("found {} source records", records.len());
        to_set("source", records)
    }

    fn fetch_destination(&self) -> Result<RecordSet, SyncError> {
        tracing::info!(
            "fetching destination records from {}/{}",
            self.config.bucket_id,
            self.config.collection_id
        );
        let records = self
            .destination
            .fetch_records()
            .map_err(SyncError::DestinationUnavailable)?;
        tracing::info!("found {} destination records", records.len());
        to_set("destination", records)
    }

    fn submit(&self, batch: &Batch) -> BatchOutcome {
        match self.destination.submit_batch(batch) {
            Ok(receipt) => {
                tracing::info!(
                    "batch {} applied ({} operations, {}..{})",
                    batch.index(),
                    batch.len(),
                    batch.first_id(),
                    batch.last_id()
                );
                BatchOutcome::applied(batch, receipt)
            }
            Err(source) => {
                let err = BatchSubmissionError {
                    index: batch.index(),
                    first: batch.first_id().clone(),
                    last: batch.last_id().clone(),
                    source,
                };
                tracing::warn!("{err}");
                BatchOutcome::failed(batch, &err)
            }
        }
    }

    fn request_review(&self) -> ReviewOutcome {
        let requester = ReviewRequester::new(
            self.destination,
            &self.config.review_message,
            self.config.self_approve,
        );
        match requester.request() {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("{err}");
                err.into()
            }
        }
    }
}

fn to_set(side: &'static str, records: Vec<Record>) -> Result<RecordSet, SyncError> {
    RecordSet::from_records(records).map_err(|source| SyncError::DuplicateIdentity { side, source })
}

/// Run the pipeline once with a fresh [`Orchestrator`].
///
/// Canonical entrypoint for the CLI.
pub fn run(
    config: &SyncConfig,
    source: &dyn RecordSource,
    destination: &dyn Destination,
) -> Result<SyncReport, SyncError> {
    Orchestrator::new(config, source, destination).run()
}
