//! `remsync sync`: reconcile the source into the collection.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use remsync_remote::RemoteSettingsClient;
use remsync_sync::{pipeline, BatchOutcome, ReviewOutcome, StatusClass, SyncReport};

use super::{check_credentials, load_config, record_source};

/// Arguments for `remsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Compute and print the plan without writing or requesting review.
    #[arg(long)]
    pub dry_run: bool,

    /// Read prompts from this checkout instead of cloning the source repo.
    #[arg(long, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Operations per batch (overrides BATCH_SIZE).
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub batch_size: Option<usize>,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, config_file: Option<&Path>) -> Result<()> {
        let mut config = load_config(config_file)?;
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }

        let client = RemoteSettingsClient::new(&config);
        let info = check_credentials(&client, &config)?;
        match &info.user {
            Some(user) => tracing::info!("logged in as {}", user.id),
            None => tracing::warn!("no credentials; running as anonymous"),
        }
        if let Some(limit) = info.settings.batch_max_requests {
            if let Some(requested) = config.cap_batch_size(limit) {
                tracing::warn!("batch size {requested} exceeds server limit; using {limit}");
            }
        }

        let source = record_source(&config, self.source_dir);
        let report = pipeline::run(&config, source.as_ref(), &client).context("sync failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
        } else {
            print_report(&report);
        }

        if !report.succeeded() {
            let failed = report.failed_batches().count();
            bail!(
                "sync finished with errors ({failed} failed batches, review {})",
                review_label(&report.review)
            );
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "batch")]
    index: usize,
    #[tabled(rename = "records")]
    range: String,
    #[tabled(rename = "ops")]
    size: usize,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "error")]
    error: String,
}

impl From<&BatchOutcome> for BatchRow {
    fn from(outcome: &BatchOutcome) -> Self {
        let status = match outcome.http_status {
            Some(code) => format!("{} {code}", status_label(outcome.status)),
            None => status_label(outcome.status).to_string(),
        };
        Self {
            index: outcome.index,
            range: format!("{}..{}", outcome.first_id, outcome.last_id),
            size: outcome.size,
            status,
            error: outcome.error.clone().unwrap_or_default(),
        }
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let plan = &report.plan;

    if report.in_sync() {
        println!(
            "{prefix}{} {} records already in sync",
            "✓".green(),
            report.source_count
        );
        return;
    }

    println!(
        "{prefix}plan: {} creates, {} updates, {} deletes ({} source, {} destination)",
        plan.creates.to_string().green(),
        plan.updates.to_string().yellow(),
        plan.deletes.to_string().red(),
        report.source_count,
        report.destination_count,
    );
    println!("{prefix}fingerprint: {}", report.fingerprint.bright_black());

    let rows: Vec<BatchRow> = report.batches.iter().map(BatchRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if !report.dry_run {
        println!("applied {} of {} operations", report.applied, plan.total());
    }
    let review = review_label(&report.review);
    match &report.review {
        ReviewOutcome::Failed(err) => println!("review: {} ({err})", review.red()),
        ReviewOutcome::Requested | ReviewOutcome::Approved => println!("review: {}", review.green()),
        _ => println!("review: {review}"),
    }
}

fn status_label(status: StatusClass) -> &'static str {
    match status {
        StatusClass::Success => "ok",
        StatusClass::ClientError => "client error",
        StatusClass::ServerError => "server error",
        StatusClass::Transport => "unreachable",
        StatusClass::Planned => "planned",
    }
}

fn review_label(review: &ReviewOutcome) -> &'static str {
    match review {
        ReviewOutcome::NotNeeded => "not needed",
        ReviewOutcome::Skipped => "skipped",
        ReviewOutcome::Requested => "requested",
        ReviewOutcome::Approved => "approved",
        ReviewOutcome::Failed(_) => "failed",
    }
}
