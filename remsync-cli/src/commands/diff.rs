//! `remsync diff`: show unified diffs for what sync would change.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use remsync_core::{OperationKind, RecordSet};
use remsync_remote::RemoteSettingsClient;
use remsync_sync::{preview, reconcile, Destination, RecordSource};

use super::{load_config, record_source};

/// Arguments for `remsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Read prompts from this checkout instead of cloning the source repo.
    #[arg(long, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self, config_file: Option<&Path>) -> Result<()> {
        let config = load_config(config_file)?;
        let source = record_source(&config, self.source_dir);
        let client = RemoteSettingsClient::new(&config);

        let source_records = source
            .fetch_records()
            .with_context(|| format!("failed to read source {}", source.label()))?;
        let source_set = RecordSet::from_records(source_records).context("source records")?;
        let destination_records = client
            .fetch_records()
            .with_context(|| format!("failed to read {}", client.records_path()))?;
        let destination_set =
            RecordSet::from_records(destination_records).context("destination records")?;

        let operations = reconcile(&source_set, &destination_set);
        if operations.is_empty() {
            println!("No differences ({} records).", source_set.len());
            return Ok(());
        }

        for item in preview(&operations, &destination_set) {
            let heading = format!("{} {}", item.kind, item.id);
            let heading = match item.kind {
                OperationKind::Create => heading.green(),
                OperationKind::Update => heading.yellow(),
                OperationKind::Delete => heading.red(),
            };
            println!("{}", heading.bold());
            print!("{}", item.unified_diff);
            if !item.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
