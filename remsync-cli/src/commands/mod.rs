pub mod diff;
pub mod sync;
pub mod whoami;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use remsync_core::{config, SyncConfig};
use remsync_remote::{DirectorySource, GitSource, RemoteSettingsClient, ServerInfo};
use remsync_sync::RecordSource;

/// Layered config: file, then environment.
pub fn load_config(file: Option<&Path>) -> Result<SyncConfig> {
    let config = config::load(file).context("failed to load configuration")?;
    tracing::debug!(
        "environment {} server {} collection {}/{}",
        config.environment,
        config.server_url,
        config.bucket_id,
        config.collection_id
    );
    Ok(config)
}

/// `--source-dir` reads a local checkout; otherwise clone the configured repo.
pub fn record_source(config: &SyncConfig, source_dir: Option<PathBuf>) -> Box<dyn RecordSource> {
    match source_dir {
        Some(dir) => Box::new(DirectorySource::new(dir)),
        None => Box::new(GitSource::from_config(config)),
    }
}

/// `GET /` against the server; fails when it is unreachable or rejects us.
pub fn check_credentials(client: &RemoteSettingsClient, config: &SyncConfig) -> Result<ServerInfo> {
    client
        .server_info()
        .with_context(|| format!("credential check failed against {}", config.server_root()))
}
