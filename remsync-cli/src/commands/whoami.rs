//! `remsync whoami`: verify the configured credentials.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use remsync_remote::RemoteSettingsClient;

use super::{check_credentials, load_config};

/// Arguments for `remsync whoami`.
#[derive(Args, Debug)]
pub struct WhoamiArgs {}

impl WhoamiArgs {
    pub fn run(self, config_file: Option<&Path>) -> Result<()> {
        let config = load_config(config_file)?;
        let client = RemoteSettingsClient::new(&config);

        println!("server: {} ({})", config.server_root(), config.environment);
        match check_credentials(&client, &config)?.user {
            Some(user) => println!("{} logged in as {}", "✓".green(), user.id.bold()),
            None => println!("{} anonymous access", "!".yellow()),
        }
        Ok(())
    }
}
