/// # group-sync CLI Interface (Module)
///
/// Command parsing and orchestration glue for the `group-sync` binary.
///
/// All sync logic (provider adapters, the hierarchy walker, the group cache and
/// the canonical mapping) lives in [`group-sync-core`]. This module only loads
/// the YAML config, builds one [`Syncer`] per provider entry and reports results.
///
/// ## Output
/// Canonical groups of every successful provider are printed to stdout as a
/// pretty JSON array of outcomes. Provider failures are logged and turn the exit
/// status into an error once every provider has finished.
///
/// [`group-sync-core`]: ../../group-sync-core/
use crate::load_config::{load_config, load_credential, CliConfig, CredentialLookup};
use anyhow::Result;
use clap::{Parser, Subcommand};
use group_sync_core::provider::build_provider;
use group_sync_core::synchronise::{synchronise_all, Syncer};
use std::path::PathBuf;

/// CLI for group-sync: mirror directory groups into canonical group records.
#[derive(Parser)]
#[clap(
    name = "group-sync",
    version,
    about = "Synchronise Keycloak and Azure directory groups into canonical group records"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronise every configured provider and print the resulting groups
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// One syncer per provider entry, with its credential resolved.
pub fn build_syncers(config: CliConfig) -> Vec<Syncer> {
    config
        .providers
        .into_iter()
        .map(|entry| {
            let provider = build_provider(entry.provider);
            match load_credential(entry.credentials.as_ref()) {
                CredentialLookup::Found(credential) => Syncer::new(provider, credential),
                CredentialLookup::Unavailable(reason) => {
                    Syncer::with_unavailable_credential(provider, reason)
                }
            }
        })
        .collect()
}

/// Async CLI entrypoint shared by main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "sync", "Starting synchronisation process");

            let mut syncers = build_syncers(config);
            let report = synchronise_all(&mut syncers).await;

            println!("{}", serde_json::to_string_pretty(&report.outcomes)?);

            if report.is_success() {
                tracing::info!(
                    command = "sync",
                    providers = report.outcomes.len(),
                    "Synchronisation complete"
                );
                Ok(())
            } else {
                let failed: Vec<_> = report
                    .failures
                    .iter()
                    .map(|failure| format!("{}: {}", failure.provider, failure.error))
                    .collect();
                tracing::error!(command = "sync", failed = failed.len(), "Synchronisation failed");
                Err(anyhow::anyhow!(
                    "{} provider(s) failed: {}",
                    failed.len(),
                    failed.join("; ")
                ))
            }
        }
    }
}
