//! Command-line entry point
//!
//! Runs one batch over the product dataset. Item failures are reported
//! through the printed summary, the rerun command, and the failure
//! manifest — never through the exit code. Only setup faults (unreadable
//! config or dataset) exit non-zero.

use catalog_media::retry::RetryPolicy;
use catalog_media::{
    BatchRunner, CategoryQueries, Config, HttpAssetStore, HttpImageSource, HttpRegistrar,
    ItemPipeline, JsonManifestStore, RunSelection,
};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Source, store, and register product imagery in one batch run
#[derive(Debug, Parser)]
#[command(name = "catalog-media", version, about)]
struct Cli {
    /// Comma-separated product ids to process (default: the full dataset)
    #[arg(long, value_delimiter = ',', conflicts_with = "use_failed")]
    items: Option<Vec<i64>>,

    /// Reprocess only the products recorded in the failure manifest
    #[arg(long)]
    use_failed: bool,

    /// Path to a JSON config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured worker pool size
    #[arg(long)]
    workers: Option<usize>,
}

impl Cli {
    /// Selection precedence: explicit ids > failed manifest > full dataset
    fn selection(&self) -> RunSelection {
        match &self.items {
            Some(ids) => RunSelection::Ids(ids.iter().copied().collect::<BTreeSet<_>>()),
            None if self.use_failed => RunSelection::FromManifest,
            None => RunSelection::All,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted during setup");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> catalog_media::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => {
            let config = Config::default();
            config.validate()?;
            config
        }
    };

    let products = catalog_media::dataset::load_products(&config.data.products_path)?;
    let queries = CategoryQueries::load(&config.data.categories_path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "category map unavailable, using synthesized queries");
        CategoryQueries::default()
    });

    let client = reqwest::Client::new();
    let retry = RetryPolicy {
        attempts: config.retry.attempts,
        initial_delay: config.retry.initial_delay,
        factor: config.retry.factor,
    };

    let pipeline = Arc::new(ItemPipeline::new(
        Arc::new(HttpImageSource::new(client.clone(), config.source.clone())),
        Arc::new(HttpAssetStore::new(client.clone(), config.storage.clone())),
        Arc::new(HttpRegistrar::new(client, config.backend.clone())),
        queries,
        retry,
    ));

    let workers = cli.workers.unwrap_or(config.run.workers);
    let runner = BatchRunner::new(
        pipeline,
        Arc::new(JsonManifestStore::new(config.data.manifest_path.clone())),
        products,
        workers,
    );

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let report = runner.run(&cli.selection(), cancel).await?;

    println!(
        "batch complete: {} succeeded, {} failed ({} total)",
        report.succeeded,
        report.failed.len(),
        report.total()
    );
    if let Some(rerun) = report.rerun_command() {
        println!("retry failed products with: catalog-media {rerun}");
    }

    // Item failures are reported above, not via the exit status
    Ok(())
}

/// Cancel the run on SIGINT/SIGTERM; in-flight products finish or fail
/// their current attempt, then the manifest is written as usual.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("shutdown signal received, stopping dispatch");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = signal(SignalKind::terminate());
    let sigint = signal(SignalKind::interrupt());

    match (sigterm, sigint) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT (Ctrl+C)"),
            }
        }
        _ => {
            // Restricted environments may refuse signal registration
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.ok();
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_selects_full_dataset() {
        let cli = Cli::parse_from(["catalog-media"]);
        assert_eq!(cli.selection(), RunSelection::All);
    }

    #[test]
    fn items_flag_selects_explicit_ids() {
        let cli = Cli::parse_from(["catalog-media", "--items", "3,7"]);
        assert_eq!(
            cli.selection(),
            RunSelection::Ids(BTreeSet::from([3, 7]))
        );
    }

    #[test]
    fn use_failed_selects_manifest() {
        let cli = Cli::parse_from(["catalog-media", "--use-failed"]);
        assert_eq!(cli.selection(), RunSelection::FromManifest);
    }

    #[test]
    fn items_and_use_failed_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["catalog-media", "--items", "1", "--use-failed"]);
        assert!(result.is_err());
    }

    #[test]
    fn explicit_ids_beat_use_failed_in_precedence() {
        // clap rejects the combination, but the resolution order still
        // encodes the documented precedence.
        let cli = Cli {
            items: Some(vec![5]),
            use_failed: true,
            config: None,
            workers: None,
        };
        assert_eq!(cli.selection(), RunSelection::Ids(BTreeSet::from([5])));
    }
}
