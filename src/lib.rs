//! # catalog-media
//!
//! Batch pipeline that sources, stores, and registers product imagery.
//!
//! For every product in a static dataset the pipeline searches an image
//! service for candidates, downloads and uploads each image to an asset
//! store at a deterministic address, and registers the stored addresses
//! with the catalog backend. Products that fail are recorded in a JSON
//! failure manifest so a later invocation can retry exactly those ids.
//!
//! ## Design Philosophy
//!
//! - **Failure isolation** - one product's failure never aborts the batch
//! - **Resumable** - full run, targeted `--items` run, or `--use-failed`
//!   rerun against the manifest from the previous run
//! - **Swappable collaborators** - the image source, asset store, backend
//!   registrar, and manifest store are async traits; the HTTP
//!   implementations are thin shims
//! - **Bounded** - a fixed-size worker pool processes products
//!   concurrently while each product's stages stay strictly sequential
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalog_media::{
//!     BatchRunner, CategoryQueries, Config, HttpAssetStore, HttpImageSource,
//!     HttpRegistrar, ItemPipeline, JsonManifestStore, RunSelection,
//! };
//! use catalog_media::retry::RetryPolicy;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let client = reqwest::Client::new();
//!
//!     let pipeline = Arc::new(ItemPipeline::new(
//!         Arc::new(HttpImageSource::new(client.clone(), config.source.clone())),
//!         Arc::new(HttpAssetStore::new(client.clone(), config.storage.clone())),
//!         Arc::new(HttpRegistrar::new(client, config.backend.clone())),
//!         CategoryQueries::load(&config.data.categories_path)?,
//!         RetryPolicy::default(),
//!     ));
//!
//!     let runner = BatchRunner::new(
//!         pipeline,
//!         Arc::new(JsonManifestStore::new(config.data.manifest_path.clone())),
//!         catalog_media::dataset::load_products(&config.data.products_path)?,
//!         config.run.workers,
//!     );
//!
//!     let report = runner.run(&RunSelection::All, CancellationToken::new()).await?;
//!     println!("{} succeeded, {} failed", report.succeeded, report.failed.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Static dataset and category query map loading
pub mod dataset;
/// Error types
pub mod error;
/// Failure manifest persistence
pub mod manifest;
/// Per-item pipeline (search, upload, register)
pub mod pipeline;
/// Backend registration collaborator
pub mod registrar;
/// Retry logic with exponential backoff
pub mod retry;
/// Batch runner and work-set selection
pub mod runner;
/// Image search service collaborator
pub mod source;
/// Asset store collaborator
pub mod store;
/// Core domain types
pub mod types;

// Re-export commonly used types
pub use config::{BackendConfig, Config, DataConfig, RetryConfig, RunConfig, SourceConfig, StorageConfig};
pub use dataset::CategoryQueries;
pub use error::{
    Error, ManifestError, PipelineError, RegisterError, Result, SourceError, UploadError,
};
pub use manifest::{JsonManifestStore, ManifestStore};
pub use pipeline::ItemPipeline;
pub use registrar::{HttpRegistrar, Registrar};
pub use retry::{retry_with_backoff, IsRetryable, RetryPolicy};
pub use runner::BatchRunner;
pub use source::{HttpImageSource, ImageSource};
pub use store::{AssetStore, HttpAssetStore};
pub use types::{
    FailureManifest, ImageCandidate, Product, RunReport, RunSelection, StoredImage,
};
