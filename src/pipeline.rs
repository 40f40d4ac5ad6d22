//! Per-item pipeline
//!
//! Runs the fixed four-step sequence for one product: search for
//! candidates, download and store each image sequentially, verify the
//! stored count, register the addresses. Each stage's network call is
//! wrapped in the retry combinator under its own label; any failure
//! aborts the remaining steps for that product and becomes the item's
//! outcome.
//!
//! The pipeline holds no mutable state across invocations, so the runner
//! may call [`ItemPipeline::process`] from any number of workers
//! concurrently.

use crate::dataset::CategoryQueries;
use crate::error::{PipelineError, Result};
use crate::registrar::Registrar;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::source::ImageSource;
use crate::store::AssetStore;
use crate::types::{Product, StoredImage};
use std::sync::Arc;

/// Composes the three stage collaborators into one per-product run
pub struct ItemPipeline {
    source: Arc<dyn ImageSource>,
    store: Arc<dyn AssetStore>,
    registrar: Arc<dyn Registrar>,
    queries: CategoryQueries,
    retry: RetryPolicy,
}

impl ItemPipeline {
    /// Assemble a pipeline from its collaborators
    pub fn new(
        source: Arc<dyn ImageSource>,
        store: Arc<dyn AssetStore>,
        registrar: Arc<dyn Registrar>,
        queries: CategoryQueries,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            store,
            registrar,
            queries,
            retry,
        }
    }

    /// Run the full pipeline for one product
    ///
    /// Returns the number of images registered on success. Every failure
    /// is an item-level outcome; nothing here aborts the batch.
    pub async fn process(&self, product: &Product) -> Result<usize> {
        let query = self.queries.query_for(&product.category);
        tracing::info!(product_id = product.id, name = %product.name, query = %query, "processing product");

        let candidates = retry_with_backoff(&self.retry, "image-search", || {
            self.source.search(&query)
        })
        .await?;

        if candidates.is_empty() {
            return Err(PipelineError::NoImagesFound {
                product_id: product.id,
                query,
            }
            .into());
        }

        // Strictly sequential uploads: one image's bytes resident at a
        // time, and per-product log ordering stays stable.
        let mut stored: Vec<StoredImage> = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.iter().enumerate() {
            let image = retry_with_backoff(&self.retry, "image-upload", || async move {
                let bytes = self.source.download(candidate).await?;
                self.store.upload(bytes, product.id, index).await
            })
            .await?;
            tracing::debug!(
                product_id = product.id,
                index,
                url = %image.url,
                "image stored"
            );
            stored.push(image);
        }

        // Count mismatch signals a data-integrity problem, distinct from
        // a transport failure; registration must not run after one.
        if stored.len() != candidates.len() {
            return Err(PipelineError::PartialUpload {
                product_id: product.id,
                expected: candidates.len(),
                stored: stored.len(),
            }
            .into());
        }

        retry_with_backoff(&self.retry, "register", || {
            self.registrar.register(product.id, &stored)
        })
        .await?;

        tracing::info!(
            product_id = product.id,
            images = stored.len(),
            "product complete"
        );
        Ok(stored.len())
    }
}
