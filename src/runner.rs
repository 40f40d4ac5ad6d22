//! Batch runner
//!
//! Resolves the work set for one invocation, drives the item pipeline
//! over it with a fixed-size worker pool, and turns the outcome into a
//! [`RunReport`] plus (when anything failed) a freshly written failure
//! manifest.
//!
//! One product's failure never aborts the batch: workers record the id
//! and move on. The manifest is written exactly once, after the pool has
//! fully drained.

use crate::error::Result;
use crate::manifest::ManifestStore;
use crate::pipeline::ItemPipeline;
use crate::types::{Product, RunReport, RunSelection};
use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Orchestrates one batch run over the static product dataset
pub struct BatchRunner {
    pipeline: Arc<ItemPipeline>,
    manifest: Arc<dyn ManifestStore>,
    dataset: Vec<Product>,
    workers: usize,
}

impl BatchRunner {
    /// Assemble a runner from its collaborators
    ///
    /// `workers` is clamped to at least 1.
    pub fn new(
        pipeline: Arc<ItemPipeline>,
        manifest: Arc<dyn ManifestStore>,
        dataset: Vec<Product>,
        workers: usize,
    ) -> Self {
        Self {
            pipeline,
            manifest,
            dataset,
            workers: workers.max(1),
        }
    }

    /// Resolve the selection into concrete products, in dataset order
    ///
    /// Ids missing from the dataset are silently absent from the result.
    /// An unreadable manifest under [`RunSelection::FromManifest`] logs a
    /// warning and degrades to the full dataset rather than aborting.
    pub async fn resolve_selection(&self, selection: &RunSelection) -> Vec<Product> {
        match selection {
            RunSelection::All => self.dataset.clone(),
            RunSelection::Ids(ids) => self.filter_by_ids(ids),
            RunSelection::FromManifest => match self.manifest.load().await {
                Ok(ids) => {
                    let ids: BTreeSet<i64> = ids.into_iter().collect();
                    tracing::info!(count = ids.len(), "rerunning products from failure manifest");
                    self.filter_by_ids(&ids)
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "failure manifest unavailable, falling back to full dataset"
                    );
                    self.dataset.clone()
                }
            },
        }
    }

    fn filter_by_ids(&self, ids: &BTreeSet<i64>) -> Vec<Product> {
        self.dataset
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect()
    }

    /// Run the selected products through the pipeline and report the outcome
    ///
    /// Cancellation stops dispatching new products immediately; in-flight
    /// products finish or fail their current attempt, and everything left
    /// undispatched is recorded as failed so a `--use-failed` rerun covers
    /// it.
    pub async fn run(&self, selection: &RunSelection, cancel: CancellationToken) -> Result<RunReport> {
        let selected = self.resolve_selection(selection).await;
        let total = selected.len();
        tracing::info!(total, workers = self.workers, "batch run starting");

        let queue = Arc::new(Mutex::new(selected.into_iter().collect::<VecDeque<_>>()));
        // The only state shared between workers; appended under a lock.
        let failed = Arc::new(Mutex::new(Vec::<i64>::new()));
        let succeeded = Arc::new(Mutex::new(0usize));

        let mut handles = Vec::with_capacity(self.workers);
        for worker in 0..self.workers {
            let queue = Arc::clone(&queue);
            let failed = Arc::clone(&failed);
            let succeeded = Arc::clone(&succeeded);
            let pipeline = Arc::clone(&self.pipeline);
            let cancel = cancel.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        tracing::info!(worker, "cancellation requested, worker stopping");
                        break;
                    }

                    let product = {
                        let mut queue = queue.lock().await;
                        queue.pop_front()
                    };
                    let Some(product) = product else {
                        break;
                    };

                    match pipeline.process(&product).await {
                        Ok(images) => {
                            tracing::debug!(worker, product_id = product.id, images, "product succeeded");
                            *succeeded.lock().await += 1;
                        }
                        Err(e) => {
                            tracing::warn!(
                                worker,
                                product_id = product.id,
                                error = %e,
                                "product failed"
                            );
                            failed.lock().await.push(product.id);
                        }
                    }
                }
            }));
        }

        for handle in handles {
            // Worker bodies don't panic; a poisoned join still shouldn't
            // take down the batch accounting.
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker task failed to join");
            }
        }

        // Products never dispatched before cancellation count as failures
        // so the rerun covers them.
        {
            let mut queue = queue.lock().await;
            let mut failed = failed.lock().await;
            while let Some(product) = queue.pop_front() {
                failed.push(product.id);
            }
        }

        let succeeded = *succeeded.lock().await;
        let failed_ids: BTreeSet<i64> = failed.lock().await.iter().copied().collect();
        let report = RunReport {
            succeeded,
            failed: failed_ids.into_iter().collect(),
        };

        if report.failed.is_empty() {
            tracing::info!(succeeded = report.succeeded, "batch run complete, no failures");
        } else {
            // Single write after the pool drains; a stale manifest from a
            // previous run is only ever overwritten, never appended to.
            if let Err(e) = self.manifest.persist(&report.failed).await {
                tracing::error!(error = %e, "could not persist failure manifest");
            }
            tracing::warn!(
                succeeded = report.succeeded,
                failed = report.failed.len(),
                rerun = report.rerun_command().as_deref().unwrap_or_default(),
                "batch run complete with failures"
            );
        }

        Ok(report)
    }
}
