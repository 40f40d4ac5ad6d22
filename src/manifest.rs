//! Failure manifest persistence
//!
//! The manifest is the system's only durable state: one JSON record with
//! the ids that failed in the most recent run. Persistence is behind a
//! trait so the runner can be tested without touching the filesystem.

use crate::error::{ManifestError, Result};
use crate::types::FailureManifest;
use std::path::PathBuf;

/// Abstraction over failure manifest storage
#[async_trait::async_trait]
pub trait ManifestStore: Send + Sync {
    /// Read the ids recorded by the previous run
    async fn load(&self) -> Result<Vec<i64>>;

    /// Overwrite the manifest with this run's failed ids
    ///
    /// Called exactly once per run, after the work set fully drains;
    /// ids are deduplicated and sorted before the write.
    async fn persist(&self, failed: &[i64]) -> Result<()>;
}

/// File-backed [`ManifestStore`] using the on-disk JSON format
pub struct JsonManifestStore {
    path: PathBuf,
}

impl JsonManifestStore {
    /// Create a store writing to the given path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl ManifestStore for JsonManifestStore {
    async fn load(&self) -> Result<Vec<i64>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::NotFound {
                    path: self.path.clone(),
                }
                .into());
            }
            Err(e) => {
                return Err(ManifestError::Io {
                    path: self.path.clone(),
                    source: e,
                }
                .into());
            }
        };

        let manifest: FailureManifest =
            serde_json::from_str(&contents).map_err(|e| ManifestError::Malformed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        Ok(manifest.failed)
    }

    async fn persist(&self, failed: &[i64]) -> Result<()> {
        let manifest = FailureManifest::new(failed.iter().copied());
        let json = serde_json::to_string_pretty(&manifest)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| ManifestError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        tracing::info!(
            path = %self.path.display(),
            count = manifest.failed.len(),
            "failure manifest written"
        );
        Ok(())
    }
}
