//! Core domain types
//!
//! Products and category queries are loaded once at startup and never
//! mutated. Image candidates and stored images are ephemeral — they live
//! only within a single item's pipeline run. The failure manifest and run
//! report are the durable outputs of a batch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One unit of batch work: a catalog product needing imagery
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Category slug used to resolve the search query
    pub category: String,
}

/// One search result before upload: a locator for a candidate image
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// Where the image bytes can be fetched from
    pub url: String,
    /// Identifier assigned by the search service, when it provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// Result of a successful upload: the final address plus metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    /// Public address of the stored image
    pub url: String,
    /// Pixel width, when the store reports it
    #[serde(default)]
    pub width: Option<u32>,
    /// Pixel height, when the store reports it
    #[serde(default)]
    pub height: Option<u32>,
    /// Size of the stored object in bytes
    pub bytes: u64,
    /// Image format (e.g. "jpeg")
    pub format: String,
}

/// Durable record of which products did not complete in the last run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureManifest {
    /// Product ids whose pipeline run did not complete successfully
    pub failed: Vec<i64>,
}

impl FailureManifest {
    /// Build a manifest from raw ids, deduplicated and sorted
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        let failed: Vec<i64> = ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        Self { failed }
    }
}

/// The resolved work set for one invocation
///
/// Computed once at startup and immutable for the run's duration.
/// Precedence when resolving from the command line: explicit ids beat
/// failed-manifest rerun, which beats the full dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunSelection {
    /// Every product in the dataset
    All,
    /// Only products whose id appears in the set; absent ids are skipped silently
    Ids(BTreeSet<i64>),
    /// Products listed in the failure manifest from the previous run
    FromManifest,
}

/// Outcome of one batch run, returned by the run loop
///
/// The runner accumulates into this explicit result object rather than
/// module-level state; persistence of the manifest happens through an
/// injected collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Products that completed the full pipeline
    pub succeeded: usize,
    /// Deduplicated, sorted ids of products that did not complete
    pub failed: Vec<i64>,
}

impl RunReport {
    /// Total number of products processed (or accounted for) in this run
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// The narrower re-invocation that retries exactly the failed products,
    /// or `None` when nothing failed
    pub fn rerun_command(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let ids: Vec<String> = self.failed.iter().map(i64::to_string).collect();
        Some(format!("--items={}", ids.join(",")))
    }
}
