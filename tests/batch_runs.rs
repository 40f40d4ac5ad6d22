//! End-to-end batch scenarios over in-memory collaborators
//!
//! Exercises the public API the way the binary wires it together, with a
//! real file-backed manifest store and scripted stage collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use catalog_media::retry::RetryPolicy;
use catalog_media::{
    AssetStore, BatchRunner, CategoryQueries, Error, ImageCandidate, ImageSource, ItemPipeline,
    JsonManifestStore, ManifestStore, Product, Registrar, RunSelection, SourceError, StoredImage,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Scripted source: every product finds two candidates unless its query
/// is in the failing set, in which case the search stays unavailable.
struct ScriptedSource {
    failing_queries: Mutex<HashSet<String>>,
    search_calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(failing_queries: HashSet<String>) -> Self {
        Self {
            failing_queries: Mutex::new(failing_queries),
            search_calls: AtomicUsize::new(0),
        }
    }

    async fn heal(&self) {
        self.failing_queries.lock().await.clear();
    }
}

#[async_trait::async_trait]
impl ImageSource for ScriptedSource {
    async fn search(&self, query: &str) -> catalog_media::Result<Vec<ImageCandidate>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.lock().await.contains(query) {
            return Err(SourceError::Unavailable { status: 503 }.into());
        }
        Ok(vec![
            ImageCandidate {
                url: format!("https://images/{query}/0.jpg"),
                source_id: None,
            },
            ImageCandidate {
                url: format!("https://images/{query}/1.jpg"),
                source_id: None,
            },
        ])
    }

    async fn download(&self, _candidate: &ImageCandidate) -> catalog_media::Result<Vec<u8>> {
        Ok(b"imagebytes".to_vec())
    }
}

#[derive(Default)]
struct RecordingStore {
    uploads: Mutex<Vec<(i64, usize)>>,
}

#[async_trait::async_trait]
impl AssetStore for RecordingStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        product_id: i64,
        index: usize,
    ) -> catalog_media::Result<StoredImage> {
        self.uploads.lock().await.push((product_id, index));
        Ok(StoredImage {
            url: format!("https://cdn/products/{product_id}/{index}.jpg"),
            width: Some(640),
            height: Some(480),
            bytes: bytes.len() as u64,
            format: "jpeg".to_string(),
        })
    }
}

#[derive(Default)]
struct RecordingRegistrar {
    registered: Mutex<HashMap<i64, Vec<String>>>,
}

#[async_trait::async_trait]
impl Registrar for RecordingRegistrar {
    async fn register(
        &self,
        product_id: i64,
        images: &[StoredImage],
    ) -> catalog_media::Result<()> {
        self.registered
            .lock()
            .await
            .insert(product_id, images.iter().map(|i| i.url.clone()).collect());
        Ok(())
    }
}

fn dataset() -> Vec<Product> {
    [
        (1, "Ceramic Mug", "ceramic-mugs"),
        (2, "Walnut Desk Lamp", "desk-lamps"),
        (3, "Linen Cushion", "cushions"),
        (5, "Brass Bookend", "bookends"),
        (9, "Oak Side Table", "side-tables"),
    ]
    .into_iter()
    .map(|(id, name, category)| Product {
        id,
        name: name.to_string(),
        category: category.to_string(),
    })
    .collect()
}

fn query_for(category: &str) -> String {
    format!("{} product photo", category.replace('-', " "))
}

fn build_runner(
    source: Arc<ScriptedSource>,
    store: Arc<RecordingStore>,
    registrar: Arc<RecordingRegistrar>,
    manifest: Arc<JsonManifestStore>,
    workers: usize,
) -> BatchRunner {
    let pipeline = Arc::new(ItemPipeline::new(
        source,
        store,
        registrar,
        CategoryQueries::new(HashMap::new()),
        RetryPolicy {
            attempts: 2,
            initial_delay: Duration::from_millis(1),
            factor: 2.0,
        },
    ));
    BatchRunner::new(pipeline, manifest, dataset(), workers)
}

#[tokio::test]
async fn failed_run_writes_manifest_then_targeted_rerun_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("failed-products.json");

    // Run 1: products 2 and 9 cannot find images
    let source = Arc::new(ScriptedSource::new(HashSet::from([
        query_for("desk-lamps"),
        query_for("side-tables"),
    ])));
    let store = Arc::new(RecordingStore::default());
    let registrar = Arc::new(RecordingRegistrar::default());
    let manifest = Arc::new(JsonManifestStore::new(manifest_path.clone()));
    let runner = build_runner(
        source.clone(),
        store.clone(),
        registrar.clone(),
        manifest.clone(),
        4,
    );

    let report = runner
        .run(&RunSelection::All, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, vec![2, 9]);
    assert_eq!(report.rerun_command().unwrap(), "--items=2,9");

    // The manifest landed on disk in the documented shape
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&manifest_path).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!({"failed": [2, 9]}));

    // Successful products were fully registered with both image urls
    let registered = registrar.registered.lock().await;
    assert_eq!(registered.len(), 3);
    assert_eq!(
        registered.get(&1).unwrap(),
        &vec![
            "https://cdn/products/1/0.jpg".to_string(),
            "https://cdn/products/1/1.jpg".to_string(),
        ]
    );
    assert!(!registered.contains_key(&2));
    drop(registered);

    // Run 2: the source recovers; rerun only the manifest ids
    source.heal().await;
    let report = runner
        .run(&RunSelection::FromManifest, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.succeeded, 2);
    assert!(report.failed.is_empty());

    // Zero failures leaves the old manifest file in place untouched,
    // and a later full run does not consult it
    assert_eq!(manifest.load().await.unwrap(), vec![2, 9]);
    let report = runner
        .run(&RunSelection::All, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.succeeded, 5);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn targeted_run_processes_only_present_ids() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new(HashSet::new()));
    let store = Arc::new(RecordingStore::default());
    let registrar = Arc::new(RecordingRegistrar::default());
    let manifest = Arc::new(JsonManifestStore::new(dir.path().join("failed.json")));
    let runner = build_runner(source, store.clone(), registrar.clone(), manifest, 2);

    // 7 is not in the dataset; its absence is not an error
    let report = runner
        .run(
            &RunSelection::Ids(BTreeSet::from([3, 7])),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert!(report.failed.is_empty());

    let uploads = store.uploads.lock().await;
    assert!(uploads.iter().all(|(id, _)| *id == 3));
    assert_eq!(uploads.len(), 2, "two images for the one selected product");
}

#[tokio::test]
async fn uploads_use_product_scoped_indices() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(ScriptedSource::new(HashSet::new()));
    let store = Arc::new(RecordingStore::default());
    let registrar = Arc::new(RecordingRegistrar::default());
    let manifest = Arc::new(JsonManifestStore::new(dir.path().join("failed.json")));
    let runner = build_runner(source, store.clone(), registrar, manifest, 4);

    runner
        .run(&RunSelection::All, CancellationToken::new())
        .await
        .unwrap();

    // Every product uploaded indices 0 and 1, independent of worker
    // interleaving: the deterministic address is per product, per index.
    let uploads = store.uploads.lock().await;
    let mut by_product: HashMap<i64, Vec<usize>> = HashMap::new();
    for (id, index) in uploads.iter() {
        by_product.entry(*id).or_default().push(*index);
    }
    for (product, mut indices) in by_product {
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1], "product {product} indices");
    }
}

#[tokio::test]
async fn unreadable_manifest_falls_back_to_full_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("failed.json");
    std::fs::write(&manifest_path, "{ not json").unwrap();

    let source = Arc::new(ScriptedSource::new(HashSet::new()));
    let store = Arc::new(RecordingStore::default());
    let registrar = Arc::new(RecordingRegistrar::default());
    let manifest = Arc::new(JsonManifestStore::new(manifest_path));
    let runner = build_runner(source, store, registrar, manifest.clone(), 2);

    // The malformed manifest is a load error in isolation...
    assert!(matches!(
        manifest.load().await.unwrap_err(),
        Error::Manifest(_)
    ));

    // ...but a --use-failed run degrades to the full dataset
    let report = runner
        .run(&RunSelection::FromManifest, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.succeeded, 5);
}

#[tokio::test]
async fn pool_sizes_one_and_eight_agree_on_outcomes() {
    for workers in [1usize, 8] {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(HashSet::from([query_for("cushions")])));
        let store = Arc::new(RecordingStore::default());
        let registrar = Arc::new(RecordingRegistrar::default());
        let manifest = Arc::new(JsonManifestStore::new(dir.path().join("failed.json")));
        let runner = build_runner(source, store, registrar, manifest, workers);

        let report = runner
            .run(&RunSelection::All, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.failed, vec![3], "workers={workers}");
        assert_eq!(report.succeeded, 4, "workers={workers}");
    }
}
