//! Configuration types
//!
//! Every section deserializes with sensible per-field defaults, so a
//! partial config file (or none at all) still yields a runnable setup.
//! Endpoints have placeholder defaults and are checked by
//! [`Config::validate`] before a run starts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Image search service settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Asset store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Backend registration settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Dataset and manifest file locations
    #[serde(default)]
    pub data: DataConfig,

    /// Batch run behavior
    #[serde(default)]
    pub run: RunConfig,

    /// Retry behavior shared by all pipeline stages
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Image search service configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the image search endpoint
    #[serde(default = "default_source_endpoint")]
    pub endpoint: String,

    /// API key sent as a bearer token, if the service requires one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Results requested per page (default: 4)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Hard cap on pages fetched per product, regardless of how many the
    /// service reports (default: 3)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

/// Asset store configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the asset store
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    /// Bucket or container name uploads are placed under
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

/// Backend registration configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the catalog backend
    #[serde(default = "default_backend_endpoint")]
    pub endpoint: String,
}

/// Dataset and manifest file locations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    /// Product dataset (JSON array of products)
    #[serde(default = "default_products_path")]
    pub products_path: PathBuf,

    /// Category slug to search query map (JSON object)
    #[serde(default = "default_categories_path")]
    pub categories_path: PathBuf,

    /// Failure manifest written after runs with failures
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
}

/// Batch run behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of worker tasks processing products concurrently (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Retry configuration applied to every pipeline stage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first (default: 3)
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Delay before the second attempt (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Multiplier applied to the delay after each failed attempt (default: 2.0)
    #[serde(default = "default_factor")]
    pub factor: f64,
}

fn default_source_endpoint() -> String {
    "https://images.example.com/search".to_string()
}

fn default_per_page() -> u32 {
    4
}

fn default_max_pages() -> u32 {
    3
}

fn default_storage_endpoint() -> String {
    "https://assets.example.com".to_string()
}

fn default_bucket() -> String {
    "product-images".to_string()
}

fn default_backend_endpoint() -> String {
    "https://api.example.com".to_string()
}

fn default_products_path() -> PathBuf {
    PathBuf::from("data/products.json")
}

fn default_categories_path() -> PathBuf {
    PathBuf::from("data/categories.json")
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("failed-products.json")
}

fn default_workers() -> usize {
    4
}

fn default_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_factor() -> f64 {
    2.0
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_source_endpoint(),
            api_key: None,
            per_page: default_per_page(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_storage_endpoint(),
            bucket: default_bucket(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_backend_endpoint(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            products_path: default_products_path(),
            categories_path: default_categories_path(),
            manifest_path: default_manifest_path(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            initial_delay: default_initial_delay(),
            factor: default_factor(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("could not read config file: {e}"),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| Error::Config {
            message: format!("could not parse config file: {e}"),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints before a run starts
    pub fn validate(&self) -> Result<()> {
        if self.retry.attempts == 0 {
            return Err(Error::Config {
                message: "retry.attempts must be at least 1".to_string(),
                key: Some("retry.attempts".to_string()),
            });
        }
        if self.retry.factor <= 1.0 {
            return Err(Error::Config {
                message: "retry.factor must be greater than 1.0".to_string(),
                key: Some("retry.factor".to_string()),
            });
        }
        if self.run.workers == 0 {
            return Err(Error::Config {
                message: "run.workers must be at least 1".to_string(),
                key: Some("run.workers".to_string()),
            });
        }
        if self.source.max_pages == 0 {
            return Err(Error::Config {
                message: "source.max_pages must be at least 1".to_string(),
                key: Some("source.max_pages".to_string()),
            });
        }
        if self.source.per_page == 0 {
            return Err(Error::Config {
                message: "source.per_page must be at least 1".to_string(),
                key: Some("source.per_page".to_string()),
            });
        }
        Ok(())
    }
}

// Duration serialization helper (seconds granularity)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
