//! Asset store collaborator
//!
//! Uploads land at a deterministic path derived from the product id and
//! the image's index within the product's batch, so a retried upload
//! overwrites its previous attempt instead of duplicating it.

use crate::config::StorageConfig;
use crate::error::{Result, UploadError};
use crate::types::StoredImage;
use serde::Deserialize;

/// Abstraction over binary asset persistence
#[async_trait::async_trait]
pub trait AssetStore: Send + Sync {
    /// Store one image's bytes for a product and return its final address
    async fn upload(&self, bytes: Vec<u8>, product_id: i64, index: usize) -> Result<StoredImage>;
}

/// Response body returned by the asset store on a successful PUT
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    format: Option<String>,
}

/// Production [`AssetStore`] backed by an HTTP object store
pub struct HttpAssetStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl HttpAssetStore {
    /// Create a store from the shared HTTP client and its config section
    pub fn new(client: reqwest::Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    /// Deterministic object path for a product image
    fn object_path(&self, product_id: i64, index: usize) -> String {
        format!(
            "{}/{}/{}/{}.jpg",
            self.config.endpoint.trim_end_matches('/'),
            self.config.bucket,
            product_id,
            index
        )
    }
}

#[async_trait::async_trait]
impl AssetStore for HttpAssetStore {
    async fn upload(&self, bytes: Vec<u8>, product_id: i64, index: usize) -> Result<StoredImage> {
        let byte_count = bytes.len() as u64;
        let response = self
            .client
            .put(self.object_path(product_id, index))
            .header("content-type", "image/jpeg")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(UploadError::Unavailable {
                status: status.as_u16(),
            }
            .into());
        }
        if status.is_client_error() {
            let reason = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                product_id,
                index,
                reason,
            }
            .into());
        }

        let body: UploadResponse = response.json().await.map_err(|_| {
            UploadError::MissingAddress { product_id, index }
        })?;

        let url = body
            .url
            .filter(|u| !u.is_empty())
            .ok_or(UploadError::MissingAddress { product_id, index })?;

        Ok(StoredImage {
            url,
            width: body.width,
            height: body.height,
            bytes: byte_count,
            format: body.format.unwrap_or_else(|| "jpeg".to_string()),
        })
    }
}
