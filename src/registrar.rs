//! Backend registration collaborator
//!
//! Sends the full set of stored image addresses for one product in a
//! single call. An acknowledged 4xx is a client rejection and is never
//! retried; server-side failures are left retryable for the pipeline's
//! retry wrapper.

use crate::config::BackendConfig;
use crate::error::{RegisterError, Result};
use crate::types::StoredImage;

/// Abstraction over registering stored images against a product
#[async_trait::async_trait]
pub trait Registrar: Send + Sync {
    /// Register every stored image address for one product
    async fn register(&self, product_id: i64, images: &[StoredImage]) -> Result<()>;
}

/// Production [`Registrar`] backed by the catalog backend's HTTP API
pub struct HttpRegistrar {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpRegistrar {
    /// Create a registrar from the shared HTTP client and its config section
    pub fn new(client: reqwest::Client, config: BackendConfig) -> Self {
        Self { client, config }
    }

    fn register_url(&self, product_id: i64) -> String {
        format!(
            "{}/products/{}/images",
            self.config.endpoint.trim_end_matches('/'),
            product_id
        )
    }
}

#[async_trait::async_trait]
impl Registrar for HttpRegistrar {
    async fn register(&self, product_id: i64, images: &[StoredImage]) -> Result<()> {
        let urls: Vec<&str> = images.iter().map(|i| i.url.as_str()).collect();
        let response = self
            .client
            .post(self.register_url(product_id))
            .json(&serde_json::json!({ "images": urls }))
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(RegisterError::Unavailable {
                status: status.as_u16(),
            }
            .into());
        }
        if status.is_client_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(RegisterError::ClientRejected {
                product_id,
                status: status.as_u16(),
                message,
            }
            .into());
        }

        tracing::debug!(product_id, count = images.len(), "registered images");
        Ok(())
    }
}
