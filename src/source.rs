//! Image search service collaborator
//!
//! [`ImageSource`] is the seam between the pipeline and whichever image
//! search service backs it. The HTTP implementation paginates through
//! search results up to a configured page cap and downloads candidate
//! bytes one at a time.

use crate::config::SourceConfig;
use crate::error::{Error, Result, SourceError};
use crate::types::ImageCandidate;
use serde::Deserialize;

/// Abstraction over candidate-image lookup and retrieval
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    /// Search for candidate images matching a category query
    ///
    /// Zero matches is a legitimate outcome and returns `Ok(vec![])`;
    /// only transport and service failures are errors.
    async fn search(&self, query: &str) -> Result<Vec<ImageCandidate>>;

    /// Fetch the bytes a candidate points at
    async fn download(&self, candidate: &ImageCandidate) -> Result<Vec<u8>>;
}

/// One page of search results as returned by the service
#[derive(Debug, Deserialize)]
struct SearchPage {
    /// How many pages the service reports for this query
    #[serde(default)]
    total_pages: u32,
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    id: Option<String>,
    url: String,
}

/// Production [`ImageSource`] backed by an HTTP search API
pub struct HttpImageSource {
    client: reqwest::Client,
    config: SourceConfig,
}

impl HttpImageSource {
    /// Create a source from the shared HTTP client and its config section
    pub fn new(client: reqwest::Client, config: SourceConfig) -> Self {
        Self { client, config }
    }

    async fn fetch_page(&self, query: &str, page: u32) -> Result<SearchPage> {
        let mut request = self.client.get(&self.config.endpoint).query(&[
            ("query", query.to_string()),
            ("page", page.to_string()),
            ("per_page", self.config.per_page.to_string()),
        ]);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SourceError::RateLimited.into());
        }
        if status.is_server_error() {
            return Err(SourceError::Unavailable {
                status: status.as_u16(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(SourceError::BadResponse(format!(
                "search returned status {status}"
            ))
            .into());
        }

        response
            .json::<SearchPage>()
            .await
            .map_err(|e| SourceError::BadResponse(format!("unparseable search page: {e}")).into())
    }
}

#[async_trait::async_trait]
impl ImageSource for HttpImageSource {
    async fn search(&self, query: &str) -> Result<Vec<ImageCandidate>> {
        let mut candidates = Vec::new();

        let first = self.fetch_page(query, 1).await?;
        // The service may report more pages than we are willing to walk
        let pages = first.total_pages.max(1).min(self.config.max_pages);
        let mut page_results = first.results;

        let mut page = 1;
        loop {
            candidates.extend(page_results.into_iter().map(|r| ImageCandidate {
                url: r.url,
                source_id: r.id,
            }));

            page += 1;
            if page > pages {
                break;
            }
            page_results = self.fetch_page(query, page).await?.results;
        }

        tracing::debug!(
            query,
            pages,
            count = candidates.len(),
            "image search complete"
        );
        Ok(candidates)
    }

    async fn download(&self, candidate: &ImageCandidate) -> Result<Vec<u8>> {
        let response = self.client.get(&candidate.url).send().await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(SourceError::Unavailable {
                status: status.as_u16(),
            }
            .into());
        }
        if !status.is_success() {
            return Err(SourceError::BadResponse(format!(
                "image download returned status {status}"
            ))
            .into());
        }
        let bytes = response.bytes().await.map_err(Error::Network)?;
        Ok(bytes.to_vec())
    }
}
