//! Error types for catalog-media
//!
//! One top-level [`Error`] enum with domain-specific sub-enums for each
//! pipeline stage. The split matters for retry classification: transient
//! transport failures are retried, acknowledged rejections are not, and
//! integrity violations detected by the pipeline itself are terminal for
//! the item regardless of retry budget.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog-media operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for catalog-media
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable description of the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "source.endpoint")
        key: Option<String>,
    },

    /// Image search failed
    #[error("image source error: {0}")]
    Source(#[from] SourceError),

    /// Asset upload failed
    #[error("asset store error: {0}")]
    Upload(#[from] UploadError),

    /// Backend registration failed
    #[error("registration error: {0}")]
    Register(#[from] RegisterError),

    /// Integrity violation detected by the item pipeline
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Failure manifest could not be read or written
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Product dataset or category map could not be loaded
    #[error("dataset error: {message} ({path})")]
    Dataset {
        /// What went wrong while loading
        message: String,
        /// The file that failed to load
        path: PathBuf,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Image search service errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// The service throttled the request (HTTP 429)
    #[error("rate limited by image source")]
    RateLimited,

    /// The service returned a server-side failure
    #[error("image source unavailable (status {status})")]
    Unavailable {
        /// HTTP status code returned by the service
        status: u16,
    },

    /// The service answered but the payload was not usable
    #[error("unexpected response from image source: {0}")]
    BadResponse(String),
}

/// Asset store errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// The store acknowledged the request and refused it
    #[error("upload rejected for product {product_id} image {index}: {reason}")]
    Rejected {
        /// Product the upload belonged to
        product_id: i64,
        /// Position of the image within the product's batch
        index: usize,
        /// Reason reported by the store
        reason: String,
    },

    /// The store accepted the bytes but returned no usable address
    #[error("asset store returned no address for product {product_id} image {index}")]
    MissingAddress {
        /// Product the upload belonged to
        product_id: i64,
        /// Position of the image within the product's batch
        index: usize,
    },

    /// The store returned a server-side failure
    #[error("asset store unavailable (status {status})")]
    Unavailable {
        /// HTTP status code returned by the store
        status: u16,
    },
}

/// Backend registration errors
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The backend acknowledged the request and refused it; retrying cannot help
    #[error("registration rejected for product {product_id} (status {status}): {message}")]
    ClientRejected {
        /// Product whose registration was rejected
        product_id: i64,
        /// HTTP status code (4xx)
        status: u16,
        /// Error body returned by the backend
        message: String,
    },

    /// The backend returned a server-side failure
    #[error("backend unavailable (status {status})")]
    Unavailable {
        /// HTTP status code returned by the backend
        status: u16,
    },
}

/// Integrity violations raised by the item pipeline itself
///
/// These are terminal for the item and independent of any adapter's retry
/// behavior — the retries already happened inside the stage that produced
/// the inputs.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The search stage legitimately found nothing for this product
    #[error("no source images found for product {product_id} (query: {query:?})")]
    NoImagesFound {
        /// Product that had no candidates
        product_id: i64,
        /// The search query that came up empty
        query: String,
    },

    /// Fewer images were stored than were fetched
    #[error("partial upload for product {product_id}: {stored} of {expected} images stored")]
    PartialUpload {
        /// Product with the mismatch
        product_id: i64,
        /// Number of candidates returned by the search stage
        expected: usize,
        /// Number of images actually stored
        stored: usize,
    },
}

/// Failure manifest errors
#[derive(Debug, Error)]
pub enum ManifestError {
    /// No manifest exists at the configured path
    #[error("no failure manifest at {path}")]
    NotFound {
        /// Where the manifest was expected
        path: PathBuf,
    },

    /// The manifest exists but could not be parsed
    #[error("malformed failure manifest at {path}: {message}")]
    Malformed {
        /// The manifest file
        path: PathBuf,
        /// Parse error detail
        message: String,
    },

    /// Reading or writing the manifest file failed
    #[error("manifest I/O error at {path}: {source}")]
    Io {
        /// The manifest file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_render_with_context() {
        let err = Error::Source(SourceError::Unavailable { status: 503 });
        assert_eq!(
            err.to_string(),
            "image source error: image source unavailable (status 503)"
        );
    }

    #[test]
    fn partial_upload_reports_both_counts() {
        let err = Error::Pipeline(PipelineError::PartialUpload {
            product_id: 7,
            expected: 4,
            stored: 2,
        });
        let msg = err.to_string();
        assert!(msg.contains("product 7"));
        assert!(msg.contains("2 of 4"));
    }

    #[test]
    fn client_rejection_includes_backend_message() {
        let err = Error::Register(RegisterError::ClientRejected {
            product_id: 12,
            status: 422,
            message: "unknown product".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("status 422"));
        assert!(msg.contains("unknown product"));
    }

    #[test]
    fn manifest_not_found_names_the_path() {
        let err = Error::Manifest(ManifestError::NotFound {
            path: PathBuf::from("/tmp/failed.json"),
        });
        assert!(err.to_string().contains("/tmp/failed.json"));
    }

    #[test]
    fn io_errors_convert_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
