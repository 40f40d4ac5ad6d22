//! Static dataset loading
//!
//! The product list and the category query map are plain JSON files read
//! once at startup. A category missing from the map is not an error: the
//! query is synthesized from the slug and a warning is logged.

use crate::error::{Error, Result};
use crate::types::Product;
use std::collections::HashMap;
use std::path::Path;

/// Load the product dataset from a JSON array file
pub fn load_products(path: &Path) -> Result<Vec<Product>> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Dataset {
        message: format!("could not read product dataset: {e}"),
        path: path.to_path_buf(),
    })?;
    let products: Vec<Product> = serde_json::from_str(&contents).map_err(|e| Error::Dataset {
        message: format!("could not parse product dataset: {e}"),
        path: path.to_path_buf(),
    })?;
    if products.is_empty() {
        return Err(Error::Dataset {
            message: "product dataset is empty".to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(products)
}

/// Mapping from category slug to a category-specific search query
#[derive(Clone, Debug, Default)]
pub struct CategoryQueries {
    queries: HashMap<String, String>,
}

impl CategoryQueries {
    /// Build from an in-memory map (used by tests and embedders)
    pub fn new(queries: HashMap<String, String>) -> Self {
        Self { queries }
    }

    /// Load the category query map from a JSON object file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Dataset {
            message: format!("could not read category map: {e}"),
            path: path.to_path_buf(),
        })?;
        let queries: HashMap<String, String> =
            serde_json::from_str(&contents).map_err(|e| Error::Dataset {
                message: format!("could not parse category map: {e}"),
                path: path.to_path_buf(),
            })?;
        Ok(Self { queries })
    }

    /// Resolve the search query for a category slug
    ///
    /// Falls back to a query synthesized from the slug when no mapping
    /// exists; the miss is logged as a warning, not treated as an error.
    pub fn query_for(&self, category: &str) -> String {
        match self.queries.get(category) {
            Some(query) => query.clone(),
            None => {
                let fallback = synthesize_query(category);
                tracing::warn!(
                    category,
                    fallback = %fallback,
                    "no query mapped for category, using synthesized fallback"
                );
                fallback
            }
        }
    }
}

/// Derive a generic search query from a category slug
fn synthesize_query(category: &str) -> String {
    let words = category.replace(['-', '_'], " ");
    format!("{} product photo", words.trim())
}
