//! Catalog Search Abstraction
//!
//! The application's own game catalog is an external collaborator; the core
//! only needs free-text search to let a user fix a mismatched import.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One catalog entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMatch {
    pub catalog_id: u64,
    pub name: String,
    pub cover_url: Option<String>,
    pub release_date: Option<String>,
}

/// Free-text search against the game catalog
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Search games by name, returning at most `limit` results
    async fn search_games(&self, query: &str, limit: u32) -> Result<Vec<CatalogMatch>>;
}
