//! Catalog search client
//!
//! ## API Endpoint
//!
//! - **Search**: `GET {base}/search?query={query}&category=games&limit={limit}`
//!
//! The endpoint returns an array of `{catalog_id, name, cover_url, release_date}`.
//! Requests are single-shot; superseded searches are discarded by the caller
//! rather than cancelled here.

use crate::error::CatalogError;
use async_trait::async_trait;
use bridge_traits::catalog::{CatalogMatch, CatalogSearch};
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Catalog category searched by the review flow
const SEARCH_CATEGORY: &str = "games";

/// HTTP implementation of [`CatalogSearch`]
pub struct HttpCatalogClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    access_token: Option<String>,
}

impl HttpCatalogClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn search_url(&self, query: &str, limit: u32) -> String {
        format!(
            "{}/search?query={}&category={}&limit={}",
            self.base_url,
            urlencoding::encode(query),
            SEARCH_CATEGORY,
            limit
        )
    }
}

#[async_trait]
impl CatalogSearch for HttpCatalogClient {
    #[instrument(skip(self))]
    async fn search_games(&self, query: &str, limit: u32) -> Result<Vec<CatalogMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let request = HttpRequest::get(self.search_url(query, limit))
            .header("Accept", "application/json")
            .maybe_bearer_token(self.access_token.as_deref());

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            let message = response.error_detail();
            warn!(status = response.status, %message, "Catalog search failed");
            return Err(CatalogError::SearchFailed {
                status_code: response.status,
                message,
            }
            .into());
        }

        let matches: Vec<CatalogMatch> = response
            .json()
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;

        debug!(results = matches.len(), "Catalog search completed");
        Ok(matches)
    }
}
