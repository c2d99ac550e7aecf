//! Steam library connector implementation
//!
//! Implements the `LibraryPlatform` trait over the backend's `/steam/*` routes.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::library::{
    is_not_linked_message, ImportCandidate, ImportItem, LibraryPlatform, ManualMatch,
    PlatformKind, ResyncSummary,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::SteamError;
use crate::types::{SteamGame, SteamSyncResponse};

/// Steam library connector
///
/// Stateless apart from its configuration; every call is a single request
/// with no retry.
///
/// # Example
///
/// ```ignore
/// use provider_steam::SteamLibraryConnector;
/// use bridge_traits::library::LibraryPlatform;
///
/// let connector = SteamLibraryConnector::new(http_client, "https://api.example.com", None);
/// let library = connector.fetch_library(true).await?;
/// ```
pub struct SteamLibraryConnector {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    access_token: Option<String>,
}

impl SteamLibraryConnector {
    /// Create a new Steam connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `base_url` - Backend base URL without trailing slash
    /// * `access_token` - Optional bearer token for the backend
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

    fn endpoint(&self, path: &str) -> String {
        format!("{}/steam/{}", self.base_url, path)
    }

    fn get(&self, url: String) -> HttpRequest {
        self.authorized(HttpRequest::get(url))
    }

    fn post(&self, url: String) -> HttpRequest {
        self.authorized(HttpRequest::post(url))
    }

    fn authorized(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("Accept", "application/json")
            .maybe_bearer_token(self.access_token.as_deref())
    }

    fn parse_timestamp(rfc3339: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Convert a backend record to the shared candidate model
    fn convert_game(game: SteamGame) -> ImportCandidate {
        let last_played_at = game.last_played_at.as_deref().and_then(|raw| {
            let parsed = Self::parse_timestamp(raw);
            if parsed.is_none() {
                debug!(steam_app_id = game.steam_app_id, raw, "Ignoring malformed last_played_at");
            }
            parsed
        });

        ImportCandidate {
            platform_id: game.steam_app_id.to_string(),
            catalog_id: game.igdb_id,
            platform_name: game.name,
            catalog_name: game.igdb_name,
            catalog_cover_url: game.igdb_cover_url,
            playtime_minutes: game.playtime_minutes,
            last_played_at,
            platform_category: None,
            match_confidence: game.match_confidence,
            match_method: game.match_method,
            status: game.status,
        }
    }

    /// Execute a request and map non-2xx responses to `SteamError`.
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            debug!(status = response.status, "Steam request succeeded");
            return Ok(response);
        }

        let detail = response.error_detail();
        warn!(status = response.status, detail = %detail, "Steam request failed");

        let error = if response.is_client_error() && is_not_linked_message(&detail) {
            SteamError::AccountNotLinked(detail)
        } else {
            SteamError::ApiError {
                status_code: response.status,
                message: detail,
            }
        };
        Err(error.into())
    }
}

#[async_trait]
impl LibraryPlatform for SteamLibraryConnector {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Steam
    }

    #[instrument(skip(self))]
    async fn fetch_library(&self, include_hidden: bool) -> Result<Vec<ImportCandidate>> {
        let url = self.endpoint(&format!("library?include_hidden={}", include_hidden));
        let response = self.send(self.get(url)).await?;

        let games: Vec<SteamGame> = response
            .json()
            .map_err(|e| SteamError::ParseError(e.to_string()))?;

        info!(count = games.len(), "Fetched Steam library");
        Ok(games.into_iter().map(Self::convert_game).collect())
    }

    #[instrument(skip(self))]
    async fn resync(&self) -> Result<ResyncSummary> {
        let response = self
            .send(self.post(self.endpoint("sync")))
            .await?;

        let body: SteamSyncResponse = response
            .json()
            .map_err(|e| SteamError::ParseError(e.to_string()))?;

        info!(new_count = body.new_count, "Steam library resynced");
        Ok(ResyncSummary {
            new_count: body.new_count,
        })
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn import_many(&self, items: &[ImportItem]) -> Result<()> {
        let request = self
            .post(self.endpoint("import"))
            .json(items)?;
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn skip(&self, platform_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("skip/{}", urlencoding::encode(platform_id)));
        self.send(self.post(url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn restore(&self, platform_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("restore/{}", urlencoding::encode(platform_id)));
        self.send(self.post(url)).await?;
        Ok(())
    }

    #[instrument(skip(self, manual_match), fields(platform_id = %manual_match.platform_id))]
    async fn set_manual_match(&self, manual_match: &ManualMatch) -> Result<()> {
        let request = self
            .post(self.endpoint("fix"))
            .json(manual_match)?;
        self.send(request).await?;
        Ok(())
    }
}
