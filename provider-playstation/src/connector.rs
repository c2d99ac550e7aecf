//! PlayStation Network library connector
//!
//! Implements the `LibraryPlatform` trait over the backend's `/psn/*` routes.

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

use crate::error::PlayStationError;
use crate::types::{PsnSyncResponse, PsnTitle};

/// PlayStation Network library connector
///
/// # Example
///
/// ```ignore
/// use provider_playstation::PlayStationLibraryConnector;
///
/// let connector = PlayStationLibraryConnector::new(http_client, base_url, Some(token));
/// let summary = connector.resync().await?;
/// ```
pub struct PlayStationLibraryConnector {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    access_token: Option<String>,
}

impl PlayStationLibraryConnector {
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

    fn url(&self, path: &str) -> String {
        format!("{}/psn/{}", self.base_url, path)
    }

    fn title_url(&self, action: &str, title_id: &str) -> String {
        self.url(&format!("{}/{}", action, urlencoding::encode(title_id)))
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

    fn convert_title(title: PsnTitle) -> ImportCandidate {
        let last_played_at = title
            .last_played_date_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        ImportCandidate {
            platform_id: title.psn_title_id,
            catalog_id: title.igdb_id,
            platform_name: title.name,
            catalog_name: title.igdb_name,
            catalog_cover_url: title.igdb_cover_url,
            playtime_minutes: title.play_duration_minutes,
            last_played_at,
            platform_category: title.platform.filter(|p| !p.trim().is_empty()),
            match_confidence: title.match_confidence,
            match_method: title.match_method,
            status: title.status,
        }
    }

    /// Execute a request, turning non-2xx responses into `PlayStationError`.
    ///
    /// `title_id` identifies per-title routes so a 404 can name the title.
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn send(&self, request: HttpRequest, title_id: Option<&str>) -> Result<HttpResponse> {
        let response = self.http_client.execute(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        let detail = response.error_detail();
        warn!(status = response.status, detail = %detail, "PSN request failed");

        let error = match (response.status, title_id) {
            (status, _) if (400..500).contains(&status) && is_not_linked_message(&detail) => {
                PlayStationError::AccountNotLinked(detail)
            }
            (404, Some(title_id)) => PlayStationError::TitleNotFound {
                title_id: title_id.to_string(),
            },
            (status, _) => PlayStationError::ApiError {
                status_code: status,
                message: detail,
            },
        };
        Err(error.into())
    }
}

#[async_trait]
impl LibraryPlatform for PlayStationLibraryConnector {
    fn kind(&self) -> PlatformKind {
        PlatformKind::PlayStation
    }

    #[instrument(skip(self))]
    async fn fetch_library(&self, include_hidden: bool) -> Result<Vec<ImportCandidate>> {
        let url = self.url(&format!("library?include_hidden={}", include_hidden));
        let response = self.send(self.get(url), None).await?;

        let titles: Vec<PsnTitle> = response
            .json()
            .map_err(|e| PlayStationError::ParseError(e.to_string()))?;

        info!(count = titles.len(), "Fetched PSN library");
        Ok(titles.into_iter().map(Self::convert_title).collect())
    }

    #[instrument(skip(self))]
    async fn resync(&self) -> Result<ResyncSummary> {
        let response = self
            .send(self.post(self.url("sync")), None)
            .await?;
        let body: PsnSyncResponse = response
            .json()
            .map_err(|e| PlayStationError::ParseError(e.to_string()))?;

        info!(new_count = body.new_count, "PSN library resynced");
        Ok(ResyncSummary {
            new_count: body.new_count,
        })
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn import_many(&self, items: &[ImportItem]) -> Result<()> {
        let request = self.post(self.url("import")).json(items)?;
        self.send(request, None).await?;
        debug!("PSN import batch accepted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn skip(&self, platform_id: &str) -> Result<()> {
        let url = self.title_url("skip", platform_id);
        self.send(self.post(url), Some(platform_id))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn restore(&self, platform_id: &str) -> Result<()> {
        let url = self.title_url("restore", platform_id);
        self.send(self.post(url), Some(platform_id))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, manual_match), fields(platform_id = %manual_match.platform_id))]
    async fn set_manual_match(&self, manual_match: &ManualMatch) -> Result<()> {
        let request = self
            .post(self.url("fix"))
            .json(manual_match)?;
        self.send(request, Some(&manual_match.platform_id)).await?;
        Ok(())
    }
}
