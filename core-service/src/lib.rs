//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] into the library-sync core:
//! it resolves the HTTP client, selects the platform binding once by
//! [`PlatformKind`], builds the catalog search client and the event bus, and
//! hands out one [`SyncReviewSession`] per review page. Platform bindings are
//! behind the `steam` and `playstation` features; desktop hosts enable
//! `desktop-shims` to get a `reqwest` client by default.

pub mod error;

pub use error::{CoreError, Result};

pub use core_runtime::config::{CoreConfig, CoreConfigBuilder};
pub use core_runtime::events::{CoreEvent, EventBus, Notification, SyncEvent};
pub use core_sync::{
    Bucket, BulkActionCoordinator, BulkOutcome, LoadOutcome, ManualMatchResolver, ResyncOutcome,
    ReviewView, SessionSettings, SortKey, SyncError, SyncReviewSession,
};

use std::sync::Arc;

use bridge_traits::{CatalogSearch, HttpClient, LibraryPlatform, PlatformKind};
use core_catalog::HttpCatalogClient;
use tracing::info;

/// Aggregated handle to the collaborators every session shares.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub platform: Arc<dyn LibraryPlatform>,
    pub catalog: Arc<dyn CatalogSearch>,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    deps: Arc<CoreDependencies>,
    events: EventBus,
}

impl CoreService {
    /// Create a service from explicit collaborators.
    pub fn new(config: CoreConfig, deps: CoreDependencies) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        Self {
            config: Arc::new(config),
            deps: Arc::new(deps),
            events,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Access the collaborators being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn platform(&self) -> PlatformKind {
        self.deps.platform.kind()
    }

    /// Start a fresh review session. Sessions share nothing but the event bus.
    pub fn open_session(&self) -> SyncReviewSession {
        SyncReviewSession::new(
            self.deps.platform.clone(),
            self.deps.catalog.clone(),
            self.events.clone(),
            session_settings(&self.config),
        )
    }
}

/// Validate `config` and wire every collaborator it names.
///
/// ```ignore
/// use core_service::{bootstrap, CoreConfig};
/// use bridge_traits::PlatformKind;
///
/// let core = bootstrap(
///     CoreConfig::builder()
///         .api_base_url("https://api.example.com")
///         .platform(PlatformKind::Steam)
///         .build()?,
/// )?;
/// let session = core.open_session();
/// session.load(false).await?;
/// ```
pub fn bootstrap(config: CoreConfig) -> Result<CoreService> {
    config.validate()?;

    let http_client = config
        .http_client
        .clone()
        .ok_or(CoreError::HttpClientMissing)?;

    let platform = select_platform(&config, http_client.clone())?;
    let catalog: Arc<dyn CatalogSearch> = Arc::new(HttpCatalogClient::new(
        http_client.clone(),
        config.api_base_url.clone(),
        config.access_token.clone(),
    ));

    info!(
        platform = %config.platform,
        api_base_url = %config.api_base_url,
        "Core service bootstrapped"
    );

    Ok(CoreService::new(
        config,
        CoreDependencies {
            http_client,
            platform,
            catalog,
        },
    ))
}

fn session_settings(config: &CoreConfig) -> SessionSettings {
    SessionSettings {
        list_type: config.default_list_type,
        include_hidden: config.include_hidden,
        search_debounce: config.search_debounce,
        search_limit: config.search_limit,
    }
}

fn select_platform(
    config: &CoreConfig,
    http_client: Arc<dyn HttpClient>,
) -> Result<Arc<dyn LibraryPlatform>> {
    #[cfg(not(any(feature = "steam", feature = "playstation")))]
    let _ = &http_client;

    match config.platform {
        #[cfg(feature = "steam")]
        PlatformKind::Steam => Ok(Arc::new(provider_steam::SteamLibraryConnector::new(
            http_client,
            config.api_base_url.clone(),
            config.access_token.clone(),
        ))),
        #[cfg(feature = "playstation")]
        PlatformKind::PlayStation => Ok(Arc::new(
            provider_playstation::PlayStationLibraryConnector::new(
                http_client,
                config.api_base_url.clone(),
                config.access_token.clone(),
            ),
        )),
        #[allow(unreachable_patterns)]
        platform => Err(CoreError::PlatformNotCompiled { platform }),
    }
}

#[cfg(all(test, feature = "steam", feature = "playstation"))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn config(platform: PlatformKind, http: MockHttpClient) -> CoreConfig {
        CoreConfig::builder()
            .api_base_url("https://api.example.com/")
            .platform(platform)
            .access_token("token")
            .http_client(Arc::new(http))
            .build()
            .unwrap()
    }

    fn json(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_bootstrap_selects_platform_once() {
        let core = bootstrap(config(PlatformKind::PlayStation, MockHttpClient::new())).unwrap();
        assert_eq!(core.platform(), PlatformKind::PlayStation);
        assert_eq!(core.open_session().platform_kind(), PlatformKind::PlayStation);
    }

    #[test]
    fn test_session_settings_follow_config() {
        let core = bootstrap(config(PlatformKind::Steam, MockHttpClient::new())).unwrap();
        let session = core.open_session();
        assert_eq!(session.settings().search_limit, 10);
        assert!(session.settings().include_hidden);
        assert_ne!(core.open_session().id(), session.id());
    }

    #[tokio::test]
    async fn test_session_loads_through_steam_binding() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req: &HttpRequest| {
                req.url == "https://api.example.com/steam/library?include_hidden=true"
            })
            .times(1)
            .returning(|_| Ok(json(200, "[]")));

        let core = bootstrap(config(PlatformKind::Steam, http)).unwrap();
        let session = core.open_session();
        let mut rx = core.events().subscribe();

        let outcome = session.load(false).await.unwrap();

        assert_eq!(outcome, LoadOutcome::Loaded { count: 0 });
        assert!(session.view().needs_sync);
        assert!(matches!(
            rx.try_recv().unwrap(),
            CoreEvent::Sync(SyncEvent::LibraryLoaded { candidates: 0, .. })
        ));
    }

    #[test]
    fn test_missing_transport_is_reported() {
        let mut config = config(PlatformKind::Steam, MockHttpClient::new());
        config.http_client = None;
        let err = bootstrap(config).err().unwrap();
        assert!(matches!(err, CoreError::HttpClientMissing));
        assert!(err.to_string().contains("desktop-shims"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = config(PlatformKind::Steam, MockHttpClient::new());
        config.search_limit = 0;
        assert!(matches!(bootstrap(config), Err(CoreError::Runtime(_))));
    }
}
