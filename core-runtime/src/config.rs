//! # Core Configuration Module
//!
//! Provides configuration management for the library-sync core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the backend location, the selected external platform
//! and the tunables of the review workflow. `build()` validates eagerly so a
//! misconfigured host fails at startup rather than on the first request.
//!
//! ## Required Settings
//!
//! - API base URL of the backend collaborator
//! - Platform (`steam` or `psn`)
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//!
//! When the `desktop-shims` feature is enabled, a `ReqwestHttpClient` is
//! injected automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::PlatformKind;
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.example.com")
//!     .platform(PlatformKind::Steam)
//!     .access_token("session-token")
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! [`CoreConfig::from_env`] reads `SHELF_API_URL`, `SHELF_PLATFORM`,
//! `SHELF_API_TOKEN`, `SHELF_SEARCH_DEBOUNCE_MS` and `SHELF_SEARCH_LIMIT`.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HttpClient, ListType, PlatformKind};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default delay between the last keystroke and a catalog search
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default number of catalog results requested per search
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Upper bound accepted for the catalog search limit
const MAX_SEARCH_LIMIT: u32 = 50;

/// Default transport timeout for the desktop HTTP client
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Core configuration for the library-sync core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Backend base URL, without trailing slash
    pub api_base_url: String,

    /// External platform this session reviews
    pub platform: PlatformKind,

    /// Bearer token for the backend (optional for cookie-authenticated hosts)
    pub access_token: Option<String>,

    /// HTTP client for making API requests (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Collection list used for imports
    pub default_list_type: ListType,

    /// Whether library fetches include hidden (skipped) titles
    pub include_hidden: bool,

    /// Debounce applied to catalog search-as-you-type
    pub search_debounce: Duration,

    /// Maximum catalog results per search
    pub search_limit: u32,

    /// Event bus buffer size
    pub event_buffer_size: usize,

    /// Transport timeout for the default HTTP client
    pub request_timeout: Duration,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("platform", &self.platform)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("default_list_type", &self.default_list_type)
            .field("include_hidden", &self.include_hidden)
            .field("search_debounce", &self.search_debounce)
            .field("search_limit", &self.search_limit)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builds a configuration from `SHELF_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(url) = lookup("SHELF_API_URL") {
            builder = builder.api_base_url(url);
        }

        if let Some(platform) = lookup("SHELF_PLATFORM") {
            let platform = platform
                .parse::<PlatformKind>()
                .map_err(|e| Error::Config(format!("SHELF_PLATFORM: {}", e)))?;
            builder = builder.platform(platform);
        }

        if let Some(token) = lookup("SHELF_API_TOKEN").filter(|t| !t.is_empty()) {
            builder = builder.access_token(token);
        }

        if let Some(ms) = lookup("SHELF_SEARCH_DEBOUNCE_MS") {
            let ms = ms.parse::<u64>().map_err(|e| {
                Error::Config(format!("SHELF_SEARCH_DEBOUNCE_MS must be an integer: {}", e))
            })?;
            builder = builder.search_debounce(Duration::from_millis(ms));
        }

        if let Some(limit) = lookup("SHELF_SEARCH_LIMIT") {
            let limit = limit.parse::<u32>().map_err(|e| {
                Error::Config(format!("SHELF_SEARCH_LIMIT must be an integer: {}", e))
            })?;
            builder = builder.search_limit(limit);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The API base URL is an absolute http(s) URL
    /// - The search limit is within `1..=50`
    /// - The event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_base_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.search_limit == 0 || self.search_limit > MAX_SEARCH_LIMIT {
            return Err(Error::Config(format!(
                "Search limit must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Option<Arc<dyn HttpClient>>> {
    // Non-desktop hosts inject their own client; the service layer fails fast
    // if none was provided.
    Ok(None)
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Option<Arc<dyn HttpClient>>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout)?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(Some(client))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    platform: Option<PlatformKind>,
    access_token: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    default_list_type: Option<ListType>,
    include_hidden: Option<bool>,
    search_debounce: Option<Duration>,
    search_limit: Option<u32>,
    event_buffer_size: Option<usize>,
    request_timeout: Option<Duration>,
}

impl CoreConfigBuilder {
    /// Sets the backend base URL (trailing slashes are trimmed).
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the external platform to review.
    pub fn platform(mut self, platform: PlatformKind) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Sets the backend bearer token.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Injects a custom HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the collection list used when importing (default: played).
    pub fn default_list_type(mut self, list_type: ListType) -> Self {
        self.default_list_type = Some(list_type);
        self
    }

    /// Whether library fetches include skipped titles (default: true).
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = Some(include);
        self
    }

    /// Sets the catalog search debounce (default: 300 ms).
    pub fn search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = Some(debounce);
        self
    }

    /// Sets the catalog search result limit (default: 10).
    pub fn search_limit(mut self, limit: u32) -> Self {
        self.search_limit = Some(limit);
        self
    }

    /// Sets the event bus buffer size (default: 100).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the transport timeout for the default HTTP client (default: 30 s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The API base URL or platform is missing
    /// - Configuration values are invalid
    /// - The default HTTP client cannot be created
    pub fn build(self) -> Result<CoreConfig> {
        let api_base_url = self.api_base_url.ok_or_else(|| {
            Error::Config("API base URL is required. Use .api_base_url() to set it.".to_string())
        })?;

        let platform = self.platform.ok_or_else(|| {
            Error::Config("Platform is required. Use .platform() to set it.".to_string())
        })?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => Some(client),
            None => provide_default_http_client(request_timeout)?,
        };

        let config = CoreConfig {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            platform,
            access_token: self.access_token,
            http_client,
            default_list_type: self.default_list_type.unwrap_or_default(),
            include_hidden: self.include_hidden.unwrap_or(true),
            search_debounce: self.search_debounce.unwrap_or(DEFAULT_SEARCH_DEBOUNCE),
            search_limit: self.search_limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            request_timeout,
        };

        config.validate()?;

        Ok(config)
    }
}
