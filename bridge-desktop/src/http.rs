//! `HttpClient` backed by reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Transport timeout applied when no explicit one is configured
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pooled reqwest client. One attempt per request, never retried here.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("shelf-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("reqwest client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap a client the host already configured (proxies, custom roots).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn prepare(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        let builder = request
            .headers
            .into_iter()
            .fold(builder, |builder, (key, value)| builder.header(key, value));

        match request.body {
            Some(body) => builder.body(body),
            None => builder,
        }
    }
}

fn transport_error(path: &str, error: reqwest::Error) -> BridgeError {
    if error.is_timeout() {
        BridgeError::Timeout(path.to_string())
    } else if error.is_connect() {
        BridgeError::OperationFailed(format!("cannot reach {}: {}", path, error))
    } else {
        BridgeError::OperationFailed(format!("{} failed: {}", path, error))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method;
        let path = request.path().to_string();
        debug!(%method, path = %path, "Sending backend request");

        let response = self
            .prepare(request)
            .send()
            .await
            .map_err(|e| {
                warn!(%method, path = %path, error = %e, "Backend unreachable");
                transport_error(&path, e)
            })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&path, e))?;

        debug!(%method, path = %path, status, bytes = body.len(), "Backend responded");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(ReqwestHttpClient::new().is_ok());
        assert!(ReqwestHttpClient::with_timeout(Duration::from_millis(500)).is_ok());
    }

    #[test]
    fn test_prepare_post_carries_token_and_json() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::post("https://api.example.com/steam/fix")
            .maybe_bearer_token(Some("secret"))
            .json(&serde_json::json!({ "platform_id": "p1", "catalog_id": 7 }))
            .unwrap();

        let built = client.prepare(request).build().unwrap();
        assert_eq!(built.method(), reqwest::Method::POST);
        assert_eq!(built.headers().get("Authorization").unwrap(), "Bearer secret");
        assert_eq!(built.headers().get("Content-Type").unwrap(), "application/json");
        assert!(built.body().is_some());
    }

    #[test]
    fn test_prepare_get_keeps_query() {
        let client = ReqwestHttpClient::new().unwrap();
        let built = client
            .prepare(HttpRequest::get(
                "https://api.example.com/games/search?q=hades&limit=10",
            ))
            .build()
            .unwrap();

        assert_eq!(built.method(), reqwest::Method::GET);
        assert_eq!(built.url().query(), Some("q=hades&limit=10"));
        assert!(built.body().is_none());
    }
}
