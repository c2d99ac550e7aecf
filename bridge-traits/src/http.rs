//! HTTP Client Abstraction
//!
//! The request/response boundary shared by the platform bindings and the
//! catalog search client. The backend speaks JSON over two verbs: reads are
//! `GET` with query parameters, every mutation is a `POST`.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{BridgeError, Result};

/// Verbs the library backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Attach the session's bearer token when the host configured one.
    pub fn maybe_bearer_token(self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.header("Authorization", format!("Bearer {}", token)),
            None => self,
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)
            .map_err(|e| BridgeError::Decode(format!("request body: {}", e)))?;
        self.body = Some(Bytes::from(encoded));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// URL without its query string. Search terms and ids stay out of logs.
    pub fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

impl HttpResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::Decode(format!("HTTP {} body: {}", self.status, e)))
    }

    /// Best-effort human readable error message.
    ///
    /// Backend errors arrive as `{"detail": "..."}`; anything else is returned
    /// as lossy text, falling back to the status code for empty bodies.
    pub fn error_detail(&self) -> String {
        if let Ok(body) = serde_json::from_slice::<ErrorBody>(&self.body) {
            return body.detail;
        }
        let text = String::from_utf8_lossy(&self.body).trim().to_string();
        if text.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            text
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx: the request itself was rejected (bad id, unlinked account).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Async HTTP transport supplied by the host.
///
/// Implementations perform exactly one attempt per call. Retrying is a user
/// action, never something the transport does silently.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute a request.
    ///
    /// Non-2xx responses are returned as `Ok`; callers decide how to map
    /// them. `Err` means no response was received at all.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_get_with_token() {
        let request = HttpRequest::get("https://api.example.com/steam/library?include_hidden=true")
            .maybe_bearer_token(Some("secret"));

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer secret")
        );
        assert_eq!(request.path(), "https://api.example.com/steam/library");
    }

    #[test]
    fn test_missing_token_sends_no_authorization() {
        let request = HttpRequest::post("https://api.example.com/steam/sync").maybe_bearer_token(None);
        assert!(!request.headers.contains_key("Authorization"));
        assert_eq!(request.path(), "https://api.example.com/steam/sync");
        assert_eq!(request.method.to_string(), "POST");
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = HttpRequest::post("https://api.example.com/steam/import")
            .json(&serde_json::json!({ "platform_id": "p1" }))
            .unwrap();

        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.body.unwrap(), Bytes::from(r#"{"platform_id":"p1"}"#));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let err = response(200, "<html>").json::<Vec<String>>().unwrap_err();
        assert!(matches!(err, BridgeError::Decode(_)));
    }

    #[test]
    fn test_status_classes() {
        assert!(response(204, "").is_success());
        assert!(response(409, "").is_client_error());
        assert!(!response(502, "").is_client_error());
    }

    #[test]
    fn test_error_detail_prefers_json_detail() {
        assert_eq!(
            response(400, r#"{"detail":"Steam account not linked"}"#).error_detail(),
            "Steam account not linked"
        );
        assert_eq!(response(502, "bad gateway").error_detail(), "bad gateway");
        assert_eq!(response(500, "").error_detail(), "HTTP 500");
    }
}
