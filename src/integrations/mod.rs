//! Outbound HTTP plumbing and concrete capability adapters.
//!
//! - [`HttpDispatcher`] is the seam executors call through; [`ReqwestDispatcher`]
//!   is the production implementation.
//! - [`auth`] holds token refreshers for the providers below.
//! - One module per supported provider, each exposing a
//!   [`CapabilityAdapter`](crate::agents::CapabilityAdapter).

pub mod auth;
pub mod google_calendar;
pub mod google_drive;
pub mod outlook;
pub mod rest;
pub mod zoom;

use crate::types::{AppError, HttpMethod, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

pub use auth::{
    ClientAuth, ClientCredentials, GoogleProxyRefresher, OAuthRefresher, StaticToken,
    TokenRefresher,
};
pub use google_calendar::GoogleCalendarAdapter;
pub use google_drive::GoogleDriveAdapter;
pub use outlook::OutlookAdapter;
pub use rest::GenericRestAdapter;
pub use zoom::ZoomAdapter;

/// A single fully-resolved outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
}

impl OutboundRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            query: Vec::new(),
            bearer: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

/// Performs outbound calls and returns the decoded response body.
#[async_trait]
pub trait HttpDispatcher: Send + Sync {
    /// An empty response body decodes to [`Value::Null`].
    async fn call(&self, request: OutboundRequest) -> Result<Value>;
}

/// `reqwest`-backed dispatcher with a per-request timeout.
#[derive(Clone)]
pub struct ReqwestDispatcher {
    client: reqwest::Client,
}

impl ReqwestDispatcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpDispatcher for ReqwestDispatcher {
    async fn call(&self, request: OutboundRequest) -> Result<Value> {
        let OutboundRequest {
            method,
            url,
            body,
            query,
            bearer,
        } = request;

        tracing::debug!(method = %method, url = %url, "Dispatching request");

        let mut builder = self.client.request(method.to_reqwest(), &url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Dispatch(format!("{} {} failed: {}", method, url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Dispatch(format!("Failed to read response from {}: {}", url, e)))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::Auth(format!(
                "{} {} returned {}: {}",
                method, url, status, text
            )));
        }
        if !status.is_success() {
            return Err(AppError::Dispatch(format!(
                "{} {} returned {}: {}",
                method, url, status, text
            )));
        }

        Ok(decode_body(&text))
    }
}

/// Decode a response body. Non-JSON text is kept as a string value.
pub fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Join a possibly relative endpoint onto a base URL.
pub fn join_url(base_url: Option<&str>, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    match base_url {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        ),
        None => endpoint.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(""), Value::Null);
        assert_eq!(decode_body("  \n"), Value::Null);
        assert_eq!(decode_body(r#"{"id": 1}"#), json!({"id": 1}));
        assert_eq!(decode_body("accepted"), json!("accepted"));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url(Some("https://api.zoom.us/v2/"), "/users/me/meetings"),
            "https://api.zoom.us/v2/users/me/meetings"
        );
        assert_eq!(
            join_url(Some("https://api.zoom.us/v2"), "https://example.com/x"),
            "https://example.com/x"
        );
        assert_eq!(join_url(None, "/events"), "/events");
    }

    #[test]
    fn test_outbound_request_builder() {
        let request = OutboundRequest::new(HttpMethod::Post, "https://example.com")
            .with_body(json!({"a": 1}))
            .with_bearer(Some("tok".to_string()));

        assert_eq!(request.body, Some(json!({"a": 1})));
        assert_eq!(request.bearer.as_deref(), Some("tok"));
        assert!(request.query.is_empty());
    }
}
