//! Thin authenticated JSON client shared by the platform adapters.

use crate::error::{PlatformError, PlatformResult};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(15);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Bearer-token client rooted at one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("miniploy/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticated request builder with a fixed timeout.
    pub fn request(&self, method: Method, path: &str, timeout: Duration) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .timeout(timeout)
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> PlatformResult<Value> {
        self.send(self.request(Method::GET, path, READ_TIMEOUT).query(query))
            .await
    }

    pub async fn post_json(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> PlatformResult<Value> {
        self.send(
            self.request(Method::POST, path, WRITE_TIMEOUT)
                .query(query)
                .json(body),
        )
        .await
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> PlatformResult<Value> {
        self.send(self.request(Method::PUT, path, WRITE_TIMEOUT).json(body))
            .await
    }

    /// Send a request, turning non-2xx answers into [`PlatformError::Api`].
    /// An empty success body comes back as `Value::Null`.
    pub async fn send(&self, request: RequestBuilder) -> PlatformResult<Value> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }

    /// Run a GraphQL operation against the base URL and return its `data`.
    pub async fn graphql(&self, query: &str, variables: Option<Value>) -> PlatformResult<Value> {
        let mut payload = serde_json::json!({ "query": query });
        if let Some(variables) = variables {
            payload["variables"] = variables;
        }

        let result = self
            .send(
                self.request(Method::POST, "", WRITE_TIMEOUT)
                    .json(&payload),
            )
            .await?;

        if let Some(errors) = result.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let message = errors[0]["message"]
                    .as_str()
                    .unwrap_or("Unknown error")
                    .to_string();
                return Err(PlatformError::GraphQl(message));
            }
        }

        match result.get("data") {
            Some(data) if !data.is_null() => Ok(data.clone()),
            _ => Err(PlatformError::InvalidResponse(
                "missing data in GraphQL response".to_string(),
            )),
        }
    }
}

/// Build an API error from a failed response, preferring the platform's
/// own message field over the raw body.
pub async fn api_error(response: Response) -> PlatformError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    PlatformError::Api {
        status,
        message: extract_message(&body),
    }
}

fn extract_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    let message = [
        value.pointer("/error/message"),
        value.get("message"),
        value.get("error"),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| v.as_str().map(str::to_string))
    .unwrap_or_else(|| body.trim().to_string());
    message
}

/// String field, treating null and empty strings as absent.
pub fn str_field(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `YYYY-MM-DD HH:MM` for an RFC 3339 timestamp; anything else is kept as-is.
pub fn short_timestamp(raw: String) -> String {
    chrono::DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or(raw)
}

/// Prefix a bare hostname with `https://`.
pub fn https_url(host_or_url: &str) -> String {
    if host_or_url.starts_with("http://") || host_or_url.starts_with("https://") {
        host_or_url.to_string()
    } else {
        format!("https://{}", host_or_url)
    }
}
