use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::{with_read_retry, RetryPolicy, StingrayError};

/// A response with its body fully read, kept for error reporting.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// The scan service answers reads with 200 and creations with 201.
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 201)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body; a body that is not the expected payload is fatal.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, StingrayError> {
        serde_json::from_slice(&self.body).map_err(|e| StingrayError::Decode {
            url: self.url.clone(),
            status: self.status,
            reason: e.to_string(),
        })
    }

    /// The service's `message` field, falling back to `N/A`.
    pub fn service_message(&self) -> String {
        serde_json::from_slice::<Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| "N/A".to_string())
    }

    /// Turn a non-success response into a transport error.
    pub fn error_for_status(self) -> Result<Self, StingrayError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(StingrayError::Transport {
                body: self.service_message_or_text(),
                url: self.url,
                status: self.status,
            })
        }
    }

    fn service_message_or_text(&self) -> String {
        let message = self.service_message();
        if message == "N/A" {
            self.text()
        } else {
            message
        }
    }
}

/// Thin wrapper over `reqwest` holding the base URL, auth header and the
/// read retry policy shared by both transports.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    auth_header: &'static str,
    auth_value: String,
    retry: RetryPolicy,
}

impl RestClient {
    pub fn new(
        base_url: &str,
        auth_header: &'static str,
        auth_value: String,
        retry: RetryPolicy,
    ) -> Result<Self, StingrayError> {
        let client = Client::builder()
            .user_agent(concat!("stingray-scan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StingrayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            auth_value,
            retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, url: String, request: RequestBuilder) -> Result<RawResponse, StingrayError> {
        let response = request
            .header(self.auth_header, &self.auth_value)
            .send()
            .await
            .map_err(|e| StingrayError::Network(format!("Request to {} failed: {}", url, e)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| StingrayError::Network(format!("Failed to read body from {}: {}", url, e)))?
            .to_vec();
        debug!(url = %url, status, bytes = body.len(), "Service response");
        Ok(RawResponse { url, status, body })
    }

    /// GET with the read retry policy. After the last attempt the final
    /// response is returned whatever its status.
    pub async fn get(&self, path: &str) -> Result<RawResponse, StingrayError> {
        let url = self.url(path);
        with_read_retry(&url, &self.retry, RawResponse::is_success, || {
            self.send(url.clone(), self.client.get(&url))
        })
        .await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<RawResponse, StingrayError> {
        let url = self.url(path);
        let request = self.client.post(&url).json(body);
        self.send(url, request).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<RawResponse, StingrayError> {
        let url = self.url(path);
        let request = self.client.post(&url);
        self.send(url, request).await
    }

    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<RawResponse, StingrayError> {
        let url = self.url(path);
        let request = self.client.post(&url).multipart(form);
        self.send(url, request).await
    }
}

/// Build the multipart part carrying the binary under its file name.
pub async fn file_part(path: &Path) -> Result<Part, StingrayError> {
    let data = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("application")
        .to_string();
    Ok(Part::bytes(data).file_name(file_name))
}

/// Extract a non-empty `id` field from a creation response.
pub fn created_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
