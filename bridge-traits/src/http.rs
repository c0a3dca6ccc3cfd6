//! HTTP seam
//!
//! Used for Subsonic REST calls, cover-art downloads and host JSON-RPC
//! notifications.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Sent in insertion order. Names compare case-insensitively.
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    /// Overrides the client-wide timeout for this request only.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// POST with `payload` serialized as the JSON body.
    pub fn post_json<T: Serialize + ?Sized>(url: impl Into<String>, payload: &T) -> Result<Self> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| BridgeError::Malformed(format!("cannot encode request body: {}", e)))?;
        Ok(Self {
            method: HttpMethod::Post,
            body: Some(Bytes::from(body)),
            ..Self::get(url)
        }
        .header("Content-Type", "application/json"))
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::Malformed(format!("cannot decode response body: {}", e)))
    }

    /// Body as text for error messages; invalid UTF-8 is replaced.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Async HTTP transport.
///
/// Transport failures (DNS, refused connection, timeout) are
/// [`BridgeError::Connectivity`]. Every response that arrives is `Ok`,
/// whatever its status; callers decide what a 404 or 503 means to them.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
