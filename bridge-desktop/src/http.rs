//! [`HttpClient`] over reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One attempt per request; retry policy belongs to the caller.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(concat!("library-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map(|client| Self { client })
            .map_err(|e| BridgeError::NotAvailable(format!("cannot build HTTP client: {}", e)))
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
    }
}

/// The URL is dropped before formatting: Subsonic puts credentials in the
/// query string.
fn transport_error(error: reqwest::Error) -> BridgeError {
    let error = error.without_url();
    if error.is_builder() {
        return BridgeError::OperationFailed(format!("invalid request: {}", error));
    }
    let reason = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "transport error"
    };
    warn!(error = %error, reason, "HTTP request failed");
    BridgeError::Connectivity(format!("{}: {}", reason, error))
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method: verb,
            url,
            headers,
            body,
            timeout,
        } = request;

        let mut builder = self.client.request(method(verb), url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;

        debug!(method = ?verb, status, bytes = body.len(), "HTTP response");
        Ok(HttpResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(ReqwestHttpClient::new().is_ok());
        assert!(ReqwestHttpClient::with_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(method(HttpMethod::Get), Method::GET);
        assert_eq!(method(HttpMethod::Post), Method::POST);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connectivity() {
        let client = ReqwestHttpClient::with_timeout(Duration::from_secs(2)).unwrap();
        // nothing listens on the discard port
        let err = client
            .execute(HttpRequest::get("http://127.0.0.1:9/rest/ping?u=admin&p=enc:736573616d65"))
            .await
            .unwrap_err();

        assert!(err.is_connectivity());
        assert!(!err.to_string().contains("736573616d65"));
    }

    #[tokio::test]
    async fn test_malformed_url_is_operation_failed() {
        let client = ReqwestHttpClient::new().unwrap();
        let err = client
            .execute(HttpRequest::get("not a url"))
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }
}
