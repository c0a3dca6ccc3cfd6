//! Host Library Control over JSON-RPC
//!
//! Asks a media-center host to rescan or clean its audio library by posting
//! `AudioLibrary.Scan` / `AudioLibrary.Clean` to its JSON-RPC endpoint.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    host::HostLibrary,
    http::{HttpClient, HttpRequest},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// [`HostLibrary`] backed by the host's JSON-RPC API.
pub struct JsonRpcHostLibrary {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    authorization: Option<String>,
    next_id: AtomicU64,
}

impl JsonRpcHostLibrary {
    /// `endpoint` is the full JSON-RPC URL, e.g. `http://localhost:8080/jsonrpc`.
    pub fn new(http: Arc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            authorization: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// Send HTTP basic credentials with every call.
    pub fn with_basic_auth(mut self, username: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{}:{}", username, password));
        self.authorization = Some(format!("Basic {}", token));
        self
    }

    async fn call(&self, method: &str, params: Value) -> Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let mut request =
            HttpRequest::post_json(self.endpoint.as_str(), &body)?.timeout(Duration::from_secs(10));
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth.clone());
        }

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(BridgeError::OperationFailed(format!(
                "{} rejected with HTTP {}",
                method, response.status
            )));
        }

        let rpc: RpcResponse = response.json()?;
        if let Some(err) = rpc.error {
            return Err(BridgeError::OperationFailed(format!(
                "{} failed ({}): {}",
                method, err.code, err.message
            )));
        }

        debug!(method, result = ?rpc.result, "Host JSON-RPC call succeeded");
        Ok(())
    }
}

#[async_trait]
impl HostLibrary for JsonRpcHostLibrary {
    async fn request_rescan(&self, scope: &str) -> Result<()> {
        info!(scope, "Requesting host library scan");
        self.call("AudioLibrary.Scan", json!({ "directory": scope }))
            .await
    }

    async fn request_clean(&self) -> Result<()> {
        info!("Requesting host library clean");
        self.call("AudioLibrary.Clean", json!({})).await
    }
}
