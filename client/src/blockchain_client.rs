/// JSON-RPC plumbing for talking to an Ethereum-style node or injected provider
///
/// Everything above this module speaks in terms of [`RpcTransport`], so the
/// same wallet and contract code runs against a node over HTTP and against a
/// browser wallet compiled to WebAssembly.
use crate::errors::{WalletError, WalletResult};
use async_trait::async_trait;
use std::time::Duration;

/// A request/response channel to an EIP-1193 style endpoint.
#[async_trait(?Send)]
pub trait RpcTransport {
    /// Issue one JSON-RPC call and return its `result` (`Null` when absent).
    async fn request(&self, method: &str, params: serde_json::Value)
        -> WalletResult<serde_json::Value>;

    /// Suspend the caller between receipt polls.
    async fn pause(&self, duration: Duration);
}

/// Parse a hex quantity such as `"0x1a"` as used by JSON-RPC.
pub fn parse_quantity(value: &str) -> WalletResult<u64> {
    let digits = value.strip_prefix("0x").ok_or_else(|| {
        WalletError::InvalidResponse(format!("Quantity '{}' is not 0x-prefixed", value))
    })?;

    if digits.is_empty() {
        return Err(WalletError::InvalidResponse(
            "Quantity has no digits".to_string(),
        ));
    }

    u64::from_str_radix(digits, 16)
        .map_err(|_| WalletError::InvalidResponse(format!("Invalid quantity '{}'", value)))
}

#[cfg(feature = "native")]
pub use http::HttpTransport;

#[cfg(feature = "native")]
mod http {
    use super::*;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// JSON-RPC request structure
    #[derive(Debug, Serialize)]
    struct JsonRpcRequest<'a> {
        jsonrpc: &'static str,
        method: &'a str,
        params: serde_json::Value,
        id: u64,
    }

    /// JSON-RPC response structure
    #[derive(Debug, Deserialize)]
    struct JsonRpcResponse {
        #[serde(default)]
        result: Option<serde_json::Value>,
        #[serde(default)]
        error: Option<JsonRpcError>,
    }

    /// JSON-RPC error structure
    #[derive(Debug, Deserialize)]
    struct JsonRpcError {
        code: i64,
        message: String,
    }

    fn into_result(response: JsonRpcResponse) -> WalletResult<serde_json::Value> {
        if let Some(error) = response.error {
            return Err(WalletError::RpcError {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    /// HTTP client for node RPC communication
    pub struct HttpTransport {
        client: Client,
        base_url: String,
        next_id: AtomicU64,
    }

    impl HttpTransport {
        pub fn new(base_url: &str) -> WalletResult<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .map_err(|e| {
                    WalletError::NetworkError(format!("Failed to create HTTP client: {}", e))
                })?;

            Ok(HttpTransport {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                next_id: AtomicU64::new(1),
            })
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }
    }

    #[async_trait(?Send)]
    impl RpcTransport for HttpTransport {
        async fn request(
            &self,
            method: &str,
            params: serde_json::Value,
        ) -> WalletResult<serde_json::Value> {
            let request = JsonRpcRequest {
                jsonrpc: "2.0",
                method,
                params,
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
            };

            log::debug!("RPC {} -> {}", method, self.base_url);
            let response = self
                .client
                .post(&self.base_url)
                .json(&request)
                .send()
                .await
                .map_err(|e| WalletError::NetworkError(format!("HTTP request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(WalletError::NetworkError(format!(
                    "HTTP error: {}",
                    response.status()
                )));
            }

            let rpc_response: JsonRpcResponse = response.json().await.map_err(|e| {
                WalletError::NetworkError(format!("Failed to parse response: {}", e))
            })?;

            into_result(rpc_response)
        }

        async fn pause(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }
    }


}
