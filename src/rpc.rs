//! JSON-RPC client for the ledger node.
//!
//! One fixed endpoint, JSON-RPC 2.0 over HTTP POST. Rate limiting (429) is
//! retried with exponential backoff; auth failures (401) and other error
//! statuses fail fast. All diagnostics go through `tracing`, never stdout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ScannerConfig;
use crate::transaction::{SignatureInfo, TransactionRecord};

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// Errors surfaced by the RPC layer. Any of these aborts the scan that
/// triggered the call; none of them is a benign skip.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rate limit exceeded after {0} attempts")]
    RateLimitExceeded(u32),

    #[error("401 unauthorized: check the RPC endpoint credentials")]
    Unauthorized,

    #[error("transport error: HTTP status {0}")]
    Transport(StatusCode),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response payload: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// Retry delay schedule for 429 responses: `2^attempt + 0.1` seconds,
/// attempt counted from 0.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs_f64(2f64.powi(attempt as i32) + 0.1)
}

/// The two ledger queries the scanner needs.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Up to `limit` most recent signatures for `address`, newest first.
    async fn get_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError>;

    /// Full record for one signature, or `None` if the node has no record
    /// of it (pruned or invalid signature).
    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, RpcError>;
}

/// Client for a single JSON-RPC endpoint.
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    backoff: fn(u32) -> Duration,
}

impl RpcClient {
    pub fn new(config: &ScannerConfig) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.rpc_endpoint.clone(),
            max_retries: config.max_retries,
            backoff: backoff_delay,
        })
    }

    /// Replace the 429 retry delay schedule. The default is
    /// [`backoff_delay`]; tests swap in a zero-delay schedule so retries
    /// run without sleeping.
    pub fn with_backoff(mut self, backoff: fn(u32) -> Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Execute one JSON-RPC call and return its `result` member.
    ///
    /// `Ok(None)` means the node answered without a result (absent or
    /// null); the caller decides what an empty result means. A node-level
    /// JSON-RPC `error` member is logged and treated the same way.
    pub async fn call(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<Option<Value>, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: next_request_id(),
            method,
            params,
        };

        for attempt in 0..self.max_retries {
            debug!(method, id = request.id, attempt, "issuing JSON-RPC request");

            let response = self
                .http
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let delay = (self.backoff)(attempt);
                warn!(
                    method,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }
            if status == StatusCode::UNAUTHORIZED {
                warn!(method, "endpoint rejected credentials");
                return Err(RpcError::Unauthorized);
            }
            if !status.is_success() {
                warn!(method, %status, "endpoint returned an error status");
                return Err(RpcError::Transport(status));
            }

            let body: JsonRpcResponse = response.json().await?;
            if let Some(err) = body.error {
                warn!(
                    method,
                    code = err.code,
                    message = %err.message,
                    "node returned a JSON-RPC error"
                );
            }
            return Ok(body.result.filter(|value| !value.is_null()));
        }

        warn!(
            method,
            attempts = self.max_retries,
            "giving up after repeated rate limiting"
        );
        Err(RpcError::RateLimitExceeded(self.max_retries))
    }
}

#[async_trait]
impl LedgerRpc for RpcClient {
    async fn get_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        let result = self
            .call("getSignaturesForAddress", json!([address, { "limit": limit }]))
            .await?;
        match result {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, RpcError> {
        let params = json!([signature, {
            "encoding": "jsonParsed",
            "maxSupportedTransactionVersion": 0
        }]);
        match self.call("getTransaction", params).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
