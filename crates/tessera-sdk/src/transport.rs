//! Transport layer for RPC communication

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SdkError;

#[cfg(feature = "http")]
use crate::config::{ClientConfig, RetryPolicy};

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Call id, echoed back in the response
    pub id: i64,
    /// Method name
    pub method: String,
    /// Positional parameters
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    /// Create a request
    pub fn new(id: i64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version
    #[serde(default)]
    pub jsonrpc: String,
    /// Id of the request this answers
    #[serde(default)]
    pub id: Value,
    /// Result on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl JsonRpcResponse {
    /// Successful response
    pub fn success(id: i64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            result: Some(result),
            error: None,
        }
    }

    /// Error response
    pub fn failure(id: i64, error: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            result: None,
            error: Some(error),
        }
    }

    /// Unwrap the outer envelope. A present error object wins over any result.
    pub fn into_result(self) -> Result<Value, SdkError> {
        if let Some(error) = self.error {
            return Err(SdkError::Protocol(error.to_string()));
        }
        self.result
            .ok_or_else(|| SdkError::Protocol("response carries neither result nor error".to_string()))
    }
}

/// Transport trait for RPC communication (object-safe)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and wait for its response
    async fn call(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, SdkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn call(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, SdkError> {
        (**self).call(request).await
    }
}

enum Canned {
    Result(Value),
    Error(Value),
    TransportFailure(String),
}

impl Canned {
    fn respond(&self, id: i64) -> Result<JsonRpcResponse, SdkError> {
        match self {
            Canned::Result(v) => Ok(JsonRpcResponse::success(id, v.clone())),
            Canned::Error(e) => Ok(JsonRpcResponse::failure(id, e.clone())),
            Canned::TransportFailure(msg) => Err(SdkError::Transport(msg.clone())),
        }
    }
}

#[derive(Default)]
struct MockState {
    fixed: HashMap<String, Canned>,
    queued: HashMap<String, VecDeque<Canned>>,
    requests: Vec<JsonRpcRequest>,
}

/// In-memory transport for tests.
///
/// Each method answers with a canned result. One-shot answers queued with
/// [`push_result`](Self::push_result) are consumed first. Every request is
/// recorded. Clones share state, so a test can keep a handle after giving one
/// to a client.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Chain id the mock's default `genesis` answer reports
pub const MOCK_CHAIN_ID: &str = "tessera-mock";

impl MockTransport {
    /// Create a mock that answers `genesis` with [`MOCK_CHAIN_ID`]
    pub fn new() -> Self {
        let mock = Self {
            state: Arc::new(Mutex::new(MockState::default())),
        };
        mock.set_result(
            "genesis",
            serde_json::json!({
                "genesis": {
                    "genesis_time": "2024-01-01T00:00:00Z",
                    "chain_id": MOCK_CHAIN_ID,
                    "initial_height": "1",
                    "app_hash": ""
                }
            }),
        );
        mock
    }

    /// Answer every call to `method` with `result`
    pub fn set_result(&self, method: &str, result: Value) {
        self.state
            .lock()
            .fixed
            .insert(method.to_string(), Canned::Result(result));
    }

    /// Answer every call to `method` with a JSON-RPC error object
    pub fn set_error(&self, method: &str, error: Value) {
        self.state
            .lock()
            .fixed
            .insert(method.to_string(), Canned::Error(error));
    }

    /// Fail every call to `method` as if the connection dropped
    pub fn set_transport_failure(&self, method: &str, message: &str) {
        self.state
            .lock()
            .fixed
            .insert(method.to_string(), Canned::TransportFailure(message.to_string()));
    }

    /// Answer the next call to `method` with `result`, ahead of any fixed answer
    pub fn push_result(&self, method: &str, result: Value) {
        self.state
            .lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(Canned::Result(result));
    }

    /// Answer `method` with an application-level query envelope around `value`
    pub fn set_query_value(&self, method: &str, value: Value) {
        self.set_result(method, query_envelope(0, "", &value));
    }

    /// Answer `method` with a query envelope carrying a non-zero code
    pub fn set_query_failure(&self, method: &str, code: u32, log: &str) {
        self.set_result(method, query_envelope(code, log, &Value::Null));
    }

    /// All requests seen so far
    pub fn requests(&self) -> Vec<JsonRpcRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests seen for one method
    pub fn requests_for(&self, method: &str) -> Vec<JsonRpcRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    /// Number of requests seen
    pub fn call_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Forget recorded requests
    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }
}

/// Build the `{code, log, value}` envelope the node wraps query answers in
pub fn query_envelope(code: u32, log: &str, value: &Value) -> Value {
    serde_json::json!({
        "code": code,
        "log": log,
        "key": "",
        "value": value,
        "height": "1"
    })
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, SdkError> {
        let mut state = self.state.lock();
        state.requests.push(request.clone());

        if let Some(canned) = state
            .queued
            .get_mut(&request.method)
            .and_then(|q| q.pop_front())
        {
            return canned.respond(request.id);
        }
        match state.fixed.get(&request.method) {
            Some(canned) => canned.respond(request.id),
            None => Ok(JsonRpcResponse::failure(
                request.id,
                serde_json::json!({
                    "code": -32601,
                    "message": format!("Method not found: {}", request.method)
                }),
            )),
        }
    }
}

/// HTTP transport for real RPC communication
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Transport for `url` with default timeouts
    pub fn new(url: &str) -> Result<Self, SdkError> {
        Self::from_config(&ClientConfig::new(url))
    }

    /// Transport configured from `config`
    pub fn from_config(config: &ClientConfig) -> Result<Self, SdkError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            url: config.rpc_url.clone(),
            retry: config.retry,
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send_with_retry(
        &self,
        request: &JsonRpcRequest,
    ) -> Result<reqwest::Response, SdkError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.client.post(&self.url).json(request).send().await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_connect() && attempt < max_attempts => {
                    tracing::warn!(
                        url = %self.url,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Connection failed, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff()).await;
                    attempt += 1;
                }
                Err(e) => return Err(SdkError::Transport(e.to_string())),
            }
        }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, SdkError> {
        let response = self.send_with_retry(request).await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SdkError::Transport(format!("Bad HTTP response: {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;
        Ok(serde_json::from_slice(&body)?)
    }
}
