//! Client configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SdkError;

/// Connection settings for a [`TesseraClient`](crate::TesseraClient) and
/// [`Subscriber`](crate::Subscriber).
///
/// ```toml
/// rpc_url = "http://10.0.0.5:26657"
/// request_timeout_ms = 30000
///
/// [retry]
/// max_attempts = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// WebSocket endpoint for subscriptions
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// TCP connect timeout
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: Option<u64>,
    /// Whole-request timeout. `None` waits forever, so a stalled node blocks
    /// the caller indefinitely.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Reconnect policy
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Retry policy for connection failures.
///
/// Only failures to establish a connection are retried. A request that reached
/// the node is never resent, since a broadcast may already have been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, 1 = no retry
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_rpc_url() -> String {
    "http://localhost:26657".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:26657/websocket".to_string()
}

fn default_connect_timeout_ms() -> Option<u64> {
    Some(10_000)
}

fn default_max_attempts() -> u32 {
    1
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay between attempts
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            ws_url: default_ws_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at `rpc_url`, everything else default
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Default::default()
        }
    }

    /// Parse TOML; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self, SdkError> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, SdkError> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Connect timeout as a duration
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), SdkError> {
        if self.rpc_url.is_empty() {
            return Err(SdkError::Config("rpc_url must not be empty".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SdkError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
