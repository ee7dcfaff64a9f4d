//! TesseraClient - main RPC client

use std::sync::atomic::{AtomicI64, Ordering};

use base64::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tessera_primitives::{Address, BlockHeight};
use tessera_types::{Account, Transaction};
use tracing::{debug, info, warn};

use crate::transport::{JsonRpcRequest, Transport};
use crate::types::{
    BroadcastTxCommitResult, BroadcastTxResult, Delegatee, GenesisResult, GovParams,
    ProposalResult, RawTxResult, Reward, Stake, StatusResult, TxResult, ValidatorsResult,
    VmCallResult,
};
use crate::SdkError;

#[cfg(feature = "http")]
use crate::config::ClientConfig;
#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Inner envelope of every application query
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Value,
}

/// Tessera client for RPC communication.
///
/// The chain id is learned once at construction and never changes. Call ids
/// come from an atomic counter, so the client can be shared between tasks
/// (`Arc<TesseraClient>`) without serializing their requests.
pub struct TesseraClient {
    transport: Box<dyn Transport>,
    chain_id: String,
    call_id: AtomicI64,
}

impl TesseraClient {
    /// Connect over HTTP and learn the chain id
    #[cfg(feature = "http")]
    pub async fn connect(config: &ClientConfig) -> Result<Self, SdkError> {
        let transport = HttpTransport::from_config(config)?;
        Self::with_transport(transport).await
    }

    /// Connect to `url` with default settings
    #[cfg(feature = "http")]
    pub async fn connect_url(url: &str) -> Result<Self, SdkError> {
        Self::connect(&ClientConfig::new(url)).await
    }

    /// Create a client over a custom transport and learn the chain id.
    ///
    /// Fails if the genesis document cannot be fetched: every signature is
    /// bound to the chain id, so a client without one is useless.
    pub async fn with_transport(transport: impl Transport + 'static) -> Result<Self, SdkError> {
        let mut client = Self {
            transport: Box::new(transport),
            chain_id: String::new(),
            call_id: AtomicI64::new(0),
        };

        let genesis = client.genesis().await?;
        if genesis.genesis.chain_id.is_empty() {
            return Err(SdkError::State("genesis document has an empty chain id".to_string()));
        }
        client.chain_id = genesis.genesis.chain_id;
        info!(chain_id = %client.chain_id, "Client bootstrapped");

        Ok(client)
    }

    /// Chain id every transaction is signed for
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn next_request(&self, method: &str, params: Vec<Value>) -> JsonRpcRequest {
        let id = self.call_id.fetch_add(1, Ordering::Relaxed) + 1;
        JsonRpcRequest::new(id, method, params)
    }

    /// Send one request and unwrap the outer envelope
    async fn rpc(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let request = self.next_request(method, params);
        debug!(method, id = request.id, "RPC call");

        let response = self.transport.call(&request).await?;
        if response.id != Value::from(request.id) && !response.id.is_null() {
            warn!(method, sent = request.id, received = %response.id, "Response id mismatch");
        }
        response.into_result()
    }

    async fn rpc_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        let value = self.rpc(method, params).await?;
        serde_json::from_value(value).map_err(|e| SdkError::Decode(format!("{}: {}", method, e)))
    }

    /// Outer envelope, then the `{code, log, value}` query envelope
    async fn query_value(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let response: QueryResponse = self.rpc_typed(method, params).await?;
        if response.code != 0 {
            debug!(method, code = response.code, log = %response.log, "Query rejected");
            return Err(SdkError::Application {
                code: response.code,
                log: response.log,
            });
        }
        Ok(response.value)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SdkError> {
        let value = self.query_value(method, params).await?;
        serde_json::from_value(value).map_err(|e| SdkError::Decode(format!("{}: {}", method, e)))
    }

    // ==================== Chain Info ====================

    /// Node status
    pub async fn status(&self) -> Result<StatusResult, SdkError> {
        self.rpc_typed("status", vec![]).await
    }

    /// Genesis document
    pub async fn genesis(&self) -> Result<GenesisResult, SdkError> {
        self.rpc_typed("genesis", vec![]).await
    }

    /// Current governance parameters
    pub async fn gov_params(&self) -> Result<GovParams, SdkError> {
        self.query("gov_params", vec![height_param(0)]).await
    }

    /// Validator set at `height` (0 = latest). Page 0 is treated as page 1.
    pub async fn validators(
        &self,
        height: BlockHeight,
        page: u32,
        per_page: u32,
    ) -> Result<ValidatorsResult, SdkError> {
        let height = if height > 0 { height.to_string() } else { "0".to_string() };
        let page = page.max(1);
        self.rpc_typed(
            "validators",
            vec![
                Value::String(height),
                Value::String(page.to_string()),
                Value::String(per_page.to_string()),
            ],
        )
        .await
    }

    // ==================== Account Queries ====================

    /// Latest account state
    pub async fn account(&self, address: &Address) -> Result<Account, SdkError> {
        self.query("account", vec![address_param(address), height_param(0)])
            .await
    }

    /// Delegatee record of a validator candidate
    pub async fn delegatee(&self, address: &Address) -> Result<Delegatee, SdkError> {
        self.query("delegatee", vec![address_param(address), height_param(0)])
            .await
    }

    /// Stakes owned by `address`
    pub async fn stakes(&self, address: &Address) -> Result<Vec<Stake>, SdkError> {
        let value = self
            .query_value("stakes", vec![address_param(address), height_param(0)])
            .await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value).map_err(|e| SdkError::Decode(format!("stakes: {}", e)))
    }

    /// Reward ledger of `address` at `height`
    pub async fn reward(&self, address: &Address, height: BlockHeight) -> Result<Reward, SdkError> {
        self.query("reward", vec![address_param(address), height_param(height)])
            .await
    }

    /// Total staked power at `height`
    pub async fn total_power(&self, height: BlockHeight) -> Result<i64, SdkError> {
        let value = self
            .query_value("stakes/total_power", vec![height_param(height)])
            .await?;
        power_value("stakes/total_power", value)
    }

    /// Power of the active validator set at `height`
    pub async fn voting_power(&self, height: BlockHeight) -> Result<i64, SdkError> {
        let value = self
            .query_value("stakes/voting_power", vec![height_param(height)])
            .await?;
        power_value("stakes/voting_power", value)
    }

    /// Governance proposal created by transaction `tx_hash`
    pub async fn proposal(
        &self,
        tx_hash: &[u8],
        height: BlockHeight,
    ) -> Result<ProposalResult, SdkError> {
        self.query("proposal", vec![bytes_param(tx_hash), height_param(height)])
            .await
    }

    // ==================== Transactions ====================

    /// Committed transaction by hash, with the transaction decoded
    pub async fn tx(&self, tx_hash: &[u8]) -> Result<TxResult, SdkError> {
        let raw: RawTxResult = self
            .rpc_typed("tx", vec![bytes_param(tx_hash), Value::Bool(false)])
            .await?;
        TxResult::try_from(raw)
    }

    /// Submit without waiting for any validation
    pub async fn send_tx_async(&self, tx: &Transaction) -> Result<BroadcastTxResult, SdkError> {
        self.broadcast("broadcast_tx_async", tx).await
    }

    /// Submit and wait for admission to the pending pool
    pub async fn send_tx_sync(&self, tx: &Transaction) -> Result<BroadcastTxResult, SdkError> {
        self.broadcast("broadcast_tx_sync", tx).await
    }

    /// Submit and wait for the transaction to be executed in a block.
    ///
    /// A returned value is not a success: check
    /// [`BroadcastTxCommitResult::is_ok`].
    pub async fn send_tx_commit(
        &self,
        tx: &Transaction,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        self.broadcast("broadcast_tx_commit", tx).await
    }

    async fn broadcast<T: DeserializeOwned>(
        &self,
        method: &str,
        tx: &Transaction,
    ) -> Result<T, SdkError> {
        if !tx.is_signed() {
            return Err(SdkError::State("transaction is not signed".to_string()));
        }
        debug!(method, nonce = tx.nonce(), kind = ?tx.kind(), "Broadcasting transaction");
        self.rpc_typed(method, vec![bytes_param(&tx.encode())]).await
    }

    // ==================== Contract Queries ====================

    /// Execute contract code read-only at `height` (0 = latest)
    pub async fn vm_call(
        &self,
        from: &Address,
        to: &Address,
        height: BlockHeight,
        data: &[u8],
    ) -> Result<VmCallResult, SdkError> {
        self.query(
            "vm_call",
            vec![address_param(from), address_param(to), height_param(height), bytes_param(data)],
        )
        .await
    }

    /// Gas a contract call would consume at `height`
    pub async fn vm_estimate_gas(
        &self,
        from: &Address,
        to: &Address,
        height: BlockHeight,
        data: &[u8],
    ) -> Result<VmCallResult, SdkError> {
        self.query(
            "vm_estimate_gas",
            vec![address_param(from), address_param(to), height_param(height), bytes_param(data)],
        )
        .await
    }
}

impl std::fmt::Debug for TesseraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TesseraClient")
            .field("chain_id", &self.chain_id)
            .field("call_id", &self.call_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// ==================== Parameter encoding ====================

/// Addresses go over the wire as upper-case hex without prefix
fn address_param(address: &Address) -> Value {
    Value::String(address.to_wire_string())
}

/// Heights go over the wire as decimal strings
fn height_param(height: BlockHeight) -> Value {
    Value::String(height.to_string())
}

/// Raw bytes go over the wire as base64
/// A power query answers with a bare integer. Null or empty is malformed,
/// since zero is a legitimate answer.
fn power_value(method: &str, value: Value) -> Result<i64, SdkError> {
    let parsed = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| SdkError::Decode(format!("{}: expected an integer, got {}", method, value)))
}

fn bytes_param(bytes: &[u8]) -> Value {
    Value::String(BASE64_STANDARD.encode(bytes))
}
