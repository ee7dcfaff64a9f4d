//! Contract interaction helpers

use std::path::Path;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tessera_primitives::{Address, BlockHeight, Gas, HexBytes, Nonce, U256};
use tessera_types::Transaction;
use tracing::{info, warn};

use crate::abi::{Abi, Token};
use crate::tx_builder::TxBuilder;
use crate::types::{BroadcastTxCommitResult, BroadcastTxResult};
use crate::{SdkError, TesseraClient, Wallet};

/// Build artifact as emitted by truffle/hardhat
#[derive(Debug, Deserialize)]
struct BuildArtifact {
    abi: Value,
    #[serde(default)]
    bytecode: HexBytes,
    #[serde(default, rename = "deployedBytecode")]
    deployed_bytecode: HexBytes,
}

/// Fee and value settings of a contract transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecParams {
    /// Sender nonce
    pub nonce: Nonce,
    /// Gas limit
    pub gas: Gas,
    /// Gas price
    pub gas_price: U256,
    /// Value sent along
    pub amount: U256,
}

/// A contract described by its ABI and bytecode.
///
/// The handle starts without an address unless one is set. Read paths need an
/// address. The write path treats an empty method name as the constructor:
/// the transaction targets [`Address::ZERO`] and carries the creation bytecode
/// followed by the packed arguments. A constructor that succeeds at the
/// commit tier assigns the created address to the handle.
#[derive(Debug)]
pub struct EvmContract {
    abi: Abi,
    bytecode: HexBytes,
    deployed_bytecode: HexBytes,
    address: RwLock<Option<Address>>,
}

impl EvmContract {
    /// Create a handle from parts
    pub fn new(abi: Abi, bytecode: impl Into<HexBytes>, deployed_bytecode: impl Into<HexBytes>) -> Self {
        Self {
            abi,
            bytecode: bytecode.into(),
            deployed_bytecode: deployed_bytecode.into(),
            address: RwLock::new(None),
        }
    }

    /// Parse a build artifact `{abi, bytecode, deployedBytecode}`
    pub fn from_artifact_json(json: &str) -> Result<Self, SdkError> {
        let artifact: BuildArtifact = serde_json::from_str(json)
            .map_err(|e| SdkError::Decode(format!("malformed build artifact: {}", e)))?;
        Ok(Self::new(
            Abi::from_value(artifact.abi)?,
            artifact.bytecode,
            artifact.deployed_bytecode,
        ))
    }

    /// Read a build artifact file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SdkError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_artifact_json(&json)
    }

    /// Point the handle at a deployed contract
    pub fn set_address(&self, address: Address) {
        *self.address.write() = Some(address);
    }

    /// Current address, if known
    pub fn address(&self) -> Option<Address> {
        *self.address.read()
    }

    /// Creation bytecode
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Runtime bytecode
    pub fn deployed_bytecode(&self) -> &[u8] {
        &self.deployed_bytecode
    }

    /// Contract interface
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    fn require_address(&self) -> Result<Address, SdkError> {
        self.address()
            .ok_or_else(|| SdkError::State("no contract address".to_string()))
    }

    // ==================== Read paths ====================

    /// Run `name` read-only at `height` (0 = latest) and decode its outputs
    pub async fn call(
        &self,
        name: &str,
        args: &[Token],
        from: &Address,
        height: BlockHeight,
        client: &TesseraClient,
    ) -> Result<Vec<Token>, SdkError> {
        let to = self.require_address()?;
        let data = self.abi.pack(name, args)?;
        let result = client.vm_call(from, &to, height, &data).await?;
        self.abi.unpack(name, &result.return_data)
    }

    /// Gas `name` would use at `height`
    pub async fn estimate_gas(
        &self,
        name: &str,
        args: &[Token],
        from: &Address,
        height: BlockHeight,
        client: &TesseraClient,
    ) -> Result<i64, SdkError> {
        let to = self.require_address()?;
        let data = self.abi.pack(name, args)?;
        let result = client.vm_estimate_gas(from, &to, height, &data).await?;
        Ok(result.used_gas)
    }

    // ==================== Write paths ====================

    fn build_exec(
        &self,
        name: &str,
        args: &[Token],
        from: &Wallet,
        params: &ExecParams,
        chain_id: &str,
    ) -> Result<Transaction, SdkError> {
        let packed = self.abi.pack(name, args)?;
        let (to, data) = if name.is_empty() {
            let mut data = self.bytecode.to_vec();
            data.extend_from_slice(&packed);
            (Address::ZERO, data)
        } else {
            (self.require_address()?, packed)
        };
        self.sign_exec(to, data, from, params, chain_id)
    }

    fn sign_exec(
        &self,
        to: Address,
        data: Vec<u8>,
        from: &Wallet,
        params: &ExecParams,
        chain_id: &str,
    ) -> Result<Transaction, SdkError> {
        let mut tx = TxBuilder::new(from.address())
            .to(to)
            .nonce(params.nonce)
            .gas(params.gas)
            .gas_price(params.gas_price)
            .contract(params.amount, Bytes::from(data));
        from.sign_tx(&mut tx, chain_id)?;
        Ok(tx)
    }

    /// Execute `name` without waiting for validation
    pub async fn exec_async(
        &self,
        name: &str,
        args: &[Token],
        from: &Wallet,
        params: ExecParams,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.build_exec(name, args, from, &params, client.chain_id())?;
        client.send_tx_async(&tx).await
    }

    /// Execute `name`, waiting for admission.
    ///
    /// Admission alone never assigns an address, even for a constructor.
    pub async fn exec_sync(
        &self,
        name: &str,
        args: &[Token],
        from: &Wallet,
        params: ExecParams,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.build_exec(name, args, from, &params, client.chain_id())?;
        client.send_tx_sync(&tx).await
    }

    /// Execute `name`, waiting for the block
    pub async fn exec_commit(
        &self,
        name: &str,
        args: &[Token],
        from: &Wallet,
        params: ExecParams,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let tx = self.build_exec(name, args, from, &params, client.chain_id())?;
        let result = client.send_tx_commit(&tx).await?;

        if name.is_empty() && result.is_ok() {
            match Address::from_slice(&result.deliver_tx.data) {
                Ok(address) => {
                    info!(address = %address.to_hex(), height = result.height, "Contract deployed");
                    self.set_address(address);
                }
                Err(e) => warn!(
                    len = result.deliver_tx.data.len(),
                    error = %e,
                    "Deployment succeeded without a usable address"
                ),
            }
        }
        Ok(result)
    }

    /// Send pre-packed call data to the current address, waiting for the block
    pub async fn exec_commit_with(
        &self,
        data: impl Into<Vec<u8>>,
        from: &Wallet,
        params: ExecParams,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let to = self.require_address()?;
        let tx = self.sign_exec(to, data.into(), from, &params, client.chain_id())?;
        client.send_tx_commit(&tx).await
    }
}
