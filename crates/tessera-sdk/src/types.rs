//! Typed node responses.
//!
//! The node follows Tendermint's JSON conventions: 64-bit integers arrive as
//! strings, raw bytes as base64, hashes and addresses as upper-case hex.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_primitives::{Address, BlockHeight, HexBytes, U256};
use tessera_types::Transaction;

use crate::SdkError;

/// Deserializers for the node's string-encoded scalars
pub(crate) mod de {
    use base64::prelude::*;
    use serde::de::{self, Deserializer};
    use serde::Deserialize;
    use tessera_primitives::{parse_u256, U256};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Str(String),
    }

    /// i64 from a JSON number or decimal string; null or missing is 0
    pub fn i64_str<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Option::<Scalar>::deserialize(d)? {
            None => Ok(0),
            Some(Scalar::Int(n)) => Ok(n),
            Some(Scalar::Str(s)) if s.is_empty() => Ok(0),
            Some(Scalar::Str(s)) => s
                .parse()
                .map_err(|e| de::Error::custom(format!("invalid integer {:?}: {}", s, e))),
        }
    }

    /// U256 from a decimal or 0x-hex string; null or missing is 0
    pub fn u256_str<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        match Option::<Scalar>::deserialize(d)? {
            None => Ok(U256::zero()),
            Some(Scalar::Int(n)) if n >= 0 => Ok(U256::from(n as u64)),
            Some(Scalar::Int(n)) => Err(de::Error::custom(format!("negative amount {}", n))),
            Some(Scalar::Str(s)) if s.is_empty() => Ok(U256::zero()),
            Some(Scalar::Str(s)) => parse_u256(&s).map_err(de::Error::custom),
        }
    }

    /// Bytes from base64; null or missing is empty
    pub fn base64_bytes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = Option::<String>::deserialize(d)?.unwrap_or_default();
        BASE64_STANDARD.decode(s.as_bytes()).map_err(de::Error::custom)
    }
}

/// Public key as rendered by the consensus engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    /// Key type, e.g. `tendermint/PubKeySecp256k1`
    #[serde(rename = "type")]
    pub key_type: String,
    /// Base64 key bytes
    pub value: String,
}

/// Node identity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeInfo {
    /// Node id
    #[serde(default)]
    pub id: String,
    /// P2P listen address
    #[serde(default)]
    pub listen_addr: String,
    /// Chain id the node is on
    #[serde(default)]
    pub network: String,
    /// Software version
    #[serde(default)]
    pub version: String,
    /// Operator chosen name
    #[serde(default)]
    pub moniker: String,
}

/// Chain progress as seen by the node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncInfo {
    /// Hash of the latest block
    #[serde(default)]
    pub latest_block_hash: HexBytes,
    /// App hash after the latest block
    #[serde(default)]
    pub latest_app_hash: HexBytes,
    /// Latest block height
    #[serde(default, deserialize_with = "de::i64_str")]
    pub latest_block_height: BlockHeight,
    /// Latest block time
    #[serde(default)]
    pub latest_block_time: String,
    /// Whether the node is still syncing
    #[serde(default)]
    pub catching_up: bool,
}

/// The node's own validator identity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorInfo {
    /// Validator address
    #[serde(default)]
    pub address: HexBytes,
    /// Validator public key
    pub pub_key: Option<PubKey>,
    /// Voting power
    #[serde(default, deserialize_with = "de::i64_str")]
    pub voting_power: i64,
}

/// `status` result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusResult {
    /// Node identity
    pub node_info: NodeInfo,
    /// Chain progress
    pub sync_info: SyncInfo,
    /// Node validator identity
    pub validator_info: ValidatorInfo,
}

/// Genesis document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenesisDoc {
    /// Genesis time
    #[serde(default)]
    pub genesis_time: String,
    /// Chain id all signatures are bound to
    pub chain_id: String,
    /// First block height
    #[serde(default, deserialize_with = "de::i64_str")]
    pub initial_height: BlockHeight,
    /// Initial app hash
    #[serde(default)]
    pub app_hash: HexBytes,
    /// Consensus parameters
    #[serde(default)]
    pub consensus_params: Value,
    /// Initial validator set
    #[serde(default)]
    pub validators: Value,
    /// Application genesis state
    #[serde(default)]
    pub app_state: Value,
}

/// `genesis` result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenesisResult {
    /// The genesis document
    pub genesis: GenesisDoc,
}

/// Governance parameters.
///
/// The parameter set changes with governance proposals, so it is kept as a
/// map with typed accessors rather than a fixed struct.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GovParams(pub serde_json::Map<String, Value>);

impl GovParams {
    /// Raw parameter value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Integer parameter, whether encoded as a number or a string
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Amount parameter, decimal or hex string
    pub fn get_u256(&self, name: &str) -> Option<U256> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_u64().map(U256::from),
            Value::String(s) => tessera_primitives::parse_u256(s).ok(),
            _ => None,
        }
    }
}

/// A validator candidate and its delegated power
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Delegatee {
    /// Delegatee address
    pub address: Address,
    /// Public key
    #[serde(default, rename = "pubKey")]
    pub pub_key: HexBytes,
    /// Power staked by the delegatee itself
    #[serde(default, rename = "selfPower", deserialize_with = "de::i64_str")]
    pub self_power: i64,
    /// Self plus delegated power
    #[serde(default, rename = "totalPower", deserialize_with = "de::i64_str")]
    pub total_power: i64,
    /// Power lost to slashing
    #[serde(default, rename = "slashedPower", deserialize_with = "de::i64_str")]
    pub slashed_power: i64,
    /// Accounts delegating to this one
    #[serde(default)]
    pub delegators: Vec<Address>,
    /// Blocks the delegatee failed to sign. The node spells the key
    /// `notSingedBlockCount`.
    #[serde(
        default,
        rename = "notSingedBlockCount",
        alias = "notSignedBlockCount",
        deserialize_with = "de::i64_str"
    )]
    pub not_signed_block_count: i64,
}

/// A single stake
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stake {
    /// Staker
    pub owner: Address,
    /// Validator staked to
    pub to: Address,
    /// Hash of the staking transaction; the handle for unstaking
    #[serde(default)]
    pub txhash: HexBytes,
    /// Height the stake became active
    #[serde(default, rename = "startHeight", deserialize_with = "de::i64_str")]
    pub start_height: BlockHeight,
    /// Staked power
    #[serde(default, deserialize_with = "de::i64_str")]
    pub power: i64,
}

/// Reward ledger of an account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reward {
    /// Account
    #[serde(default)]
    pub address: Address,
    /// Total issued
    #[serde(default, deserialize_with = "de::u256_str")]
    pub issued: U256,
    /// Total withdrawn
    #[serde(default, deserialize_with = "de::u256_str")]
    pub withdrawn: U256,
    /// Total slashed
    #[serde(default, deserialize_with = "de::u256_str")]
    pub slashed: U256,
    /// Currently withdrawable
    #[serde(default, deserialize_with = "de::u256_str")]
    pub cumulated: U256,
    /// Height of the last update
    #[serde(default, deserialize_with = "de::i64_str")]
    pub height: BlockHeight,
}

/// `proposal` query value
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProposalResult {
    /// Proposal lifecycle status
    #[serde(default)]
    pub status: String,
    /// The proposal document
    #[serde(default)]
    pub proposal: Value,
}

/// Member of the active validator set
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Validator {
    /// Validator address
    pub address: HexBytes,
    /// Public key
    pub pub_key: Option<PubKey>,
    /// Voting power
    #[serde(default, deserialize_with = "de::i64_str")]
    pub voting_power: i64,
    /// Proposer priority
    #[serde(default, deserialize_with = "de::i64_str")]
    pub proposer_priority: i64,
}

/// `validators` result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorsResult {
    /// Height the set applies to
    #[serde(default, deserialize_with = "de::i64_str")]
    pub block_height: BlockHeight,
    /// Validators on this page
    #[serde(default)]
    pub validators: Vec<Validator>,
    /// Validators on this page
    #[serde(default, deserialize_with = "de::i64_str")]
    pub count: i64,
    /// Validators in the whole set
    #[serde(default, deserialize_with = "de::i64_str")]
    pub total: i64,
}

/// Key/value attribute of an event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventAttribute {
    /// Key
    #[serde(default)]
    pub key: String,
    /// Value
    #[serde(default)]
    pub value: String,
    /// Whether the node indexes it
    #[serde(default)]
    pub index: bool,
}

/// Event emitted while executing a transaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Event {
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Attributes
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

/// Outcome of one execution stage (check or deliver)
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ExecResult {
    /// 0 on success
    #[serde(default)]
    pub code: u32,
    /// Stage output; a created contract's address after deployment
    #[serde(default, deserialize_with = "de::base64_bytes")]
    pub data: Vec<u8>,
    /// Log, usually the failure reason
    #[serde(default)]
    pub log: String,
    /// Extra info
    #[serde(default)]
    pub info: String,
    /// Gas limit
    #[serde(default, deserialize_with = "de::i64_str")]
    pub gas_wanted: i64,
    /// Gas consumed
    #[serde(default, deserialize_with = "de::i64_str")]
    pub gas_used: i64,
    /// Emitted events
    #[serde(default)]
    pub events: Vec<Event>,
    /// Error namespace
    #[serde(default)]
    pub codespace: String,
}

impl ExecResult {
    /// Whether the stage succeeded
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Result of the async and sync broadcast tiers.
///
/// Async returns before any validation, so its code is always 0. Sync carries
/// the admission check code. Neither says anything about execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastTxResult {
    /// Admission code, 0 = accepted
    #[serde(default)]
    pub code: u32,
    /// Admission output
    #[serde(default, deserialize_with = "de::base64_bytes")]
    pub data: Vec<u8>,
    /// Admission log
    #[serde(default)]
    pub log: String,
    /// Error namespace
    #[serde(default)]
    pub codespace: String,
    /// Transaction hash
    pub hash: HexBytes,
}

impl BroadcastTxResult {
    /// Whether the node admitted the transaction
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Result of the commit tier.
///
/// Returning without error does not mean success: inspect both stages, or use
/// [`is_ok`](Self::is_ok).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastTxCommitResult {
    /// Pre-execution check
    pub check_tx: ExecResult,
    /// Execution in the block
    #[serde(alias = "tx_result")]
    pub deliver_tx: ExecResult,
    /// Transaction hash
    pub hash: HexBytes,
    /// Block height
    #[serde(default, deserialize_with = "de::i64_str")]
    pub height: BlockHeight,
}

impl BroadcastTxCommitResult {
    /// Whether both stages succeeded
    pub fn is_ok(&self) -> bool {
        self.check_tx.is_ok() && self.deliver_tx.is_ok()
    }
}

/// `tx` result as sent by the node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawTxResult {
    /// Transaction hash
    pub hash: HexBytes,
    /// Block height
    #[serde(default, deserialize_with = "de::i64_str")]
    pub height: BlockHeight,
    /// Index in the block
    #[serde(default)]
    pub index: u32,
    /// Execution result
    #[serde(default)]
    pub tx_result: ExecResult,
    /// Wire bytes of the transaction
    #[serde(default, deserialize_with = "de::base64_bytes")]
    pub tx: Vec<u8>,
}

/// `tx` result with the transaction decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    /// As sent by the node
    pub raw: RawTxResult,
    /// Decoded transaction
    pub transaction: Transaction,
}

impl TryFrom<RawTxResult> for TxResult {
    type Error = SdkError;

    fn try_from(raw: RawTxResult) -> Result<Self, SdkError> {
        let transaction = Transaction::decode(&raw.tx)?;
        Ok(TxResult { raw, transaction })
    }
}

/// `vm_call` / `vm_estimate_gas` query value
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VmCallResult {
    /// Gas the call consumed
    #[serde(default, rename = "usedGas", deserialize_with = "de::i64_str")]
    pub used_gas: i64,
    /// ABI-encoded return data
    #[serde(default, rename = "returnData", deserialize_with = "de::base64_bytes")]
    pub return_data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delegatee_node_spelling() {
        let d: Delegatee = serde_json::from_value(json!({
            "address": "1C8F4E7C6A3B2D1E0F9A8B7C6D5E4F3A2B1C0D9E",
            "pubKey": "02ABCDEF",
            "selfPower": "100",
            "totalPower": "250",
            "slashedPower": "0",
            "delegators": ["2C8F4E7C6A3B2D1E0F9A8B7C6D5E4F3A2B1C0D9E"],
            "notSingedBlockCount": "3"
        }))
        .unwrap();
        assert_eq!(d.self_power, 100);
        assert_eq!(d.total_power, 250);
        assert_eq!(d.delegators.len(), 1);
        assert_eq!(d.not_signed_block_count, 3);
    }

    #[test]
    fn test_reward_missing_fields_are_zero() {
        let r: Reward = serde_json::from_value(json!({
            "address": "1C8F4E7C6A3B2D1E0F9A8B7C6D5E4F3A2B1C0D9E",
            "issued": "0x64",
            "cumulated": "40"
        }))
        .unwrap();
        assert_eq!(r.issued, U256::from(100u64));
        assert_eq!(r.cumulated, U256::from(40u64));
        assert!(r.withdrawn.is_zero());
        assert_eq!(r.height, 0);
    }

    #[test]
    fn test_commit_result_partial_failure() {
        let r: BroadcastTxCommitResult = serde_json::from_value(json!({
            "check_tx": {"code": 0, "data": null, "log": "", "gas_wanted": "100000", "gas_used": "0"},
            "deliver_tx": {"code": 21, "data": null, "log": "out of gas", "gas_wanted": "100000", "gas_used": "100000"},
            "hash": "AABB",
            "height": "77"
        }))
        .unwrap();
        assert!(r.check_tx.is_ok());
        assert!(!r.deliver_tx.is_ok());
        assert!(!r.is_ok());
        assert_eq!(r.height, 77);
        assert_eq!(r.deliver_tx.gas_used, 100_000);
    }

    #[test]
    fn test_exec_result_data_is_base64() {
        let r: ExecResult = serde_json::from_value(json!({"code": 0, "data": "AQID"})).unwrap();
        assert_eq!(r.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_vm_call_result() {
        let r: VmCallResult =
            serde_json::from_value(json!({"usedGas": "21432", "returnData": "AAAA"})).unwrap();
        assert_eq!(r.used_gas, 21432);
        assert_eq!(r.return_data, vec![0, 0, 0]);
    }

    #[test]
    fn test_gov_params_accessors() {
        let p: GovParams = serde_json::from_value(json!({
            "maxValidatorCnt": 21,
            "minValidatorPower": "10",
            "gasPrice": "0x2540be400"
        }))
        .unwrap();
        assert_eq!(p.get_i64("maxValidatorCnt"), Some(21));
        assert_eq!(p.get_i64("minValidatorPower"), Some(10));
        assert_eq!(p.get_u256("gasPrice"), Some(U256::from(10_000_000_000u64)));
        assert!(p.get("nope").is_none());
    }

    #[test]
    fn test_bad_integer_is_error() {
        let r = serde_json::from_value::<Stake>(json!({
            "owner": "1C8F4E7C6A3B2D1E0F9A8B7C6D5E4F3A2B1C0D9E",
            "to": "1C8F4E7C6A3B2D1E0F9A8B7C6D5E4F3A2B1C0D9E",
            "power": "ten"
        }));
        assert!(r.is_err());
    }
}
