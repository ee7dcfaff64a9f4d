//! Transaction types

use bytes::Bytes;
use tessera_primitives::{Address, Gas, HexBytes, Nonce, H256, U256};

use crate::codec::CodecError;

/// Format version stamped on every transaction this client builds
pub const TX_VERSION: u32 = 1;

/// Payload kind tag, as carried on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxKind {
    /// Plain value transfer
    Transfer = 1,
    /// Stake `amount` to a validator
    Staking = 2,
    /// Release a previous stake
    Unstaking = 3,
    /// Governance proposal
    Proposal = 4,
    /// Vote on a proposal
    Voting = 5,
    /// Contract creation or call
    Contract = 6,
    /// Set the sender's name and document URL
    SetDocument = 7,
    /// Withdraw accumulated rewards
    Withdraw = 8,
}

impl TxKind {
    /// Wire tag
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => TxKind::Transfer,
            2 => TxKind::Staking,
            3 => TxKind::Unstaking,
            4 => TxKind::Proposal,
            5 => TxKind::Voting,
            6 => TxKind::Contract,
            7 => TxKind::SetDocument,
            8 => TxKind::Withdraw,
            _ => return None,
        })
    }
}

/// Kind-specific transaction content
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxPayload {
    /// Value transfer; the economic effect is `amount`
    Transfer,
    /// Stake `amount` to the recipient validator
    Staking,
    /// Unstake the stake created by `tx_hash`
    Unstaking {
        /// Hash of the staking transaction being released
        tx_hash: HexBytes,
    },
    /// Withdraw `req_amount` of accumulated reward
    Withdraw {
        /// Requested amount
        req_amount: U256,
    },
    /// Governance proposal
    Proposal {
        /// Human readable proposal text
        message: String,
        /// First height at which votes are accepted
        start_voting_height: u64,
        /// Length of the voting window in blocks
        voting_period_blocks: u64,
        /// Height at which the winning option takes effect
        applying_height: u64,
        /// Option type understood by the governance module
        opt_type: u32,
        /// Encoded options
        options: Vec<Vec<u8>>,
    },
    /// Vote `choice` on the proposal created by `tx_hash`
    Voting {
        /// Hash of the proposal transaction
        tx_hash: HexBytes,
        /// Index of the chosen option
        choice: u32,
    },
    /// Contract call data, or creation bytecode followed by constructor args
    Contract {
        /// Call data
        data: Bytes,
    },
    /// Account metadata
    SetDocument {
        /// Account name
        name: String,
        /// Document URL
        url: String,
    },
}

impl TxPayload {
    /// Payload kind
    pub fn kind(&self) -> TxKind {
        match self {
            TxPayload::Transfer => TxKind::Transfer,
            TxPayload::Staking => TxKind::Staking,
            TxPayload::Unstaking { .. } => TxKind::Unstaking,
            TxPayload::Withdraw { .. } => TxKind::Withdraw,
            TxPayload::Proposal { .. } => TxKind::Proposal,
            TxPayload::Voting { .. } => TxKind::Voting,
            TxPayload::Contract { .. } => TxKind::Contract,
            TxPayload::SetDocument { .. } => TxKind::SetDocument,
        }
    }
}

/// A transaction.
///
/// Fields are read-only once constructed. The only mutation is attaching a
/// signature, which is what signing does; nothing else can change a signed
/// transaction and invalidate its signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    version: u32,
    from: Address,
    to: Address,
    nonce: Nonce,
    gas: Gas,
    gas_price: U256,
    amount: U256,
    payload: TxPayload,
    signature: Bytes,
}

impl Transaction {
    /// Create an unsigned transaction
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: u32,
        from: Address,
        to: Address,
        nonce: Nonce,
        gas: Gas,
        gas_price: U256,
        amount: U256,
        payload: TxPayload,
    ) -> Self {
        Self {
            version,
            from,
            to,
            nonce,
            gas,
            gas_price,
            amount,
            payload,
            signature: Bytes::new(),
        }
    }

    /// Format version
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Sender
    pub fn from(&self) -> &Address {
        &self.from
    }

    /// Recipient, [`Address::ZERO`] when there is none
    pub fn to(&self) -> &Address {
        &self.to
    }

    /// Sender nonce
    pub fn nonce(&self) -> Nonce {
        self.nonce
    }

    /// Gas limit
    pub fn gas(&self) -> Gas {
        self.gas
    }

    /// Price per unit of gas
    pub fn gas_price(&self) -> &U256 {
        &self.gas_price
    }

    /// Transferred amount
    pub fn amount(&self) -> &U256 {
        &self.amount
    }

    /// Payload
    pub fn payload(&self) -> &TxPayload {
        &self.payload
    }

    /// Payload kind
    pub fn kind(&self) -> TxKind {
        self.payload.kind()
    }

    /// Signature bytes, empty until signed
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Whether a signature is attached
    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Attach a signature. A signed transaction is never re-signed.
    pub fn set_signature(&mut self, signature: impl Into<Bytes>) -> Result<(), CodecError> {
        if self.is_signed() {
            return Err(CodecError::AlreadySigned);
        }
        self.signature = signature.into();
        Ok(())
    }

    /// Whether this transaction creates a contract
    pub fn is_contract_creation(&self) -> bool {
        self.kind() == TxKind::Contract && self.to.is_zero()
    }

    /// Hash the node uses to identify this transaction (SHA-256 of the wire bytes)
    pub fn hash(&self) -> H256 {
        tessera_crypto::sha256(&crate::codec::encode(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(payload: TxPayload) -> Transaction {
        Transaction::new(
            TX_VERSION,
            Address::from_bytes([1; 20]),
            Address::from_bytes([2; 20]),
            7,
            100_000,
            U256::from(10u64),
            U256::from(1000u64),
            payload,
        )
    }

    #[test]
    fn test_kind_codes_roundtrip() {
        for code in 1u8..=8 {
            let kind = TxKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert!(TxKind::from_code(0).is_none());
        assert!(TxKind::from_code(9).is_none());
    }

    #[test]
    fn test_new_transaction_is_unsigned() {
        let tx = sample(TxPayload::Transfer);
        assert!(!tx.is_signed());
        assert!(tx.signature().is_empty());
        assert_eq!(tx.kind(), TxKind::Transfer);
        assert_eq!(tx.nonce(), 7);
    }

    #[test]
    fn test_set_signature() {
        let mut tx = sample(TxPayload::Staking);
        tx.set_signature(vec![0xAA; 65]).unwrap();
        assert!(tx.is_signed());
        assert_eq!(tx.signature().len(), 65);
    }

    #[test]
    fn test_set_signature_rejects_resign() {
        let mut tx = sample(TxPayload::Transfer);
        tx.set_signature(vec![0xAA; 65]).unwrap();
        assert!(matches!(
            tx.set_signature(vec![0xBB; 65]),
            Err(CodecError::AlreadySigned)
        ));
        assert_eq!(tx.signature()[0], 0xAA);
    }

    #[test]
    fn test_contract_creation_detection() {
        let create = Transaction::new(
            TX_VERSION,
            Address::from_bytes([1; 20]),
            Address::ZERO,
            0,
            1,
            U256::one(),
            U256::zero(),
            TxPayload::Contract { data: Bytes::from_static(&[0x60, 0x80]) },
        );
        assert!(create.is_contract_creation());
        assert!(!sample(TxPayload::Contract { data: Bytes::new() }).is_contract_creation());
    }

    #[test]
    fn test_hash_covers_signature() {
        let a = sample(TxPayload::Transfer);
        let mut b = a.clone();
        assert_eq!(a.hash(), b.hash());
        b.set_signature(vec![1u8; 65]).unwrap();
        assert_ne!(a.hash(), b.hash());
    }
}
