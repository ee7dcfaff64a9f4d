//! Transaction builder

use bytes::Bytes;
use tessera_primitives::{Address, Gas, HexBytes, Nonce, U256};
use tessera_types::{Transaction, TxPayload, TX_VERSION};

/// Transaction builder with fluent API.
///
/// Set the common fields, then finish with one method per payload kind. The
/// finishing methods borrow the builder, so one builder can stamp out several
/// transactions. Nothing here performs I/O or signs.
///
/// Unstaking, withdraw, proposal, voting and set-document transactions always
/// carry a zero `amount`; proposal, voting and set-document always target
/// [`Address::ZERO`].
#[derive(Debug, Clone)]
pub struct TxBuilder {
    from: Address,
    to: Address,
    nonce: Nonce,
    gas: Gas,
    gas_price: U256,
}

/// Fields of a governance proposal
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProposalParams {
    /// Proposal text
    pub message: String,
    /// First height at which votes count
    pub start_voting_height: u64,
    /// Voting window length in blocks
    pub voting_period_blocks: u64,
    /// Height the result takes effect
    pub applying_height: u64,
    /// Option type
    pub opt_type: u32,
    /// Encoded options
    pub options: Vec<Vec<u8>>,
}

impl From<ProposalParams> for TxPayload {
    fn from(p: ProposalParams) -> Self {
        TxPayload::Proposal {
            message: p.message,
            start_voting_height: p.start_voting_height,
            voting_period_blocks: p.voting_period_blocks,
            applying_height: p.applying_height,
            opt_type: p.opt_type,
            options: p.options,
        }
    }
}

impl TxBuilder {
    /// Create a builder for transactions sent by `from`
    pub fn new(from: Address) -> Self {
        Self {
            from,
            to: Address::ZERO,
            nonce: 0,
            gas: 0,
            gas_price: U256::zero(),
        }
    }

    /// Set the recipient
    pub fn to(mut self, to: Address) -> Self {
        self.to = to;
        self
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = nonce;
        self
    }

    /// Set the gas limit
    pub fn gas(mut self, gas: Gas) -> Self {
        self.gas = gas;
        self
    }

    /// Set the gas price
    pub fn gas_price(mut self, gas_price: impl Into<U256>) -> Self {
        self.gas_price = gas_price.into();
        self
    }

    fn build(&self, to: Address, amount: U256, payload: TxPayload) -> Transaction {
        Transaction::new(
            TX_VERSION,
            self.from,
            to,
            self.nonce,
            self.gas,
            self.gas_price,
            amount,
            payload,
        )
    }

    /// Move `amount` to the recipient
    pub fn transfer(&self, amount: U256) -> Transaction {
        self.build(self.to, amount, TxPayload::Transfer)
    }

    /// Stake `amount` to the recipient validator
    pub fn staking(&self, amount: U256) -> Transaction {
        self.build(self.to, amount, TxPayload::Staking)
    }

    /// Release the stake created by transaction `tx_hash`
    pub fn unstaking(&self, tx_hash: impl Into<HexBytes>) -> Transaction {
        self.build(
            self.to,
            U256::zero(),
            TxPayload::Unstaking {
                tx_hash: tx_hash.into(),
            },
        )
    }

    /// Withdraw `req_amount` of accumulated reward
    pub fn withdraw(&self, req_amount: U256) -> Transaction {
        self.build(self.to, U256::zero(), TxPayload::Withdraw { req_amount })
    }

    /// Open a governance proposal
    pub fn proposal(&self, params: ProposalParams) -> Transaction {
        self.build(Address::ZERO, U256::zero(), params.into())
    }

    /// Vote `choice` on the proposal created by `tx_hash`
    pub fn voting(&self, tx_hash: impl Into<HexBytes>, choice: u32) -> Transaction {
        self.build(
            Address::ZERO,
            U256::zero(),
            TxPayload::Voting {
                tx_hash: tx_hash.into(),
                choice,
            },
        )
    }

    /// Call or create a contract. Leave the recipient at zero to create.
    pub fn contract(&self, amount: U256, data: impl Into<Bytes>) -> Transaction {
        self.build(self.to, amount, TxPayload::Contract { data: data.into() })
    }

    /// Set the sender's account name and document URL
    pub fn set_doc(&self, name: impl Into<String>, url: impl Into<String>) -> Transaction {
        self.build(
            Address::ZERO,
            U256::zero(),
            TxPayload::SetDocument {
                name: name.into(),
                url: url.into(),
            },
        )
    }
}
