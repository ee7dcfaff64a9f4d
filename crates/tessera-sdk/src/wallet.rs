//! Wallet and account management

use std::io::{Read, Write};

use parking_lot::Mutex;
use tessera_crypto::PublicKey;
use tessera_primitives::{Address, Gas, HexBytes, Nonce, U256};
use tessera_types::codec::{signing_digest, signing_preimage};
use tessera_types::{Account, Transaction};
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::keystore::{KdfParams, WalletKey};
use crate::tx_builder::{ProposalParams, TxBuilder};
use crate::types::{BroadcastTxCommitResult, BroadcastTxResult};
use crate::{SdkError, TesseraClient};

struct WalletInner {
    key: WalletKey,
    account: Account,
}

/// A key plus a local copy of its on-chain account.
///
/// The cached nonce is what every built transaction uses. Sending never
/// advances it; call [`add_nonce`](Self::add_nonce) after a transaction is
/// accepted, or [`sync_account`](Self::sync_account) to refresh from the node.
///
/// Reading the nonce, building and signing happen under one lock, so
/// concurrent senders never observe a half-updated account. The lock is not
/// held while waiting on the network.
///
/// Note: Clone is intentionally not implemented to prevent accidental key duplication.
pub struct Wallet {
    inner: Mutex<WalletInner>,
    address: Address,
    public_key: PublicKey,
}

impl Wallet {
    /// Create a wallet around a fresh random key, unlocked
    pub fn new(secret: &[u8]) -> Result<Self, SdkError> {
        Self::new_with_params(secret, KdfParams::default())
    }

    /// Like [`new`](Self::new) with explicit scrypt cost
    pub fn new_with_params(secret: &[u8], params: KdfParams) -> Result<Self, SdkError> {
        Ok(Self::from_key(WalletKey::generate(secret, params)?))
    }

    /// Wrap an existing 32-byte private key, unlocked
    pub fn import_key(private_key: &[u8], secret: &[u8]) -> Result<Self, SdkError> {
        Self::import_key_with_params(private_key, secret, KdfParams::default())
    }

    /// Like [`import_key`](Self::import_key) with explicit scrypt cost
    pub fn import_key_with_params(
        private_key: &[u8],
        secret: &[u8],
        params: KdfParams,
    ) -> Result<Self, SdkError> {
        Ok(Self::from_key(WalletKey::import(private_key, secret, params)?))
    }

    /// Import a hex-encoded private key.
    ///
    /// Accepts both with and without "0x" prefix.
    pub fn import_key_hex(hex: &str, secret: &[u8]) -> Result<Self, SdkError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut bytes = hex::decode(hex)?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(SdkError::InvalidPrivateKey(format!("Expected 32 bytes, got {}", len)));
        }
        let result = Self::import_key(&bytes, secret);
        bytes.zeroize();
        result
    }

    /// Load a key file; the wallet starts locked
    pub fn open<R: Read>(reader: R) -> Result<Self, SdkError> {
        Ok(Self::from_key(WalletKey::open(reader)?))
    }

    /// Write the encrypted key file
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SdkError> {
        self.inner.lock().key.save(writer)
    }

    fn from_key(key: WalletKey) -> Self {
        let address = key.address();
        let public_key = *key.public_key();
        debug!(address = %address.to_hex(), locked = key.is_locked(), "Wallet loaded");
        Self {
            inner: Mutex::new(WalletInner {
                key,
                account: Account::new(address),
            }),
            address,
            public_key,
        }
    }

    // ==================== Key state ====================

    /// Drop the decrypted private key from memory
    pub fn lock(&self) {
        self.inner.lock().key.lock();
    }

    /// Decrypt the private key; a wrong secret leaves the wallet locked
    pub fn unlock(&self, secret: &[u8]) -> Result<(), SdkError> {
        self.inner.lock().key.unlock(secret)
    }

    /// Whether signing is unavailable
    pub fn is_locked(&self) -> bool {
        self.inner.lock().key.is_locked()
    }

    /// Get the wallet's address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the wallet's public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    // ==================== Account cache ====================

    /// Snapshot of the cached account
    pub fn account(&self) -> Account {
        self.inner.lock().account.clone()
    }

    /// Cached nonce
    pub fn nonce(&self) -> Nonce {
        self.inner.lock().account.nonce
    }

    /// Cached balance
    pub fn balance(&self) -> U256 {
        self.inner.lock().account.balance
    }

    /// Advance the cached nonce by one
    pub fn add_nonce(&self) {
        self.inner.lock().account.add_nonce();
    }

    /// Replace the cached account with the node's copy
    pub async fn sync_account(&self, client: &TesseraClient) -> Result<(), SdkError> {
        let account = client.account(&self.address).await?;
        debug!(
            address = %self.address.to_hex(),
            nonce = account.nonce,
            balance = %account.balance,
            "Account synced"
        );
        self.inner.lock().account = account;
        Ok(())
    }

    /// Refresh the cached nonce (refreshes the whole account)
    pub async fn sync_nonce(&self, client: &TesseraClient) -> Result<(), SdkError> {
        self.sync_account(client).await
    }

    /// Refresh the cached balance (refreshes the whole account)
    pub async fn sync_balance(&self, client: &TesseraClient) -> Result<(), SdkError> {
        self.sync_account(client).await
    }

    // ==================== Signing ====================

    /// Sign `tx` for `chain_id`, storing the signature in it.
    ///
    /// Returns the 65-byte signature and the preimage it was computed over.
    pub fn sign_tx(
        &self,
        tx: &mut Transaction,
        chain_id: &str,
    ) -> Result<(Vec<u8>, Vec<u8>), SdkError> {
        let inner = self.inner.lock();
        Self::sign_locked(&inner.key, self.address, tx, chain_id)
    }

    fn sign_locked(
        key: &WalletKey,
        address: Address,
        tx: &mut Transaction,
        chain_id: &str,
    ) -> Result<(Vec<u8>, Vec<u8>), SdkError> {
        if key.is_locked() {
            return Err(SdkError::Authentication("wallet is locked".to_string()));
        }
        if tx.is_signed() {
            return Err(SdkError::State("transaction is already signed".to_string()));
        }
        if tx.from() != &address {
            return Err(SdkError::State(format!(
                "transaction sender {} is not this wallet ({})",
                tx.from().to_hex(),
                address.to_hex()
            )));
        }

        let preimage = signing_preimage(tx, chain_id)?;
        let signature = key.sign_digest(&signing_digest(&preimage))?.to_bytes().to_vec();
        tx.set_signature(signature.clone())?;
        Ok((signature, preimage))
    }

    /// Build and sign a transaction at the cached nonce, all under the lock
    pub(crate) fn compose(
        &self,
        chain_id: &str,
        build: impl FnOnce(TxBuilder) -> Transaction,
    ) -> Result<Transaction, SdkError> {
        let inner = self.inner.lock();
        if inner.key.is_locked() {
            return Err(SdkError::Authentication("wallet is locked".to_string()));
        }
        let mut tx = build(TxBuilder::new(self.address).nonce(inner.account.nonce));
        Self::sign_locked(&inner.key, self.address, &mut tx, chain_id)?;
        Ok(tx)
    }

    // ==================== Sending ====================

    /// Sign `tx` and submit it without waiting for validation
    pub async fn send_tx_async(
        &self,
        tx: &mut Transaction,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        self.sign_tx(tx, client.chain_id())?;
        client.send_tx_async(tx).await
    }

    /// Sign `tx` and submit it, waiting for admission
    pub async fn send_tx_sync(
        &self,
        tx: &mut Transaction,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        self.sign_tx(tx, client.chain_id())?;
        client.send_tx_sync(tx).await
    }

    /// Sign `tx` and submit it, waiting for execution in a block
    pub async fn send_tx_commit(
        &self,
        tx: &mut Transaction,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        self.sign_tx(tx, client.chain_id())?;
        let result = client.send_tx_commit(tx).await?;
        info!(
            hash = %hex::encode(result.hash.as_slice()),
            height = result.height,
            ok = result.is_ok(),
            "Transaction committed"
        );
        Ok(result)
    }

    // ==================== Transfer ====================

    /// Transfer `amount` to `to` (async tier)
    pub async fn transfer_async(
        &self,
        to: Address,
        gas: Gas,
        gas_price: U256,
        amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).transfer(amount)
        })?;
        client.send_tx_async(&tx).await
    }

    /// Transfer `amount` to `to` (sync tier)
    pub async fn transfer_sync(
        &self,
        to: Address,
        gas: Gas,
        gas_price: U256,
        amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).transfer(amount)
        })?;
        client.send_tx_sync(&tx).await
    }

    /// Transfer `amount` to `to` (commit tier)
    pub async fn transfer_commit(
        &self,
        to: Address,
        gas: Gas,
        gas_price: U256,
        amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).transfer(amount)
        })?;
        client.send_tx_commit(&tx).await
    }

    // ==================== Staking ====================

    /// Stake `amount` to validator `to` (async tier)
    pub async fn staking_async(
        &self,
        to: Address,
        gas: Gas,
        gas_price: U256,
        amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).staking(amount)
        })?;
        client.send_tx_async(&tx).await
    }

    /// Stake `amount` to validator `to` (sync tier)
    pub async fn staking_sync(
        &self,
        to: Address,
        gas: Gas,
        gas_price: U256,
        amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).staking(amount)
        })?;
        client.send_tx_sync(&tx).await
    }

    /// Stake `amount` to validator `to` (commit tier)
    pub async fn staking_commit(
        &self,
        to: Address,
        gas: Gas,
        gas_price: U256,
        amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).staking(amount)
        })?;
        client.send_tx_commit(&tx).await
    }

    // ==================== Unstaking ====================

    /// Release the stake created by `tx_hash` (async tier)
    pub async fn unstaking_async(
        &self,
        to: Address,
        tx_hash: impl Into<HexBytes>,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).unstaking(tx_hash)
        })?;
        client.send_tx_async(&tx).await
    }

    /// Release the stake created by `tx_hash` (sync tier)
    pub async fn unstaking_sync(
        &self,
        to: Address,
        tx_hash: impl Into<HexBytes>,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).unstaking(tx_hash)
        })?;
        client.send_tx_sync(&tx).await
    }

    /// Release the stake created by `tx_hash` (commit tier)
    pub async fn unstaking_commit(
        &self,
        to: Address,
        tx_hash: impl Into<HexBytes>,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.to(to).gas(gas).gas_price(gas_price).unstaking(tx_hash)
        })?;
        client.send_tx_commit(&tx).await
    }

    // ==================== Withdraw ====================
    // Rewards are withdrawn to the wallet's own address.

    /// Withdraw `req_amount` of reward (async tier)
    pub async fn withdraw_async(
        &self,
        gas: Gas,
        gas_price: U256,
        req_amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let me = self.address;
        let tx = self.compose(client.chain_id(), |b| {
            b.to(me).gas(gas).gas_price(gas_price).withdraw(req_amount)
        })?;
        client.send_tx_async(&tx).await
    }

    /// Withdraw `req_amount` of reward (sync tier)
    pub async fn withdraw_sync(
        &self,
        gas: Gas,
        gas_price: U256,
        req_amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let me = self.address;
        let tx = self.compose(client.chain_id(), |b| {
            b.to(me).gas(gas).gas_price(gas_price).withdraw(req_amount)
        })?;
        client.send_tx_sync(&tx).await
    }

    /// Withdraw `req_amount` of reward (commit tier)
    pub async fn withdraw_commit(
        &self,
        gas: Gas,
        gas_price: U256,
        req_amount: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let me = self.address;
        let tx = self.compose(client.chain_id(), |b| {
            b.to(me).gas(gas).gas_price(gas_price).withdraw(req_amount)
        })?;
        client.send_tx_commit(&tx).await
    }

    // ==================== Governance ====================

    /// Open a proposal (async tier)
    pub async fn proposal_async(
        &self,
        gas: Gas,
        gas_price: U256,
        params: ProposalParams,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).proposal(params)
        })?;
        client.send_tx_async(&tx).await
    }

    /// Open a proposal (sync tier)
    pub async fn proposal_sync(
        &self,
        gas: Gas,
        gas_price: U256,
        params: ProposalParams,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).proposal(params)
        })?;
        client.send_tx_sync(&tx).await
    }

    /// Open a proposal (commit tier)
    pub async fn proposal_commit(
        &self,
        gas: Gas,
        gas_price: U256,
        params: ProposalParams,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).proposal(params)
        })?;
        client.send_tx_commit(&tx).await
    }

    /// Vote on the proposal created by `tx_hash` (async tier)
    pub async fn voting_async(
        &self,
        tx_hash: impl Into<HexBytes>,
        choice: u32,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).voting(tx_hash, choice)
        })?;
        client.send_tx_async(&tx).await
    }

    /// Vote on the proposal created by `tx_hash` (sync tier)
    pub async fn voting_sync(
        &self,
        tx_hash: impl Into<HexBytes>,
        choice: u32,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).voting(tx_hash, choice)
        })?;
        client.send_tx_sync(&tx).await
    }

    /// Vote on the proposal created by `tx_hash` (commit tier)
    pub async fn voting_commit(
        &self,
        tx_hash: impl Into<HexBytes>,
        choice: u32,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).voting(tx_hash, choice)
        })?;
        client.send_tx_commit(&tx).await
    }

    // ==================== Account document ====================

    /// Set the account name and document URL (async tier)
    pub async fn set_doc_async(
        &self,
        name: impl Into<String>,
        url: impl Into<String>,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).set_doc(name, url)
        })?;
        client.send_tx_async(&tx).await
    }

    /// Set the account name and document URL (sync tier)
    pub async fn set_doc_sync(
        &self,
        name: impl Into<String>,
        url: impl Into<String>,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).set_doc(name, url)
        })?;
        client.send_tx_sync(&tx).await
    }

    /// Set the account name and document URL (commit tier)
    pub async fn set_doc_commit(
        &self,
        name: impl Into<String>,
        url: impl Into<String>,
        gas: Gas,
        gas_price: U256,
        client: &TesseraClient,
    ) -> Result<BroadcastTxCommitResult, SdkError> {
        let tx = self.compose(client.chain_id(), |b| {
            b.gas(gas).gas_price(gas_price).set_doc(name, url)
        })?;
        client.send_tx_commit(&tx).await
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("nonce", &inner.account.nonce)
            .field("locked", &inner.key.is_locked())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::codec::recover_signer;

    const FAST: KdfParams = KdfParams { n: 1024, r: 8, p: 1 };

    fn wallet() -> Wallet {
        Wallet::new_with_params(b"pw", FAST).unwrap()
    }

    #[test]
    fn test_wallet_from_hex() {
        let wallet = Wallet::import_key_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            b"pw",
        )
        .unwrap();
        assert_eq!(wallet.address().to_hex(), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn test_wallet_invalid_hex_length() {
        assert!(matches!(
            Wallet::import_key_hex("0x1234", b"pw"),
            Err(SdkError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_sign_tx_recovers_to_wallet() {
        let wallet = wallet();
        let mut tx = TxBuilder::new(wallet.address())
            .to(Address::from_bytes([9; 20]))
            .gas(21_000)
            .transfer(U256::from(5u64));
        let (sig, preimage) = wallet.sign_tx(&mut tx, "chain-a").unwrap();

        assert_eq!(sig.len(), 65);
        assert_eq!(tx.signature(), sig.as_slice());
        assert_eq!(preimage, signing_preimage(&tx, "chain-a").unwrap());
        assert_eq!(recover_signer(&tx, "chain-a").unwrap(), wallet.address());
    }

    #[test]
    fn test_sign_tx_rejects_foreign_sender() {
        let wallet = wallet();
        let mut tx = TxBuilder::new(Address::from_bytes([1; 20])).transfer(U256::one());
        assert!(matches!(wallet.sign_tx(&mut tx, "c"), Err(SdkError::State(_))));
        assert!(!tx.is_signed());
    }

    #[test]
    fn test_sign_tx_twice_rejected() {
        let wallet = wallet();
        let mut tx = TxBuilder::new(wallet.address()).transfer(U256::one());
        wallet.sign_tx(&mut tx, "c").unwrap();
        assert!(matches!(wallet.sign_tx(&mut tx, "c"), Err(SdkError::State(_))));
    }

    #[test]
    fn test_locked_wallet_cannot_sign() {
        let wallet = wallet();
        wallet.lock();
        assert!(wallet.is_locked());

        let mut tx = TxBuilder::new(wallet.address()).transfer(U256::one());
        assert!(matches!(wallet.sign_tx(&mut tx, "c"), Err(SdkError::Authentication(_))));
        assert!(!tx.is_signed());

        wallet.unlock(b"pw").unwrap();
        wallet.sign_tx(&mut tx, "c").unwrap();
    }

    #[test]
    fn test_compose_uses_cached_nonce() {
        let wallet = wallet();
        wallet.add_nonce();
        wallet.add_nonce();

        let tx = wallet
            .compose("c", |b| b.to(Address::from_bytes([3; 20])).transfer(U256::one()))
            .unwrap();
        assert_eq!(tx.nonce(), 2);
        assert_eq!(tx.from(), &wallet.address());
        assert!(tx.is_signed());
        // composing never advances the nonce
        assert_eq!(wallet.nonce(), 2);
    }

    #[test]
    fn test_fresh_account_cache() {
        let wallet = wallet();
        let account = wallet.account();
        assert_eq!(account.address, wallet.address());
        assert_eq!(account.nonce, 0);
        assert!(account.balance.is_zero());
    }

    #[test]
    fn test_wallet_debug_hides_key() {
        let wallet = wallet();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("Wallet"));
        assert!(debug.contains("address"));
        assert!(!debug.contains("signing_key"));
    }
}
