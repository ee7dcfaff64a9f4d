//! # tessera-sdk
//!
//! Rust client SDK for the Tessera proof-of-stake chain.
//!
//! ## Features
//!
//! - **TesseraClient**: JSON-RPC facade for queries and the three submission tiers
//! - **Wallet**: encrypted key, local nonce/balance cache and per-kind send helpers
//! - **TxBuilder**: Fluent API for building transactions
//! - **EvmContract**: ABI-driven calls, gas estimation and deployment
//! - **Subscriber**: WebSocket event subscriptions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tessera_sdk::{Address, ClientConfig, TesseraClient, Wallet, U256};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TesseraClient::connect(&ClientConfig::default()).await?;
//!
//!     let wallet = Wallet::open(std::fs::File::open("alice.json")?)?;
//!     wallet.unlock(b"correct horse")?;
//!     wallet.sync_account(&client).await?;
//!
//!     let to = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d")?;
//!     let result = wallet
//!         .transfer_commit(to, 1_000_000, U256::from(10u64), U256::from(1000u64), &client)
//!         .await?;
//!     if result.is_ok() {
//!         wallet.add_nonce();
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Contract Interaction
//!
//! ```rust,no_run
//! use tessera_sdk::abi::Token;
//! use tessera_sdk::{EvmContract, ExecParams, TesseraClient, Wallet, U256};
//!
//! async fn deploy(client: &TesseraClient, wallet: &Wallet) -> Result<(), tessera_sdk::SdkError> {
//!     let counter = EvmContract::load("build/Counter.json")?;
//!     let params = ExecParams {
//!         nonce: wallet.nonce(),
//!         gas: 3_000_000,
//!         gas_price: U256::from(10u64),
//!         amount: U256::zero(),
//!     };
//!     counter.exec_commit("", &[Token::uint(1)], wallet, params, client).await?;
//!
//!     let value = counter.call("get", &[], &wallet.address(), 0, client).await?;
//!     println!("counter = {:?}", value);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
mod client;
pub mod config;
pub mod contract;
mod error;
pub mod keystore;
pub mod subscriber;
pub mod transport;
mod tx_builder;
pub mod types;
mod wallet;

pub use client::TesseraClient;
pub use config::{ClientConfig, RetryPolicy};
pub use contract::{EvmContract, ExecParams};
pub use error::{ErrorKind, SdkError};
pub use keystore::{KdfParams, WalletKey};
pub use subscriber::{Completion, Subscriber};
pub use transport::{MockTransport, Transport};
pub use tx_builder::{ProposalParams, TxBuilder};
pub use wallet::Wallet;

#[cfg(feature = "http")]
pub use transport::HttpTransport;

// Re-export primitives for convenience
pub use tessera_primitives::{Address, BlockHeight, Gas, HexBytes, Nonce, H256, U256};
pub use tessera_types::{Account, Transaction, TxKind, TxPayload};
