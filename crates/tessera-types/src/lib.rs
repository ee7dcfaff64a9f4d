//! # tessera-types
//!
//! Core client-side types for the Tessera chain.
//!
//! This crate provides:
//! - [`Transaction`](transaction::Transaction) with its closed set of payload kinds
//! - [`codec`] - canonical RLP encoding, decoding and the chain-bound signing preimage
//! - [`Account`](account::Account) - the account state mirrored by wallets

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod codec;
pub mod transaction;

pub use account::Account;
pub use codec::CodecError;
pub use transaction::{Transaction, TxKind, TxPayload, TX_VERSION};
