//! # tessera-primitives
//!
//! Primitive types shared by every Tessera crate.
//!
//! - [`Address`]: 20-byte account or contract identifier
//! - [`H256`]: 32-byte hash
//! - [`HexBytes`]: byte string rendered as hex on the wire
//! - [`U256`]: 256-bit unsigned integer used for balances and amounts

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod amount;
mod bytes;
mod error;
mod hash;

pub use address::{Address, AddressError};
pub use amount::{parse_u256, AmountError};
pub use bytes::HexBytes;
pub use error::PrimitiveError;
pub use hash::{HashError, H256};

pub use primitive_types::U256;

/// Block height type. The node reports heights as signed 64-bit values;
/// 0 in a query means "latest".
pub type BlockHeight = i64;

/// Account nonce type
pub type Nonce = u64;

/// Gas type
pub type Gas = u64;
