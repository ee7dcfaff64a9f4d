//! Canonical transaction encoding.
//!
//! A transaction is an RLP list:
//!
//! ```text
//! [version, nonce, from, to, amount, gas, gas_price, kind, payload, signature]
//! ```
//!
//! `payload` is itself the RLP encoding of the kind-specific fields (empty for
//! transfer and staking). The encoding is a pure function of the logical
//! transaction, so every client and the node derive identical bytes.
//!
//! The signing preimage is the encoding with an empty signature, prefixed by a
//! header naming the chain id and the body length. A signature over one chain's
//! preimage therefore never verifies on another chain.

use bytes::Bytes;
use rlp::{DecoderError, Rlp, RlpStream};
use tessera_crypto::{keccak256, public_key_to_address, recover_public_key, CryptoError, Signature};
use tessera_primitives::{Address, HexBytes, H256};
use thiserror::Error;

use crate::transaction::{Transaction, TxKind, TxPayload};

const TX_FIELDS: usize = 10;

/// Codec error
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed RLP
    #[error("rlp: {0}")]
    Rlp(#[from] DecoderError),

    /// Unknown payload kind tag
    #[error("unknown transaction kind: {0}")]
    UnknownKind(u8),

    /// Wrong number of list items
    #[error("expected {expected} fields, got {got}")]
    FieldCount {
        /// Expected item count
        expected: usize,
        /// Actual item count
        got: usize,
    },

    /// Bytes left over after the transaction
    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    /// Signing requires a chain id
    #[error("chain id must not be empty")]
    EmptyChainId,

    /// Transaction carries no signature
    #[error("transaction is not signed")]
    Unsigned,

    /// Transaction already carries a signature
    #[error("transaction is already signed")]
    AlreadySigned,

    /// Signature could not be parsed or recovered
    #[error("signature: {0}")]
    Crypto(#[from] CryptoError),
}

/// Encode a transaction, including its signature, to wire bytes
pub fn encode(tx: &Transaction) -> Vec<u8> {
    encode_with_signature(tx, tx.signature())
}

fn encode_with_signature(tx: &Transaction, signature: &[u8]) -> Vec<u8> {
    let mut s = RlpStream::new_list(TX_FIELDS);
    s.append(&tx.version());
    s.append(&tx.nonce());
    s.append(tx.from());
    s.append(tx.to());
    s.append(tx.amount());
    s.append(&tx.gas());
    s.append(tx.gas_price());
    s.append(&tx.kind().code());
    s.append(&encode_payload(tx.payload()));
    s.append(&signature.to_vec());
    s.out().to_vec()
}

fn encode_payload(payload: &TxPayload) -> Vec<u8> {
    match payload {
        TxPayload::Transfer | TxPayload::Staking => Vec::new(),
        TxPayload::Unstaking { tx_hash } => {
            let mut s = RlpStream::new_list(1);
            s.append(&tx_hash.as_slice().to_vec());
            s.out().to_vec()
        }
        TxPayload::Withdraw { req_amount } => {
            let mut s = RlpStream::new_list(1);
            s.append(req_amount);
            s.out().to_vec()
        }
        TxPayload::Proposal {
            message,
            start_voting_height,
            voting_period_blocks,
            applying_height,
            opt_type,
            options,
        } => {
            let mut s = RlpStream::new_list(6);
            s.append(message);
            s.append(start_voting_height);
            s.append(voting_period_blocks);
            s.append(applying_height);
            s.append(opt_type);
            s.append_list::<Vec<u8>, Vec<u8>>(options);
            s.out().to_vec()
        }
        TxPayload::Voting { tx_hash, choice } => {
            let mut s = RlpStream::new_list(2);
            s.append(&tx_hash.as_slice().to_vec());
            s.append(choice);
            s.out().to_vec()
        }
        TxPayload::Contract { data } => {
            let mut s = RlpStream::new_list(1);
            s.append(&data.to_vec());
            s.out().to_vec()
        }
        TxPayload::SetDocument { name, url } => {
            let mut s = RlpStream::new_list(2);
            s.append(name);
            s.append(url);
            s.out().to_vec()
        }
    }
}

/// Decode wire bytes into a transaction
pub fn decode(bytes: &[u8]) -> Result<Transaction, CodecError> {
    let rlp = Rlp::new(bytes);
    let total = rlp.payload_info()?.total();
    if total != bytes.len() {
        return Err(CodecError::TrailingBytes(bytes.len() - total));
    }
    expect_fields(&rlp, TX_FIELDS)?;

    let kind_code: u8 = rlp.val_at(7)?;
    let kind = TxKind::from_code(kind_code).ok_or(CodecError::UnknownKind(kind_code))?;
    let payload_bytes: Vec<u8> = rlp.val_at(8)?;
    let payload = decode_payload(kind, &payload_bytes)?;

    let mut tx = Transaction::new(
        rlp.val_at(0)?,
        rlp.val_at(2)?,
        rlp.val_at(3)?,
        rlp.val_at(1)?,
        rlp.val_at(5)?,
        rlp.val_at(6)?,
        rlp.val_at(4)?,
        payload,
    );
    let signature: Vec<u8> = rlp.val_at(9)?;
    if !signature.is_empty() {
        tx.set_signature(signature)?;
    }
    Ok(tx)
}

fn expect_fields(rlp: &Rlp, expected: usize) -> Result<(), CodecError> {
    let got = rlp.item_count()?;
    if got != expected {
        return Err(CodecError::FieldCount { expected, got });
    }
    Ok(())
}

fn decode_payload(kind: TxKind, bytes: &[u8]) -> Result<TxPayload, CodecError> {
    let rlp = Rlp::new(bytes);
    let payload = match kind {
        TxKind::Transfer | TxKind::Staking => {
            if !bytes.is_empty() {
                return Err(CodecError::FieldCount { expected: 0, got: rlp.item_count()? });
            }
            if kind == TxKind::Transfer {
                TxPayload::Transfer
            } else {
                TxPayload::Staking
            }
        }
        TxKind::Unstaking => {
            expect_fields(&rlp, 1)?;
            TxPayload::Unstaking {
                tx_hash: HexBytes::new(rlp.val_at::<Vec<u8>>(0)?),
            }
        }
        TxKind::Withdraw => {
            expect_fields(&rlp, 1)?;
            TxPayload::Withdraw {
                req_amount: rlp.val_at(0)?,
            }
        }
        TxKind::Proposal => {
            expect_fields(&rlp, 6)?;
            TxPayload::Proposal {
                message: rlp.val_at(0)?,
                start_voting_height: rlp.val_at(1)?,
                voting_period_blocks: rlp.val_at(2)?,
                applying_height: rlp.val_at(3)?,
                opt_type: rlp.val_at(4)?,
                options: rlp.list_at(5)?,
            }
        }
        TxKind::Voting => {
            expect_fields(&rlp, 2)?;
            TxPayload::Voting {
                tx_hash: HexBytes::new(rlp.val_at::<Vec<u8>>(0)?),
                choice: rlp.val_at(1)?,
            }
        }
        TxKind::Contract => {
            expect_fields(&rlp, 1)?;
            TxPayload::Contract {
                data: Bytes::from(rlp.val_at::<Vec<u8>>(0)?),
            }
        }
        TxKind::SetDocument => {
            expect_fields(&rlp, 2)?;
            TxPayload::SetDocument {
                name: rlp.val_at(0)?,
                url: rlp.val_at(1)?,
            }
        }
    };
    Ok(payload)
}

impl Transaction {
    /// Wire encoding, signature included
    pub fn encode(&self) -> Vec<u8> {
        encode(self)
    }

    /// Parse wire bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes)
    }
}

/// Bytes a signature is computed over: chain header followed by the unsigned encoding
pub fn signing_preimage(tx: &Transaction, chain_id: &str) -> Result<Vec<u8>, CodecError> {
    if chain_id.is_empty() {
        return Err(CodecError::EmptyChainId);
    }
    let body = encode_with_signature(tx, &[]);
    let mut preimage =
        format!("\x19Tessera({}) Signed Message:\n{}", chain_id, body.len()).into_bytes();
    preimage.extend_from_slice(&body);
    Ok(preimage)
}

/// Digest actually fed to ECDSA: keccak256 of the preimage
pub fn signing_digest(preimage: &[u8]) -> H256 {
    keccak256(preimage)
}

/// Recover the address that signed `tx` for `chain_id`
pub fn recover_signer(tx: &Transaction, chain_id: &str) -> Result<Address, CodecError> {
    if !tx.is_signed() {
        return Err(CodecError::Unsigned);
    }
    let signature = Signature::from_slice(tx.signature())?;
    let digest = signing_digest(&signing_preimage(tx, chain_id)?);
    let public_key = recover_public_key(&digest, &signature)?;
    Ok(public_key_to_address(&public_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TX_VERSION;
    use proptest::prelude::*;
    use tessera_primitives::U256;

    fn tx(payload: TxPayload) -> Transaction {
        let to = match payload {
            TxPayload::Proposal { .. } | TxPayload::Voting { .. } | TxPayload::SetDocument { .. } => {
                Address::ZERO
            }
            _ => Address::from_bytes([0x22; 20]),
        };
        Transaction::new(
            TX_VERSION,
            Address::from_bytes([0x11; 20]),
            to,
            3,
            50_000,
            U256::from(250u64),
            U256::from(9u64),
            payload,
        )
    }

    fn all_payloads() -> Vec<TxPayload> {
        vec![
            TxPayload::Transfer,
            TxPayload::Staking,
            TxPayload::Unstaking { tx_hash: HexBytes::new(vec![0xAB; 32]) },
            TxPayload::Withdraw { req_amount: U256::from(77u64) },
            TxPayload::Proposal {
                message: "raise gas floor".to_string(),
                start_voting_height: 10,
                voting_period_blocks: 100,
                applying_height: 200,
                opt_type: 1,
                options: vec![b"yes".to_vec(), b"no".to_vec()],
            },
            TxPayload::Voting { tx_hash: HexBytes::new(vec![0xCD; 32]), choice: 1 },
            TxPayload::Contract { data: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]) },
            TxPayload::SetDocument { name: "alice".to_string(), url: "https://a.example".to_string() },
        ]
    }

    #[test]
    fn test_every_kind_decodes_to_itself() {
        for payload in all_payloads() {
            let mut original = tx(payload);
            original.set_signature(vec![7u8; 65]).unwrap();
            let decoded = decode(&encode(&original)).unwrap();
            assert_eq!(decoded, original);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        for payload in all_payloads() {
            let a = tx(payload.clone());
            let b = tx(payload);
            assert_eq!(encode(&a), encode(&b));
        }
    }

    #[test]
    fn test_preimage_excludes_signature() {
        let unsigned = tx(TxPayload::Transfer);
        let mut signed = unsigned.clone();
        signed.set_signature(vec![1u8; 65]).unwrap();
        assert_eq!(
            signing_preimage(&unsigned, "chain-a").unwrap(),
            signing_preimage(&signed, "chain-a").unwrap()
        );
    }

    #[test]
    fn test_preimage_header() {
        let preimage = signing_preimage(&tx(TxPayload::Transfer), "testnet-1").unwrap();
        assert!(preimage.starts_with(b"\x19Tessera(testnet-1) Signed Message:\n"));
    }

    #[test]
    fn test_empty_chain_id_rejected() {
        assert!(matches!(
            signing_preimage(&tx(TxPayload::Transfer), ""),
            Err(CodecError::EmptyChainId)
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let mut s = RlpStream::new_list(TX_FIELDS);
        s.append(&1u32);
        s.append(&0u64);
        s.append(&Address::ZERO);
        s.append(&Address::ZERO);
        s.append(&U256::zero());
        s.append(&0u64);
        s.append(&U256::zero());
        s.append(&42u8);
        s.append(&Vec::<u8>::new());
        s.append(&Vec::<u8>::new());
        assert!(matches!(decode(&s.out()), Err(CodecError::UnknownKind(42))));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = encode(&tx(TxPayload::Transfer));
        bytes.push(0x00);
        assert!(matches!(decode(&bytes), Err(CodecError::TrailingBytes(1))));
    }

    #[test]
    fn test_recover_unsigned() {
        assert!(matches!(
            recover_signer(&tx(TxPayload::Staking), "c"),
            Err(CodecError::Unsigned)
        ));
    }

    proptest! {
        #[test]
        fn prop_preimage_is_chain_bound(a in "[a-z0-9-]{1,16}", b in "[a-z0-9-]{1,16}") {
            prop_assume!(a != b);
            let t = tx(TxPayload::Transfer);
            prop_assert_ne!(signing_preimage(&t, &a).unwrap(), signing_preimage(&t, &b).unwrap());
        }

        #[test]
        fn prop_nonce_changes_encoding(n1 in any::<u64>(), n2 in any::<u64>()) {
            prop_assume!(n1 != n2);
            let make = |n| Transaction::new(
                TX_VERSION, Address::ZERO, Address::ZERO, n, 1, U256::one(), U256::zero(), TxPayload::Transfer,
            );
            prop_assert_ne!(encode(&make(n1)), encode(&make(n2)));
        }
    }
}
