//! Encrypted key storage.
//!
//! Keys are stored in the Web3 keystore v3 layout: scrypt derives a 32-byte
//! key from the secret, the first half encrypts the private key with
//! AES-128-CTR and the second half authenticates the ciphertext with
//! `keccak256(mac_key || ciphertext)`. The compressed public key is stored in
//! the clear so a locked key still knows its identity.

use std::io::{Read, Write};

use aes::cipher::{KeyIvInit, StreamCipher};
use k256::ecdsa::SigningKey;
use rand::{rngs::OsRng, RngCore};
use scrypt::{scrypt, Params as ScryptParams};
use serde::{Deserialize, Serialize};
use tessera_crypto::{
    compressed_public_key, keccak256, public_key_from_bytes, public_key_to_address, sign,
    PublicKey, Signature,
};
use tessera_primitives::{Address, H256};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::SdkError;

type Aes128Ctr = ctr::Ctr64BE<aes::Aes128>;

const KEYSTORE_VERSION: u32 = 3;
const DKLEN: u32 = 32;

/// scrypt cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// CPU/memory cost, a power of two
    pub n: u32,
    /// Block size
    pub r: u32,
    /// Parallelism
    pub p: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self { n: 8192, r: 8, p: 1 }
    }
}

impl KdfParams {
    fn scrypt_params(&self) -> Result<ScryptParams, SdkError> {
        if self.n < 2 || !self.n.is_power_of_two() {
            return Err(SdkError::Keystore(format!("scrypt n must be a power of two, got {}", self.n)));
        }
        ScryptParams::new(self.n.trailing_zeros() as u8, self.r, self.p, DKLEN as usize)
            .map_err(|e| SdkError::Keystore(format!("invalid scrypt params: {}", e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeystoreFile {
    version: u32,
    id: String,
    address: String,
    #[serde(rename = "pubkey")]
    public_key: String,
    crypto: KeystoreCrypto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeystoreCrypto {
    cipher: String,
    ciphertext: String,
    cipherparams: CipherParams,
    kdf: String,
    kdfparams: StoredKdfParams,
    mac: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CipherParams {
    iv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredKdfParams {
    dklen: u32,
    n: u32,
    r: u32,
    p: u32,
    salt: String,
}

/// A secp256k1 key held encrypted at rest.
///
/// While locked only the public half is usable. Unlocking decrypts the private
/// key into memory; locking drops it, and the key material is zeroized.
pub struct WalletKey {
    address: Address,
    public_key: PublicKey,
    stored: KeystoreFile,
    signing_key: Option<SigningKey>,
}

impl WalletKey {
    /// Generate a fresh random key, unlocked
    pub fn generate(secret: &[u8], params: KdfParams) -> Result<Self, SdkError> {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key, secret, params)
    }

    /// Wrap an existing 32-byte private key, unlocked
    pub fn import(private_key: &[u8], secret: &[u8], params: KdfParams) -> Result<Self, SdkError> {
        let signing_key = SigningKey::from_slice(private_key)
            .map_err(|e| SdkError::InvalidPrivateKey(e.to_string()))?;
        Self::from_signing_key(signing_key, secret, params)
    }

    fn from_signing_key(
        signing_key: SigningKey,
        secret: &[u8],
        params: KdfParams,
    ) -> Result<Self, SdkError> {
        let public_key = *signing_key.verifying_key();
        let address = public_key_to_address(&public_key);
        let stored = encrypt(&signing_key, &public_key, &address, secret, params)?;
        Ok(Self {
            address,
            public_key,
            stored,
            signing_key: Some(signing_key),
        })
    }

    /// Read a key file. The key starts locked.
    pub fn open<R: Read>(reader: R) -> Result<Self, SdkError> {
        let stored: KeystoreFile = serde_json::from_reader(reader)
            .map_err(|e| SdkError::Keystore(format!("malformed key file: {}", e)))?;
        if stored.version != KEYSTORE_VERSION {
            return Err(SdkError::Keystore(format!("unsupported version {}", stored.version)));
        }

        let public_key = public_key_from_bytes(&hex::decode(&stored.public_key)?)
            .map_err(|e| SdkError::Keystore(e.to_string()))?;
        let address = public_key_to_address(&public_key);
        let recorded = Address::from_hex(&stored.address)?;
        if recorded != address {
            return Err(SdkError::Keystore(format!(
                "address {} does not match public key ({})",
                recorded.to_hex(),
                address.to_hex()
            )));
        }

        Ok(Self {
            address,
            public_key,
            stored,
            signing_key: None,
        })
    }

    /// Write the encrypted key file
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SdkError> {
        serde_json::to_writer_pretty(writer, &self.stored)
            .map_err(|e| SdkError::Keystore(e.to_string()))
    }

    /// Decrypt the private key. On a wrong secret the key stays locked.
    pub fn unlock(&mut self, secret: &[u8]) -> Result<(), SdkError> {
        let mut plaintext = decrypt(&self.stored, secret)?;
        let signing_key = SigningKey::from_slice(&plaintext);
        plaintext.zeroize();
        let signing_key = signing_key.map_err(|e| SdkError::Keystore(e.to_string()))?;

        if public_key_to_address(signing_key.verifying_key()) != self.address {
            return Err(SdkError::Keystore("decrypted key does not match address".to_string()));
        }
        self.signing_key = Some(signing_key);
        Ok(())
    }

    /// Drop the decrypted private key
    pub fn lock(&mut self) {
        self.signing_key = None;
    }

    /// Whether the private key is unavailable
    pub fn is_locked(&self) -> bool {
        self.signing_key.is_none()
    }

    /// Address derived from the public key
    pub fn address(&self) -> Address {
        self.address
    }

    /// Public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// 33-byte compressed public key
    pub fn compressed_public_key(&self) -> Vec<u8> {
        compressed_public_key(&self.public_key)
    }

    /// Sign a 32-byte digest
    pub fn sign_digest(&self, digest: &H256) -> Result<Signature, SdkError> {
        let key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| SdkError::Authentication("wallet is locked".to_string()))?;
        Ok(sign(digest, key)?)
    }
}

impl std::fmt::Debug for WalletKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKey")
            .field("address", &self.address)
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

fn derive_key(
    secret: &[u8],
    salt: &[u8],
    params: &ScryptParams,
) -> Result<[u8; DKLEN as usize], SdkError> {
    let mut derived = [0u8; DKLEN as usize];
    scrypt(secret, salt, params, &mut derived)
        .map_err(|e| SdkError::Keystore(format!("scrypt failed: {}", e)))?;
    Ok(derived)
}

fn mac(mac_key: &[u8], ciphertext: &[u8]) -> H256 {
    let mut data = Vec::with_capacity(mac_key.len() + ciphertext.len());
    data.extend_from_slice(mac_key);
    data.extend_from_slice(ciphertext);
    keccak256(&data)
}

fn encrypt(
    signing_key: &SigningKey,
    public_key: &PublicKey,
    address: &Address,
    secret: &[u8],
    params: KdfParams,
) -> Result<KeystoreFile, SdkError> {
    let mut salt = [0u8; 32];
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let mut derived = derive_key(secret, &salt, &params.scrypt_params()?)?;

    let mut ciphertext: Vec<u8> = signing_key.to_bytes().to_vec();
    let mut cipher = Aes128Ctr::new(derived[..16].into(), iv.as_slice().into());
    cipher.apply_keystream(&mut ciphertext);
    let mac = mac(&derived[16..], &ciphertext);
    derived.zeroize();

    Ok(KeystoreFile {
        version: KEYSTORE_VERSION,
        id: Uuid::new_v4().to_string(),
        address: hex::encode(address.as_bytes()),
        public_key: hex::encode(compressed_public_key(public_key)),
        crypto: KeystoreCrypto {
            cipher: "aes-128-ctr".to_string(),
            ciphertext: hex::encode(&ciphertext),
            cipherparams: CipherParams {
                iv: hex::encode(iv),
            },
            kdf: "scrypt".to_string(),
            kdfparams: StoredKdfParams {
                dklen: DKLEN,
                n: params.n,
                r: params.r,
                p: params.p,
                salt: hex::encode(salt),
            },
            mac: hex::encode(mac.as_bytes()),
        },
    })
}

fn decrypt(stored: &KeystoreFile, secret: &[u8]) -> Result<Vec<u8>, SdkError> {
    let crypto = &stored.crypto;
    if crypto.kdf != "scrypt" || crypto.cipher != "aes-128-ctr" {
        return Err(SdkError::Keystore(format!(
            "unsupported kdf/cipher {}/{}",
            crypto.kdf, crypto.cipher
        )));
    }
    if crypto.kdfparams.dklen != DKLEN {
        return Err(SdkError::Keystore(format!("unsupported dklen {}", crypto.kdfparams.dklen)));
    }

    let salt = hex::decode(&crypto.kdfparams.salt)?;
    let iv = hex::decode(&crypto.cipherparams.iv)?;
    let ciphertext = hex::decode(&crypto.ciphertext)?;
    let expected_mac = hex::decode(&crypto.mac)?;
    if iv.len() != 16 {
        return Err(SdkError::Keystore(format!("iv must be 16 bytes, got {}", iv.len())));
    }

    let params = KdfParams {
        n: crypto.kdfparams.n,
        r: crypto.kdfparams.r,
        p: crypto.kdfparams.p,
    };
    let mut derived = derive_key(secret, &salt, &params.scrypt_params()?)?;

    if mac(&derived[16..], &ciphertext).as_bytes() != expected_mac.as_slice() {
        derived.zeroize();
        return Err(SdkError::Authentication("wrong secret".to_string()));
    }

    let mut plaintext = ciphertext;
    let mut cipher = Aes128Ctr::new(derived[..16].into(), iv.as_slice().into());
    cipher.apply_keystream(&mut plaintext);
    derived.zeroize();
    Ok(plaintext)
}
