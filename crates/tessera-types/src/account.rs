//! Account state as reported by the node

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tessera_primitives::{parse_u256, Address, HexBytes, Nonce, U256};

/// An account.
///
/// The node renders `nonce` and `balance` as strings; `balance` may be decimal
/// or `0x` hex and always fits in 256 bits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Account address
    pub address: Address,
    /// Registered name, empty when unset
    pub name: String,
    /// Next nonce the node expects from this account
    pub nonce: Nonce,
    /// Spendable balance
    pub balance: U256,
    /// Contract code, empty for externally owned accounts
    pub code: HexBytes,
    /// Registered document URL
    pub doc_url: String,
}

impl Account {
    /// Fresh account with zero nonce and balance
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Increment the nonce by one
    pub fn add_nonce(&mut self) {
        self.nonce = self.nonce.wrapping_add(1);
    }

    /// Whether the account holds contract code
    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct AccountJson {
    address: Address,
    #[serde(default)]
    name: String,
    nonce: NumberOrString,
    balance: NumberOrString,
    #[serde(default)]
    code: HexBytes,
    #[serde(default, rename = "docURL")]
    doc_url: String,
}

/// Integers are emitted as strings, but older nodes sent bare numbers.
/// Both fields are required: a reply without them is malformed, not zero.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

impl Serialize for Account {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        AccountJson {
            address: self.address,
            name: self.name.clone(),
            nonce: NumberOrString::String(self.nonce.to_string()),
            balance: NumberOrString::String(self.balance.to_string()),
            code: self.code.clone(),
            doc_url: self.doc_url.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Account {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let raw = AccountJson::deserialize(deserializer)?;
        let nonce = match raw.nonce {
            NumberOrString::Number(n) => n,
            NumberOrString::String(s) => s
                .trim()
                .parse::<Nonce>()
                .map_err(|e| D::Error::custom(format!("invalid nonce {:?}: {}", s, e)))?,
        };
        let balance = match raw.balance {
            NumberOrString::Number(n) => U256::from(n),
            NumberOrString::String(s) => parse_u256(&s).map_err(D::Error::custom)?,
        };
        Ok(Account {
            address: raw.address,
            name: raw.name,
            nonce,
            balance,
            code: raw.code,
            doc_url: raw.doc_url,
        })
    }
}
