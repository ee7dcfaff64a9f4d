//! JSON ABI descriptors

use serde::Deserialize;
use serde_json::Value;

use super::decode::decode;
use super::encode::{encode, encode_function_call, function_selector};
use super::types::{parse_type, ParamType, Token};
use crate::SdkError;

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(default, rename = "stateMutability")]
    state_mutability: String,
}

fn default_entry_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    components: Option<Vec<RawParam>>,
}

impl RawParam {
    fn into_param(self) -> Result<Param, SdkError> {
        let components = self
            .components
            .map(|c| {
                c.into_iter()
                    .map(|p| p.into_param().map(|p| p.kind))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        Ok(Param {
            name: self.name,
            kind: parse_type(&self.kind, components)?,
        })
    }
}

fn params(raw: Vec<RawParam>) -> Result<Vec<Param>, SdkError> {
    raw.into_iter().map(RawParam::into_param).collect()
}

/// A named, typed parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name, possibly empty
    pub name: String,
    /// Type
    pub kind: ParamType,
}

fn kinds(params: &[Param]) -> Vec<ParamType> {
    params.iter().map(|p| p.kind.clone()).collect()
}

/// A contract function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Inputs
    pub inputs: Vec<Param>,
    /// Outputs
    pub outputs: Vec<Param>,
    /// `view`, `pure`, `nonpayable` or `payable`
    pub state_mutability: String,
}

impl Function {
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        let args: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.name, args.join(","))
    }

    /// Function selector
    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// Selector followed by the encoded arguments
    pub fn encode_input(&self, args: &[Token]) -> Result<Vec<u8>, SdkError> {
        encode_function_call(self.selector(), &kinds(&self.inputs), args)
    }

    /// Decode return data
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        decode(&kinds(&self.outputs), data)
    }

    /// Whether calling this function cannot change state
    pub fn is_constant(&self) -> bool {
        matches!(self.state_mutability.as_str(), "view" | "pure")
    }
}

/// A contract constructor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constructor {
    /// Inputs
    pub inputs: Vec<Param>,
}

impl Constructor {
    /// Encoded constructor arguments, without bytecode
    pub fn encode_input(&self, args: &[Token]) -> Result<Vec<u8>, SdkError> {
        encode(&kinds(&self.inputs), args)
    }
}

/// Parsed contract interface.
///
/// Lookups take either a bare name, which picks the first overload declared,
/// or a full signature such as `transfer(address,uint256)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
    constructor: Option<Constructor>,
    functions: Vec<Function>,
}

impl Abi {
    /// Parse a JSON ABI array
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| SdkError::AbiDecode(format!("malformed ABI: {}", e)))?;
        Self::from_value(value)
    }

    /// Parse an already decoded JSON ABI array
    pub fn from_value(value: Value) -> Result<Self, SdkError> {
        let entries: Vec<RawEntry> = serde_json::from_value(value)
            .map_err(|e| SdkError::AbiDecode(format!("malformed ABI: {}", e)))?;

        let mut abi = Abi::default();
        for entry in entries {
            match entry.kind.as_str() {
                "function" => abi.functions.push(Function {
                    name: entry.name,
                    inputs: params(entry.inputs)?,
                    outputs: params(entry.outputs)?,
                    state_mutability: entry.state_mutability,
                }),
                "constructor" => {
                    abi.constructor = Some(Constructor {
                        inputs: params(entry.inputs)?,
                    })
                }
                // events, errors, fallback and receive carry nothing callable
                _ => {}
            }
        }
        Ok(abi)
    }

    /// Constructor, if declared
    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    /// All functions, in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Look up a function by name or signature
    pub fn function(&self, name: &str) -> Result<&Function, SdkError> {
        let found = if name.contains('(') {
            self.functions.iter().find(|f| f.signature() == name)
        } else {
            self.functions.iter().find(|f| f.name == name)
        };
        found.ok_or_else(|| SdkError::AbiEncode(format!("Unknown function: {}", name)))
    }

    /// Pack a call. An empty name packs constructor arguments.
    pub fn pack(&self, name: &str, args: &[Token]) -> Result<Vec<u8>, SdkError> {
        if name.is_empty() {
            return match &self.constructor {
                Some(ctor) => ctor.encode_input(args),
                None if args.is_empty() => Ok(Vec::new()),
                None => Err(SdkError::AbiEncode(format!(
                    "no constructor declared, got {} arguments",
                    args.len()
                ))),
            };
        }
        self.function(name)?.encode_input(args)
    }

    /// Unpack the return data of `name`
    pub fn unpack(&self, name: &str, data: &[u8]) -> Result<Vec<Token>, SdkError> {
        self.function(name)
            .map_err(|e| SdkError::AbiDecode(e.to_string()))?
            .decode_output(data)
    }
}
