//! The boundary between contracts and the ledger hosting them
//!
//! Contracts never touch balances or other contracts directly. They ask the
//! host to perform a low-level call and get back a success flag with return
//! data; a failed call is an outcome, not an error.

use crate::core::{Address, Event};
use serde::{Deserialize, Serialize};

/// A low-level call: destination, attached value and opaque payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub destination: Address,
    pub value: u128,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

impl CallRequest {
    pub fn new(destination: Address, value: u128, payload: Vec<u8>) -> Self {
        Self {
            destination,
            value,
            payload,
        }
    }

    /// Plain value transfer with no payload
    pub fn transfer(destination: Address, value: u128) -> Self {
        Self::new(destination, value, Vec::new())
    }
}

/// Result of a low-level call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    pub return_data: Vec<u8>,
}

impl CallOutcome {
    pub fn success(return_data: Vec<u8>) -> Self {
        Self {
            success: true,
            return_data,
        }
    }

    /// A reverted call; the reason travels as UTF-8 return data
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            return_data: reason.into().into_bytes(),
        }
    }

    /// Revert reason, if the call failed
    pub fn reason(&self) -> Option<String> {
        if self.success {
            None
        } else {
            Some(String::from_utf8_lossy(&self.return_data).into_owned())
        }
    }
}

/// Services a contract needs from its host ledger
pub trait Host {
    /// Current balance of an account
    fn balance(&self, address: &Address) -> u128;

    /// Perform a call on behalf of `caller`. Effects of a failed call are
    /// rolled back by the host before it returns.
    fn call(&mut self, caller: Address, request: &CallRequest) -> CallOutcome;

    /// Record an event emitted by the contract at `address`
    fn emit(&mut self, address: Address, event: Event);
}

/// Serde helper: byte vectors as `0x`-prefixed hex strings
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
