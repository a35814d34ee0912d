//! Wallet call payloads
//!
//! Governance operations are only honoured when the wallet calls itself;
//! the remaining entries let another contract (for example a wallet that is
//! an owner of this one) drive the wallet through nested calls.

use crate::core::abi::{selector, AbiDecoder, AbiEncoder, AbiError, Selector};
use crate::core::Address;

const ADD_OWNER: &str = "addOwner(address)";
const REMOVE_OWNER: &str = "removeOwner(address)";
const REPLACE_OWNER: &str = "replaceOwner(address,address)";
const CHANGE_REQUIREMENT: &str = "changeRequirement(uint32)";
const SUBMIT: &str = "submitTransaction(address,uint128,bytes)";
const CONFIRM: &str = "confirmTransaction(uint64)";
const REVOKE: &str = "revokeConfirmation(uint64)";
const EXECUTE: &str = "executeTransaction(uint64)";
const EXECUTE_SIGNED: &str = "execute(address,uint128,bytes,bytes)";

/// A decoded wallet call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletCall {
    AddOwner(Address),
    RemoveOwner(Address),
    ReplaceOwner {
        old: Address,
        new: Address,
    },
    ChangeRequirement(u32),
    Submit {
        destination: Address,
        value: u128,
        payload: Vec<u8>,
    },
    Confirm(u64),
    Revoke(u64),
    Execute(u64),
    ExecuteSigned {
        destination: Address,
        value: u128,
        payload: Vec<u8>,
        signatures: Vec<u8>,
    },
}

impl WalletCall {
    /// Whether this call mutates the owner set or threshold
    pub fn is_governance(&self) -> bool {
        matches!(
            self,
            WalletCall::AddOwner(_)
                | WalletCall::RemoveOwner(_)
                | WalletCall::ReplaceOwner { .. }
                | WalletCall::ChangeRequirement(_)
        )
    }

    /// Function signature text
    pub fn signature(&self) -> &'static str {
        match self {
            WalletCall::AddOwner(_) => ADD_OWNER,
            WalletCall::RemoveOwner(_) => REMOVE_OWNER,
            WalletCall::ReplaceOwner { .. } => REPLACE_OWNER,
            WalletCall::ChangeRequirement(_) => CHANGE_REQUIREMENT,
            WalletCall::Submit { .. } => SUBMIT,
            WalletCall::Confirm(_) => CONFIRM,
            WalletCall::Revoke(_) => REVOKE,
            WalletCall::Execute(_) => EXECUTE,
            WalletCall::ExecuteSigned { .. } => EXECUTE_SIGNED,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let encoder = AbiEncoder::new(selector(self.signature()));
        match self {
            WalletCall::AddOwner(owner) | WalletCall::RemoveOwner(owner) => {
                encoder.address(owner)
            }
            WalletCall::ReplaceOwner { old, new } => encoder.address(old).address(new),
            WalletCall::ChangeRequirement(required) => encoder.uint32(*required),
            WalletCall::Submit {
                destination,
                value,
                payload,
            } => encoder.address(destination).uint128(*value).bytes(payload),
            WalletCall::Confirm(id) | WalletCall::Revoke(id) | WalletCall::Execute(id) => {
                encoder.uint64(*id)
            }
            WalletCall::ExecuteSigned {
                destination,
                value,
                payload,
                signatures,
            } => encoder
                .address(destination)
                .uint128(*value)
                .bytes(payload)
                .bytes(signatures),
        }
        .finish()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, AbiError> {
        let (sel, mut args) = AbiDecoder::new(payload)?;
        let call = match sel {
            s if s == sig(ADD_OWNER) => WalletCall::AddOwner(args.address()?),
            s if s == sig(REMOVE_OWNER) => WalletCall::RemoveOwner(args.address()?),
            s if s == sig(REPLACE_OWNER) => WalletCall::ReplaceOwner {
                old: args.address()?,
                new: args.address()?,
            },
            s if s == sig(CHANGE_REQUIREMENT) => WalletCall::ChangeRequirement(args.uint32()?),
            s if s == sig(SUBMIT) => WalletCall::Submit {
                destination: args.address()?,
                value: args.uint128()?,
                payload: args.bytes()?,
            },
            s if s == sig(CONFIRM) => WalletCall::Confirm(args.uint64()?),
            s if s == sig(REVOKE) => WalletCall::Revoke(args.uint64()?),
            s if s == sig(EXECUTE) => WalletCall::Execute(args.uint64()?),
            s if s == sig(EXECUTE_SIGNED) => WalletCall::ExecuteSigned {
                destination: args.address()?,
                value: args.uint128()?,
                payload: args.bytes()?,
                signatures: args.bytes()?,
            },
            other => return Err(AbiError::UnknownSelector(other)),
        };
        args.finish()?;
        Ok(call)
    }
}

fn sig(signature: &str) -> Selector {
    selector(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_governance_classification() {
        let a = Address::from_bytes([1; 20]);
        assert!(WalletCall::AddOwner(a).is_governance());
        assert!(WalletCall::ChangeRequirement(2).is_governance());
        assert!(!WalletCall::Confirm(0).is_governance());
    }

    #[test]
    fn test_decode_replace_owner() {
        let old = Address::from_bytes([1; 20]);
        let new = Address::from_bytes([2; 20]);
        let call = WalletCall::ReplaceOwner { old, new };
        assert_eq!(WalletCall::decode(&call.encode()).unwrap(), call);
    }

    #[test]
    fn test_decode_execute_signed() {
        let call = WalletCall::ExecuteSigned {
            destination: Address::from_bytes([3; 20]),
            value: 42,
            payload: vec![1, 2, 3],
            signatures: vec![9; 130],
        };
        assert_eq!(WalletCall::decode(&call.encode()).unwrap(), call);
    }

    #[test]
    fn test_unknown_selector() {
        let payload = AbiEncoder::new(selector("selfDestruct()")).finish();
        assert!(matches!(
            WalletCall::decode(&payload),
            Err(AbiError::UnknownSelector(_))
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut payload = WalletCall::Confirm(1).encode();
        payload.push(0);
        assert!(matches!(
            WalletCall::decode(&payload),
            Err(AbiError::TrailingBytes(1))
        ));
    }
}
