//! Name registry
//!
//! Maps 32-byte name ids to addresses. Ids are usually computed with
//! [`namehash`] from dotted names such as `latest.microsoft.eth`.

use crate::access::{AccessError, Ownable, TRANSFER_OWNERSHIP};
use crate::core::abi::{selector, AbiDecoder, AbiEncoder, AbiError};
use crate::core::{Address, CallOutcome, Event, Host};
use crate::crypto::sha256;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// 32-byte registry key
pub type NameId = [u8; 32];

const REGISTER: &str = "register(bytes32,address)";
const UNREGISTER: &str = "unregister(bytes32)";
const RESOLVE: &str = "resolve(bytes32)";

/// Registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Access denied: {0}")]
    Access(#[from] AccessError),
    #[error("Name not registered: {0}")]
    NotRegistered(String),
    #[error("Cannot register the null address")]
    NullAddress,
    #[error("Payload error: {0}")]
    Abi(#[from] AbiError),
}

/// Recursive label hash of a dotted name; the empty name hashes to zero
pub fn namehash(name: &str) -> NameId {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&sha256(label.as_bytes()));
        node = sha256(&buf);
    }
    node
}

/// Hex text form of a name id, as used in events and storage
pub fn id_hex(id: &NameId) -> String {
    format!("0x{}", hex::encode(id))
}

/// Parse a name id from hex, or hash it when given a dotted name
pub fn parse_name(input: &str) -> NameId {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    if digits.len() == 64 {
        if let Ok(bytes) = hex::decode(digits) {
            let mut id = [0u8; 32];
            id.copy_from_slice(&bytes);
            return id;
        }
    }
    namehash(input)
}

/// Owner-administered name registry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NameRegistry {
    address: Address,
    ownable: Ownable,
    /// Entries keyed by hex id
    entries: BTreeMap<String, Address>,
}

impl NameRegistry {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            ownable: Ownable::new(owner),
            entries: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    /// Registered address, or the zero address if absent
    pub fn resolve(&self, id: &NameId) -> Address {
        self.entries
            .get(&id_hex(id))
            .copied()
            .unwrap_or(Address::ZERO)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries as (hex id, address)
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Address)> {
        self.entries.iter()
    }

    /// Point `id` at `address`, replacing any previous entry
    pub fn register<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        id: NameId,
        address: Address,
    ) -> Result<(), RegistryError> {
        self.ownable.check(&caller)?;
        if address.is_zero() {
            return Err(RegistryError::NullAddress);
        }

        let id = id_hex(&id);
        self.entries.insert(id.clone(), address);
        info!("Registry {}: {} -> {}", self.address, id, address);
        host.emit(self.address, Event::Registered { id, address });
        Ok(())
    }

    pub fn unregister<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        id: NameId,
    ) -> Result<(), RegistryError> {
        self.ownable.check(&caller)?;

        let id = id_hex(&id);
        if self.entries.remove(&id).is_none() {
            return Err(RegistryError::NotRegistered(id));
        }
        info!("Registry {}: {} removed", self.address, id);
        host.emit(self.address, Event::Unregistered { id });
        Ok(())
    }

    pub fn transfer_ownership<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        let event = self.ownable.transfer_ownership(&caller, new_owner)?;
        host.emit(self.address, event);
        Ok(())
    }

    /// Entry point for calls arriving from another account or contract
    pub fn handle_call<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        value: u128,
        payload: &[u8],
    ) -> CallOutcome {
        if value > 0 {
            return CallOutcome::failure("registry does not accept value");
        }
        match self.dispatch(host, caller, payload) {
            Ok(data) => CallOutcome::success(data),
            Err(e) => CallOutcome::failure(e.to_string()),
        }
    }

    fn dispatch<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        payload: &[u8],
    ) -> Result<Vec<u8>, RegistryError> {
        let (sel, mut args) = AbiDecoder::new(payload)?;
        if sel == selector(REGISTER) {
            let id = args.word()?;
            let address = args.address()?;
            args.finish()?;
            self.register(host, caller, id, address)?;
            Ok(Vec::new())
        } else if sel == selector(UNREGISTER) {
            let id = args.word()?;
            args.finish()?;
            self.unregister(host, caller, id)?;
            Ok(Vec::new())
        } else if sel == selector(RESOLVE) {
            let id = args.word()?;
            args.finish()?;
            Ok(self.resolve(&id).as_bytes().to_vec())
        } else if sel == selector(TRANSFER_OWNERSHIP) {
            let new_owner = args.address()?;
            args.finish()?;
            self.transfer_ownership(host, caller, new_owner)?;
            Ok(Vec::new())
        } else {
            Err(AbiError::UnknownSelector(sel).into())
        }
    }
}

/// Payload builders for registry calls
pub mod calls {
    use super::*;

    pub fn register(id: &NameId, address: &Address) -> Vec<u8> {
        AbiEncoder::new(selector(REGISTER))
            .word(id)
            .address(address)
            .finish()
    }

    pub fn unregister(id: &NameId) -> Vec<u8> {
        AbiEncoder::new(selector(UNREGISTER)).word(id).finish()
    }

    pub fn resolve(id: &NameId) -> Vec<u8> {
        AbiEncoder::new(selector(RESOLVE)).word(id).finish()
    }

    pub fn transfer_ownership(new_owner: &Address) -> Vec<u8> {
        AbiEncoder::new(selector(TRANSFER_OWNERSHIP))
            .address(new_owner)
            .finish()
    }
}
