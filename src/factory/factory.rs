//! Fee-gated contract factories
//!
//! A factory deploys fresh wallets or registries for anyone who pays its
//! fee. Collected fees stay on the factory until its owner withdraws them.

use crate::access::{AccessError, Ownable, TRANSFER_OWNERSHIP};
use crate::core::abi::{selector, AbiDecoder, AbiEncoder, AbiError};
use crate::core::{Address, CallOutcome, CallRequest, Event, Host};
use crate::multisig::WalletError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

const CREATE_WALLET: &str = "create(address[],uint32)";
const CREATE_REGISTRY: &str = "create()";
const UPDATE_FEE: &str = "updateFee(uint128)";
const WITHDRAW: &str = "withdraw()";
const FEE: &str = "fee()";
const CONTRACT_COUNT: &str = "getContractCount(address)";

/// Factory errors
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("Access denied: {0}")]
    Access(#[from] AccessError),
    #[error("Insufficient fee: paid {paid}, fee is {fee}")]
    InsufficientFee { paid: u128, fee: u128 },
    #[error("A {factory} factory cannot deploy a {requested}")]
    WrongKind {
        factory: FactoryKind,
        requested: FactoryKind,
    },
    #[error("Invalid wallet parameters: {0}")]
    Wallet(#[from] WalletError),
    #[error("Fee transfer failed: {0}")]
    TransferFailed(String),
    #[error("Function does not accept value")]
    NotPayable,
    #[error("Payload error: {0}")]
    Abi(#[from] AbiError),
}

/// What a factory deploys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryKind {
    Wallet,
    Registry,
}

impl fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryKind::Wallet => write!(f, "wallet"),
            FactoryKind::Registry => write!(f, "registry"),
        }
    }
}

/// Parameters of a contract to deploy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deployment {
    Wallet { owners: Vec<Address>, threshold: u32 },
    Registry { owner: Address },
}

impl Deployment {
    pub fn kind(&self) -> FactoryKind {
        match self {
            Deployment::Wallet { .. } => FactoryKind::Wallet,
            Deployment::Registry { .. } => FactoryKind::Registry,
        }
    }
}

/// A host that can also deploy contracts
pub trait Deployer: Host {
    /// Deploy a contract on behalf of `deployer` and return its address
    fn deploy(&mut self, deployer: Address, deployment: Deployment) -> Result<Address, FactoryError>;
}

/// Fee-gated deployer of wallets or registries
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Factory {
    address: Address,
    kind: FactoryKind,
    ownable: Ownable,
    fee: u128,
    /// Deployed contracts by creator, in creation order
    created: BTreeMap<Address, Vec<Address>>,
}

impl Factory {
    /// New factory with a zero fee
    pub fn new(address: Address, kind: FactoryKind, owner: Address) -> Self {
        Self {
            address,
            kind,
            ownable: Ownable::new(owner),
            fee: 0,
            created: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn kind(&self) -> FactoryKind {
        self.kind
    }

    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    pub fn fee(&self) -> u128 {
        self.fee
    }

    /// Number of contracts `creator` deployed through this factory
    pub fn contract_count(&self, creator: &Address) -> usize {
        self.created.get(creator).map_or(0, Vec::len)
    }

    /// Contracts `creator` deployed, oldest first
    pub fn contracts(&self, creator: &Address) -> &[Address] {
        self.created.get(creator).map_or(&[], Vec::as_slice)
    }

    /// Deploy a new contract. The host has already credited `value`.
    pub fn create<D: Deployer>(
        &mut self,
        host: &mut D,
        sender: Address,
        value: u128,
        deployment: Deployment,
    ) -> Result<Address, FactoryError> {
        if deployment.kind() != self.kind {
            return Err(FactoryError::WrongKind {
                factory: self.kind,
                requested: deployment.kind(),
            });
        }
        if value < self.fee {
            return Err(FactoryError::InsufficientFee {
                paid: value,
                fee: self.fee,
            });
        }

        let address = host.deploy(self.address, deployment)?;
        self.created.entry(sender).or_default().push(address);
        info!(
            "Factory {}: {} {} created for {}",
            self.address, self.kind, address, sender
        );
        host.emit(self.address, Event::ContractCreated { sender, address });
        Ok(address)
    }

    pub fn update_fee<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        new_fee: u128,
    ) -> Result<(), FactoryError> {
        self.ownable.check(&caller)?;
        self.fee = new_fee;
        info!("Factory {}: fee set to {}", self.address, new_fee);
        host.emit(self.address, Event::FeeChanged { new_fee });
        Ok(())
    }

    /// Send the whole balance to the owner
    pub fn withdraw<H: Host>(&mut self, host: &mut H, caller: Address) -> Result<u128, FactoryError> {
        self.ownable.check(&caller)?;

        let amount = host.balance(&self.address);
        let owner = self.ownable.owner();
        let outcome = host.call(self.address, &CallRequest::transfer(owner, amount));
        if let Some(reason) = outcome.reason() {
            return Err(FactoryError::TransferFailed(reason));
        }

        info!("Factory {}: withdrew {} to {}", self.address, amount, owner);
        host.emit(self.address, Event::FundWithdraw { amount });
        Ok(amount)
    }

    pub fn transfer_ownership<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), FactoryError> {
        let event = self.ownable.transfer_ownership(&caller, new_owner)?;
        host.emit(self.address, event);
        Ok(())
    }

    /// Entry point for calls arriving from another account or contract
    pub fn handle_call<D: Deployer>(
        &mut self,
        host: &mut D,
        caller: Address,
        value: u128,
        payload: &[u8],
    ) -> CallOutcome {
        match self.dispatch(host, caller, value, payload) {
            Ok(data) => CallOutcome::success(data),
            Err(e) => CallOutcome::failure(e.to_string()),
        }
    }

    fn dispatch<D: Deployer>(
        &mut self,
        host: &mut D,
        caller: Address,
        value: u128,
        payload: &[u8],
    ) -> Result<Vec<u8>, FactoryError> {
        let (sel, mut args) = AbiDecoder::new(payload)?;
        if sel == selector(CREATE_WALLET) {
            let owners = args.addresses()?;
            let threshold = args.uint32()?;
            args.finish()?;
            let address =
                self.create(host, caller, value, Deployment::Wallet { owners, threshold })?;
            return Ok(address.as_bytes().to_vec());
        }
        if sel == selector(CREATE_REGISTRY) {
            args.finish()?;
            let address = self.create(host, caller, value, Deployment::Registry { owner: caller })?;
            return Ok(address.as_bytes().to_vec());
        }

        // Only create is payable
        if value > 0 {
            return Err(FactoryError::NotPayable);
        }
        if sel == selector(UPDATE_FEE) {
            let fee = args.uint128()?;
            args.finish()?;
            self.update_fee(host, caller, fee)?;
            Ok(Vec::new())
        } else if sel == selector(WITHDRAW) {
            args.finish()?;
            let amount = self.withdraw(host, caller)?;
            Ok(amount.to_be_bytes().to_vec())
        } else if sel == selector(FEE) {
            args.finish()?;
            Ok(self.fee.to_be_bytes().to_vec())
        } else if sel == selector(CONTRACT_COUNT) {
            let creator = args.address()?;
            args.finish()?;
            Ok((self.contract_count(&creator) as u64).to_be_bytes().to_vec())
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

/// Payload builders for factory calls
pub mod calls {
    use super::*;

    pub fn create_wallet(owners: &[Address], threshold: u32) -> Vec<u8> {
        AbiEncoder::new(selector(CREATE_WALLET))
            .addresses(owners)
            .uint32(threshold)
            .finish()
    }

    pub fn create_registry() -> Vec<u8> {
        AbiEncoder::new(selector(CREATE_REGISTRY)).finish()
    }

    pub fn update_fee(fee: u128) -> Vec<u8> {
        AbiEncoder::new(selector(UPDATE_FEE)).uint128(fee).finish()
    }

    pub fn withdraw() -> Vec<u8> {
        AbiEncoder::new(selector(WITHDRAW)).finish()
    }

    pub fn fee() -> Vec<u8> {
        AbiEncoder::new(selector(FEE)).finish()
    }

    pub fn contract_count(creator: &Address) -> Vec<u8> {
        AbiEncoder::new(selector(CONTRACT_COUNT))
            .address(creator)
            .finish()
    }

    pub fn transfer_ownership(new_owner: &Address) -> Vec<u8> {
        AbiEncoder::new(selector(TRANSFER_OWNERSHIP))
            .address(new_owner)
            .finish()
    }
}
