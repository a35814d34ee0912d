//! In-memory ledger hosting wallets, registries and factories
//!
//! The [`Chain`] serializes state transitions. Every public mutating method
//! is one transaction: it either commits and returns a [`Receipt`] with the
//! emitted logs, or fails and leaves balances, contracts and logs exactly as
//! they were.
//!
//! Contracts talk to each other through [`Host::call`]. A nested call that
//! fails is rolled back on its own without aborting its caller. While a
//! contract executes it is checked out of its account, so any call that
//! would re-enter it fails.

use crate::access::AccessError;
use crate::core::{Address, CallOutcome, CallRequest, Event, Host, Log, Receipt};
use crate::factory::{Deployer, Deployment, Factory, FactoryError, FactoryKind};
use crate::multisig::{ActionId, EndorsementBundle, MultisigWallet, WalletError};
use crate::registry::{NameId, NameRegistry, RegistryError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors related to chain transactions
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Insufficient funds in {address}: have {have}, need {need}")]
    InsufficientFunds {
        address: Address,
        have: u128,
        need: u128,
    },
    #[error("No contract at {0}")]
    UnknownContract(Address),
    #[error("Contract at {address} is not a {expected}")]
    WrongContract {
        address: Address,
        expected: &'static str,
    },
    #[error("Reentrant call into {0}")]
    Reentrant(Address),
    #[error("Call reverted: {0}")]
    CallFailed(String),
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Factory error: {0}")]
    Factory(#[from] FactoryError),
    #[error("Access denied: {0}")]
    Access(#[from] AccessError),
}

/// Code deployed at an address
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Contract {
    Wallet(MultisigWallet),
    Registry(NameRegistry),
    Factory(Factory),
}

impl Contract {
    /// Short type name for listings
    pub fn type_name(&self) -> &'static str {
        match self {
            Contract::Wallet(_) => "wallet",
            Contract::Registry(_) => "registry",
            Contract::Factory(f) => match f.kind() {
                FactoryKind::Wallet => "wallet_factory",
                FactoryKind::Registry => "registry_factory",
            },
        }
    }

    /// Whether plain payments are credited while this contract executes
    fn accepts_payment_while_busy(&self) -> bool {
        matches!(self, Contract::Wallet(_))
    }
}

/// Ledger account
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Account {
    pub balance: u128,
    /// Number of contracts this account has deployed
    pub nonce: u64,
    pub contract: Option<Contract>,
}

struct Snapshot {
    accounts: BTreeMap<Address, Account>,
    logs: usize,
}

/// The host ledger
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Chain {
    accounts: BTreeMap<Address, Account>,
    logs: Vec<Log>,
    /// Contracts currently executing, and whether each still takes plain payments
    #[serde(skip)]
    busy: BTreeMap<Address, bool>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Queries ====================

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.accounts.get(address).map_or(0, |a| a.balance)
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn contract(&self, address: &Address) -> Option<&Contract> {
        self.accounts.get(address)?.contract.as_ref()
    }

    /// All deployed contracts in address order
    pub fn contracts(&self) -> impl Iterator<Item = (&Address, &Contract)> {
        self.accounts
            .iter()
            .filter_map(|(address, account)| account.contract.as_ref().map(|c| (address, c)))
    }

    pub fn wallet(&self, address: &Address) -> Option<&MultisigWallet> {
        match self.contract(address)? {
            Contract::Wallet(wallet) => Some(wallet),
            _ => None,
        }
    }

    pub fn registry(&self, address: &Address) -> Option<&NameRegistry> {
        match self.contract(address)? {
            Contract::Registry(registry) => Some(registry),
            _ => None,
        }
    }

    pub fn factory(&self, address: &Address) -> Option<&Factory> {
        match self.contract(address)? {
            Contract::Factory(factory) => Some(factory),
            _ => None,
        }
    }

    /// Every log emitted by committed transactions
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Logs emitted by one contract
    pub fn logs_of<'a>(&'a self, address: &'a Address) -> impl Iterator<Item = &'a Log> {
        self.logs.iter().filter(move |log| &log.address == address)
    }

    // ==================== Value ====================

    /// Credit new funds to an account
    pub fn mint(&mut self, address: Address, value: u128) {
        self.accounts.entry(address).or_default().balance += value;
        info!("Minted {} to {}", value, address);
    }

    /// Plain value transfer; a wallet recipient records a deposit
    pub fn transfer(
        &mut self,
        sender: Address,
        to: Address,
        value: u128,
    ) -> Result<Receipt<()>, ChainError> {
        self.send(sender, CallRequest::transfer(to, value))
            .map(|receipt| Receipt {
                output: (),
                logs: receipt.logs,
            })
    }

    /// Top-level call from an external account. A reverted call rejects
    /// the whole transaction.
    pub fn send(
        &mut self,
        sender: Address,
        request: CallRequest,
    ) -> Result<Receipt<Vec<u8>>, ChainError> {
        self.transact(|chain| {
            let have = chain.balance_of(&sender);
            if have < request.value {
                return Err(ChainError::InsufficientFunds {
                    address: sender,
                    have,
                    need: request.value,
                });
            }
            let outcome = chain.call(sender, &request);
            match outcome.reason() {
                Some(reason) => Err(ChainError::CallFailed(reason)),
                None => Ok(outcome.return_data),
            }
        })
    }

    // ==================== Deployment ====================

    pub fn deploy_wallet(
        &mut self,
        deployer: Address,
        owners: Vec<Address>,
        threshold: u32,
    ) -> Result<Receipt<Address>, ChainError> {
        self.transact(|chain| {
            let address = chain.next_address(&deployer);
            let wallet = MultisigWallet::new(address, owners, threshold)?;
            chain.install(address, Contract::Wallet(wallet));
            Ok(address)
        })
    }

    /// Deploy a name registry owned by `deployer`
    pub fn deploy_registry(&mut self, deployer: Address) -> Result<Receipt<Address>, ChainError> {
        self.transact(|chain| {
            let address = chain.next_address(&deployer);
            chain.install(address, Contract::Registry(NameRegistry::new(address, deployer)));
            Ok(address)
        })
    }

    /// Deploy a factory owned by `deployer`
    pub fn deploy_factory(
        &mut self,
        deployer: Address,
        kind: FactoryKind,
    ) -> Result<Receipt<Address>, ChainError> {
        self.transact(|chain| {
            let address = chain.next_address(&deployer);
            chain.install(address, Contract::Factory(Factory::new(address, kind, deployer)));
            Ok(address)
        })
    }

    // ==================== Wallet ====================

    pub fn submit_transaction(
        &mut self,
        sender: Address,
        wallet: Address,
        destination: Address,
        value: u128,
        payload: Vec<u8>,
    ) -> Result<Receipt<ActionId>, ChainError> {
        self.transact(|chain| {
            chain.with_wallet(wallet, |w, host| {
                w.submit_transaction(host, sender, destination, value, payload)
            })
        })
    }

    /// Returns the call outcome if this confirmation executed the action
    pub fn confirm_transaction(
        &mut self,
        sender: Address,
        wallet: Address,
        id: ActionId,
    ) -> Result<Receipt<Option<CallOutcome>>, ChainError> {
        self.transact(|chain| {
            chain.with_wallet(wallet, |w, host| w.confirm_transaction(host, sender, id))
        })
    }

    pub fn revoke_confirmation(
        &mut self,
        sender: Address,
        wallet: Address,
        id: ActionId,
    ) -> Result<Receipt<()>, ChainError> {
        self.transact(|chain| {
            chain.with_wallet(wallet, |w, host| w.revoke_confirmation(host, sender, id))
        })
    }

    pub fn execute_transaction(
        &mut self,
        sender: Address,
        wallet: Address,
        id: ActionId,
    ) -> Result<Receipt<CallOutcome>, ChainError> {
        self.transact(|chain| {
            chain.with_wallet(wallet, |w, host| w.execute_transaction(host, sender, id))
        })
    }

    /// Relay an endorsement bundle to `wallet`
    pub fn execute_signed(
        &mut self,
        wallet: Address,
        destination: Address,
        value: u128,
        payload: Vec<u8>,
        bundle: &EndorsementBundle,
    ) -> Result<Receipt<CallOutcome>, ChainError> {
        self.transact(|chain| {
            chain.with_wallet(wallet, |w, host| {
                w.execute_signed(host, destination, value, payload, bundle)
            })
        })
    }

    // ==================== Registry ====================

    pub fn register(
        &mut self,
        sender: Address,
        registry: Address,
        id: NameId,
        address: Address,
    ) -> Result<Receipt<()>, ChainError> {
        self.transact(|chain| {
            chain.with_registry(registry, |r, host| r.register(host, sender, id, address))
        })
    }

    pub fn unregister(
        &mut self,
        sender: Address,
        registry: Address,
        id: NameId,
    ) -> Result<Receipt<()>, ChainError> {
        self.transact(|chain| chain.with_registry(registry, |r, host| r.unregister(host, sender, id)))
    }

    /// Resolve a name; zero address when unknown
    pub fn resolve(&self, registry: &Address, id: &NameId) -> Result<Address, ChainError> {
        self.registry(registry)
            .map(|r| r.resolve(id))
            .ok_or(ChainError::WrongContract {
                address: *registry,
                expected: "registry",
            })
    }

    // ==================== Factory ====================

    /// Pay `value` to a wallet factory and deploy a wallet
    pub fn create_wallet(
        &mut self,
        sender: Address,
        factory: Address,
        value: u128,
        owners: Vec<Address>,
        threshold: u32,
    ) -> Result<Receipt<Address>, ChainError> {
        self.create(sender, factory, value, Deployment::Wallet { owners, threshold })
    }

    /// Pay `value` to a registry factory and deploy a registry owned by
    /// `sender`
    pub fn create_registry(
        &mut self,
        sender: Address,
        factory: Address,
        value: u128,
    ) -> Result<Receipt<Address>, ChainError> {
        self.create(sender, factory, value, Deployment::Registry { owner: sender })
    }

    fn create(
        &mut self,
        sender: Address,
        factory: Address,
        value: u128,
        deployment: Deployment,
    ) -> Result<Receipt<Address>, ChainError> {
        self.transact(|chain| {
            chain.move_value(sender, factory, value)?;
            chain.with_factory(factory, |f, host| f.create(host, sender, value, deployment))
        })
    }

    pub fn update_fee(
        &mut self,
        sender: Address,
        factory: Address,
        fee: u128,
    ) -> Result<Receipt<()>, ChainError> {
        self.transact(|chain| chain.with_factory(factory, |f, host| f.update_fee(host, sender, fee)))
    }

    /// Withdraw collected fees; returns the amount
    pub fn withdraw(
        &mut self,
        sender: Address,
        factory: Address,
    ) -> Result<Receipt<u128>, ChainError> {
        self.transact(|chain| chain.with_factory(factory, |f, host| f.withdraw(host, sender)))
    }

    /// Transfer ownership of a registry or factory
    pub fn transfer_ownership(
        &mut self,
        sender: Address,
        contract: Address,
        new_owner: Address,
    ) -> Result<Receipt<()>, ChainError> {
        self.transact(|chain| {
            chain.with_contract(contract, |c, host| match c {
                Contract::Registry(r) => Ok(r.transfer_ownership(host, sender, new_owner)?),
                Contract::Factory(f) => Ok(f.transfer_ownership(host, sender, new_owner)?),
                Contract::Wallet(_) => Err(ChainError::WrongContract {
                    address: contract,
                    expected: "ownable contract",
                }),
            })
        })
    }

    // ==================== Internals ====================

    /// Run `f` as one transaction
    fn transact<T, F>(&mut self, f: F) -> Result<Receipt<T>, ChainError>
    where
        F: FnOnce(&mut Chain) -> Result<T, ChainError>,
    {
        let snapshot = self.snapshot();
        let start = snapshot.logs;
        match f(self) {
            Ok(output) => Ok(Receipt {
                output,
                logs: self.logs[start..].to_vec(),
            }),
            Err(e) => {
                warn!("Transaction rejected: {}", e);
                self.restore(snapshot);
                Err(e)
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            accounts: self.accounts.clone(),
            logs: self.logs.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.accounts = snapshot.accounts;
        self.logs.truncate(snapshot.logs);
    }

    /// Derive the next contract address for `deployer`
    fn next_address(&mut self, deployer: &Address) -> Address {
        let account = self.accounts.entry(*deployer).or_default();
        let address = Address::derive(deployer, account.nonce);
        account.nonce += 1;
        address
    }

    fn install(&mut self, address: Address, contract: Contract) {
        info!("Deployed {} at {}", contract.type_name(), address);
        self.accounts.entry(address).or_default().contract = Some(contract);
    }

    fn move_value(&mut self, from: Address, to: Address, value: u128) -> Result<(), ChainError> {
        if value == 0 {
            return Ok(());
        }
        let have = self.balance_of(&from);
        if have < value {
            return Err(ChainError::InsufficientFunds {
                address: from,
                have,
                need: value,
            });
        }
        self.accounts.entry(from).or_default().balance -= value;
        self.accounts.entry(to).or_default().balance += value;
        Ok(())
    }

    fn checkout(&mut self, address: &Address) -> Result<Contract, ChainError> {
        if self.busy.contains_key(address) {
            return Err(ChainError::Reentrant(*address));
        }
        let contract = self
            .accounts
            .get_mut(address)
            .and_then(|account| account.contract.take())
            .ok_or(ChainError::UnknownContract(*address))?;
        self.busy.insert(*address, contract.accepts_payment_while_busy());
        Ok(contract)
    }

    fn checkin(&mut self, address: Address, contract: Contract) {
        self.busy.remove(&address);
        self.accounts.entry(address).or_default().contract = Some(contract);
    }

    fn with_contract<T, F>(&mut self, address: Address, f: F) -> Result<T, ChainError>
    where
        F: FnOnce(&mut Contract, &mut Chain) -> Result<T, ChainError>,
    {
        let mut contract = self.checkout(&address)?;
        let result = f(&mut contract, self);
        self.checkin(address, contract);
        result
    }

    fn with_wallet<T, F>(&mut self, address: Address, f: F) -> Result<T, ChainError>
    where
        F: FnOnce(&mut MultisigWallet, &mut Chain) -> Result<T, WalletError>,
    {
        self.with_contract(address, |contract, chain| match contract {
            Contract::Wallet(wallet) => Ok(f(wallet, chain)?),
            _ => Err(ChainError::WrongContract {
                address,
                expected: "wallet",
            }),
        })
    }

    fn with_registry<T, F>(&mut self, address: Address, f: F) -> Result<T, ChainError>
    where
        F: FnOnce(&mut NameRegistry, &mut Chain) -> Result<T, RegistryError>,
    {
        self.with_contract(address, |contract, chain| match contract {
            Contract::Registry(registry) => Ok(f(registry, chain)?),
            _ => Err(ChainError::WrongContract {
                address,
                expected: "registry",
            }),
        })
    }

    fn with_factory<T, F>(&mut self, address: Address, f: F) -> Result<T, ChainError>
    where
        F: FnOnce(&mut Factory, &mut Chain) -> Result<T, FactoryError>,
    {
        self.with_contract(address, |contract, chain| match contract {
            Contract::Factory(factory) => Ok(f(factory, chain)?),
            _ => Err(ChainError::WrongContract {
                address,
                expected: "factory",
            }),
        })
    }

    /// Move value and run the destination's code, without rollback
    fn execute_call(&mut self, caller: Address, request: &CallRequest) -> CallOutcome {
        let destination = request.destination;
        if let Err(e) = self.move_value(caller, destination, request.value) {
            return CallOutcome::failure(e.to_string());
        }

        // An executing wallet still accepts plain payments
        match self.busy.get(&destination) {
            Some(&true) if request.payload.is_empty() => {
                if request.value > 0 {
                    self.emit(
                        destination,
                        Event::Deposit {
                            sender: caller,
                            value: request.value,
                        },
                    );
                }
                return CallOutcome::success(Vec::new());
            }
            Some(_) => {
                return CallOutcome::failure(ChainError::Reentrant(destination).to_string())
            }
            None => {}
        }
        let has_code = self
            .accounts
            .get(&destination)
            .is_some_and(|account| account.contract.is_some());
        if !has_code {
            return CallOutcome::success(Vec::new());
        }

        let mut contract = match self.checkout(&destination) {
            Ok(contract) => contract,
            Err(e) => return CallOutcome::failure(e.to_string()),
        };
        let (value, payload) = (request.value, request.payload.as_slice());
        let outcome = match &mut contract {
            Contract::Wallet(wallet) => wallet.handle_call(self, caller, value, payload),
            Contract::Registry(registry) => registry.handle_call(self, caller, value, payload),
            Contract::Factory(factory) => factory.handle_call(self, caller, value, payload),
        };
        self.checkin(destination, contract);
        outcome
    }
}

impl Host for Chain {
    fn balance(&self, address: &Address) -> u128 {
        self.balance_of(address)
    }

    fn call(&mut self, caller: Address, request: &CallRequest) -> CallOutcome {
        debug!(
            "Call {} -> {} (value {}, {} bytes)",
            caller,
            request.destination,
            request.value,
            request.payload.len()
        );
        let snapshot = self.snapshot();
        let outcome = self.execute_call(caller, request);
        if let Some(reason) = outcome.reason() {
            debug!("Call to {} reverted: {}", request.destination, reason);
            self.restore(snapshot);
        }
        outcome
    }

    fn emit(&mut self, address: Address, event: Event) {
        debug!("{} emitted {}", address, event.name());
        self.logs.push(Log { address, event });
    }
}

impl Deployer for Chain {
    fn deploy(&mut self, deployer: Address, deployment: Deployment) -> Result<Address, FactoryError> {
        let address = self.next_address(&deployer);
        let contract = match deployment {
            Deployment::Wallet { owners, threshold } => {
                Contract::Wallet(MultisigWallet::new(address, owners, threshold)?)
            }
            Deployment::Registry { owner } => Contract::Registry(NameRegistry::new(address, owner)),
        };
        self.install(address, contract);
        Ok(address)
    }
}
