//! Multi-signature wallet execution engine
//!
//! A [`MultisigWallet`] accepts an action once a quorum of owners approved
//! it, either by on-chain confirmations recorded in the
//! [`PendingActionLedger`] or by an off-chain [`EndorsementBundle`].
//! Both paths end in the same execution step, which commits the
//! authorization bookkeeping before making the outbound call.

use crate::core::abi::AbiError;
use crate::core::{Address, Authorization, CallOutcome, CallRequest, Event, Host};
use crate::crypto::KeyError;
use crate::multisig::calls::WalletCall;
use crate::multisig::ledger::{ActionId, PendingActionLedger, ProposedAction};
use crate::multisig::owners::{GovernanceToken, OwnerRegistry};
use crate::multisig::signature::{
    signing_digest, verify_endorsements, EndorsementBundle, ReplayGuard,
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Sender is not an owner: {0}")]
    NotOwner(Address),
    #[error("Governance call from {0}; only the wallet itself may govern")]
    NotSelf(Address),
    #[error("At least one owner is required")]
    NoOwners,
    #[error("Null address")]
    NullAddress,
    #[error("Owner already exists: {0}")]
    OwnerExists(Address),
    #[error("Owner not found: {0}")]
    OwnerNotFound(Address),
    #[error("Cannot remove the last owner")]
    LastOwner,
    #[error("Invalid threshold {threshold} for {owners} owners")]
    InvalidThreshold { threshold: u32, owners: usize },
    #[error("Transaction not found: {0}")]
    TransactionNotFound(ActionId),
    #[error("Transaction already executed: {0}")]
    AlreadyExecuted(ActionId),
    #[error("Transaction {id} already confirmed by {owner}")]
    AlreadyConfirmed { id: ActionId, owner: Address },
    #[error("Transaction {id} not confirmed by {owner}")]
    NotConfirmed { id: ActionId, owner: Address },
    #[error("Transaction {0} has not reached the threshold")]
    NotYetConfirmed(ActionId),
    #[error("An execution is already in progress")]
    ExecutionInProgress,
    #[error("Signature bundle length {0} is not a multiple of 65")]
    MalformedSignatures(usize),
    #[error("Insufficient signatures: have {have}, need {need}")]
    InsufficientSignatures { have: usize, need: usize },
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Signers are not in strictly increasing address order")]
    SignersNotSorted,
    #[error("Signer is not an owner: {0}")]
    SignerNotOwner(Address),
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u128, need: u128 },
    #[error("{0} does not accept value")]
    NotPayable(&'static str),
    #[error("Payload error: {0}")]
    Abi(#[from] AbiError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
}

/// Coarse classification of wallet errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks the required role
    Unauthorized,
    /// Unknown action id or owner
    NotFound,
    /// Operation not allowed in the current state
    InvalidState,
    /// Endorsement bundle rejected
    VerificationFailure,
    /// Value exceeds balance
    InsufficientFunds,
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::NotOwner(_) | WalletError::NotSelf(_) => ErrorKind::Unauthorized,
            WalletError::OwnerNotFound(_) | WalletError::TransactionNotFound(_) => {
                ErrorKind::NotFound
            }
            WalletError::MalformedSignatures(_)
            | WalletError::InsufficientSignatures { .. }
            | WalletError::InvalidSignature
            | WalletError::SignersNotSorted
            | WalletError::SignerNotOwner(_)
            | WalletError::Crypto(_) => ErrorKind::VerificationFailure,
            WalletError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            WalletError::NoOwners
            | WalletError::NullAddress
            | WalletError::OwnerExists(_)
            | WalletError::LastOwner
            | WalletError::InvalidThreshold { .. }
            | WalletError::AlreadyExecuted(_)
            | WalletError::AlreadyConfirmed { .. }
            | WalletError::NotConfirmed { .. }
            | WalletError::NotYetConfirmed(_)
            | WalletError::ExecutionInProgress
            | WalletError::NotPayable(_)
            | WalletError::Abi(_) => ErrorKind::InvalidState,
        }
    }
}

/// A multi-signature wallet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigWallet {
    address: Address,
    registry: OwnerRegistry,
    ledger: PendingActionLedger,
    replay: ReplayGuard,
    #[serde(skip)]
    executing: bool,
    created_at: DateTime<Utc>,
}

impl MultisigWallet {
    /// Create a wallet at `address` with its initial owners
    ///
    /// # Errors
    /// Returns error if the owner list or threshold is invalid
    pub fn new(address: Address, owners: Vec<Address>, threshold: u32) -> Result<Self, WalletError> {
        let registry = OwnerRegistry::new(owners, threshold)?;
        info!(
            "Created {} multisig wallet {}",
            registry.description(),
            address
        );
        Ok(Self {
            address,
            registry,
            ledger: PendingActionLedger::new(),
            replay: ReplayGuard::new(),
            executing: false,
            created_at: Utc::now(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn registry(&self) -> &OwnerRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &PendingActionLedger {
        &self.ledger
    }

    pub fn owners(&self) -> &[Address] {
        self.registry.owners()
    }

    /// Required approvals
    pub fn required(&self) -> u32 {
        self.registry.threshold()
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.registry.is_owner(address)
    }

    /// Replay counter value the next endorsement bundle must be signed over
    pub fn nonce(&self) -> u64 {
        self.replay.current()
    }

    /// Digest owners sign to endorse this call at the current nonce
    pub fn signing_digest(&self, destination: &Address, value: u128, payload: &[u8]) -> [u8; 32] {
        signing_digest(&self.address, destination, value, payload, self.replay.current())
    }

    pub fn transaction(&self, id: ActionId) -> Option<&ProposedAction> {
        self.ledger.get(id)
    }

    pub fn transaction_count(&self) -> usize {
        self.ledger.len()
    }

    /// Number of actions matching the status filter
    pub fn filtered_transaction_count(&self, pending: bool, executed: bool) -> usize {
        self.ledger.count(pending, executed)
    }

    /// Ids at positions `from..to` of the filtered action list
    pub fn transaction_ids(
        &self,
        from: usize,
        to: usize,
        pending: bool,
        executed: bool,
    ) -> Vec<ActionId> {
        self.ledger.ids(from, to, pending, executed)
    }

    pub fn confirmation_count(&self, id: ActionId) -> usize {
        self.ledger.confirmation_count(id, &self.registry)
    }

    /// Current owners confirming `id`, in owner order
    pub fn confirmations(&self, id: ActionId) -> Vec<Address> {
        self.ledger.confirmations(id, &self.registry)
    }

    pub fn is_confirmed(&self, id: ActionId) -> bool {
        self.ledger.is_confirmed(id, &self.registry)
    }

    /// Accept value sent with an empty payload
    pub fn deposit<H: Host>(&self, host: &mut H, sender: Address, value: u128) {
        if value > 0 {
            host.emit(self.address, Event::Deposit { sender, value });
        }
    }

    /// Propose an action; the proposer confirms it in the same step
    pub fn submit_transaction<H: Host>(
        &mut self,
        host: &mut H,
        sender: Address,
        destination: Address,
        value: u128,
        payload: Vec<u8>,
    ) -> Result<ActionId, WalletError> {
        self.require_owner(&sender)?;
        self.require_idle()?;

        let id = self.ledger.submit(destination, value, payload);
        info!(
            "Wallet {}: transaction {} submitted by {} ({} to {})",
            self.address, id, sender, value, destination
        );
        host.emit(self.address, Event::Submission { transaction_id: id });
        self.confirm_transaction(host, sender, id)?;
        Ok(id)
    }

    /// Confirm an action, executing it if this confirmation reaches quorum.
    ///
    /// Returns the call outcome when execution happened.
    pub fn confirm_transaction<H: Host>(
        &mut self,
        host: &mut H,
        sender: Address,
        id: ActionId,
    ) -> Result<Option<CallOutcome>, WalletError> {
        self.require_owner(&sender)?;
        self.require_idle()?;

        self.ledger.confirm(id, sender)?;
        host.emit(
            self.address,
            Event::Confirmation {
                sender,
                transaction_id: id,
            },
        );
        debug!(
            "Wallet {}: transaction {} has {}/{} confirmations",
            self.address,
            id,
            self.confirmation_count(id),
            self.required()
        );

        if self.is_confirmed(id) {
            return self.execute_proposal(host, id).map(Some);
        }
        Ok(None)
    }

    /// Withdraw a confirmation before execution
    pub fn revoke_confirmation<H: Host>(
        &mut self,
        host: &mut H,
        sender: Address,
        id: ActionId,
    ) -> Result<(), WalletError> {
        self.require_owner(&sender)?;
        self.require_idle()?;

        self.ledger.revoke(id, sender)?;
        host.emit(
            self.address,
            Event::Revocation {
                sender,
                transaction_id: id,
            },
        );
        info!(
            "Wallet {}: {} revoked confirmation of transaction {}",
            self.address, sender, id
        );
        Ok(())
    }

    /// Execute an action that is confirmed but was never executed, e.g.
    /// after the threshold was lowered
    pub fn execute_transaction<H: Host>(
        &mut self,
        host: &mut H,
        sender: Address,
        id: ActionId,
    ) -> Result<CallOutcome, WalletError> {
        self.require_owner(&sender)?;
        self.require_idle()?;

        self.ledger.pending(id)?;
        if !self.is_confirmed(id) {
            return Err(WalletError::NotYetConfirmed(id));
        }
        self.execute_proposal(host, id)
    }

    /// Execute a call authorized by an endorsement bundle signed over the
    /// current nonce. Anyone may relay the bundle.
    pub fn execute_signed<H: Host>(
        &mut self,
        host: &mut H,
        destination: Address,
        value: u128,
        payload: Vec<u8>,
        bundle: &EndorsementBundle,
    ) -> Result<CallOutcome, WalletError> {
        self.require_idle()?;

        let digest = self.signing_digest(&destination, value, &payload);
        let signers = verify_endorsements(&self.registry, &digest, bundle).map_err(|e| {
            warn!("Wallet {}: endorsement rejected: {}", self.address, e);
            e
        })?;

        let nonce = self.replay.advance();
        info!(
            "Wallet {}: executing with {} signatures at nonce {}",
            self.address,
            signers.len(),
            nonce
        );

        let request = CallRequest::new(destination, value, payload);
        let outcome = self.dispatch(host, &request);
        host.emit(
            self.address,
            Event::Execution {
                authorization: Authorization::Nonce(nonce),
                success: outcome.success,
            },
        );
        Ok(outcome)
    }

    /// Entry point for calls arriving from another account or contract.
    ///
    /// The host has already credited `value` to this wallet.
    pub fn handle_call<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        value: u128,
        payload: &[u8],
    ) -> CallOutcome {
        if payload.is_empty() {
            self.deposit(host, caller, value);
            return CallOutcome::success(Vec::new());
        }

        let call = match WalletCall::decode(payload) {
            Ok(call) => call,
            Err(e) => return CallOutcome::failure(e.to_string()),
        };
        debug!("Wallet {}: {} from {}", self.address, call.signature(), caller);

        // Only a plain deposit may carry value
        if value > 0 {
            return CallOutcome::failure(WalletError::NotPayable(call.signature()).to_string());
        }

        let result = match call {
            governance @ (WalletCall::AddOwner(_)
            | WalletCall::RemoveOwner(_)
            | WalletCall::ReplaceOwner { .. }
            | WalletCall::ChangeRequirement(_)) => {
                if caller == self.address {
                    return self.apply_governance(host, governance);
                }
                Err(WalletError::NotSelf(caller))
            }
            WalletCall::Submit {
                destination,
                value,
                payload,
            } => self
                .submit_transaction(host, caller, destination, value, payload)
                .map(|id| id.to_be_bytes().to_vec()),
            WalletCall::Confirm(id) => self
                .confirm_transaction(host, caller, id)
                .map(|_| Vec::new()),
            WalletCall::Revoke(id) => self
                .revoke_confirmation(host, caller, id)
                .map(|_| Vec::new()),
            WalletCall::Execute(id) => self
                .execute_transaction(host, caller, id)
                .map(|outcome| vec![outcome.success as u8]),
            WalletCall::ExecuteSigned {
                destination,
                value,
                payload,
                signatures,
            } => {
                let bundle = EndorsementBundle::from_bytes(signatures);
                self.execute_signed(host, destination, value, payload, &bundle)
                    .map(|outcome| vec![outcome.success as u8])
            }
        };

        match result {
            Ok(data) => CallOutcome::success(data),
            Err(e) => CallOutcome::failure(e.to_string()),
        }
    }

    /// Mark the action executed, then perform its call
    fn execute_proposal<H: Host>(
        &mut self,
        host: &mut H,
        id: ActionId,
    ) -> Result<CallOutcome, WalletError> {
        self.ledger.mark_executed(id)?;
        let request = self
            .ledger
            .get(id)
            .map(ProposedAction::request)
            .ok_or(WalletError::TransactionNotFound(id))?;

        let outcome = self.dispatch(host, &request);
        if !outcome.success {
            self.ledger.record_failure(id);
        }
        host.emit(
            self.address,
            Event::Execution {
                authorization: Authorization::Proposal(id),
                success: outcome.success,
            },
        );
        Ok(outcome)
    }

    /// Perform an authorized call. Self-calls are applied in place.
    fn dispatch<H: Host>(&mut self, host: &mut H, request: &CallRequest) -> CallOutcome {
        self.executing = true;
        let outcome = if request.destination == self.address {
            self.apply_self_call(host, request)
        } else {
            host.call(self.address, request)
        };
        self.executing = false;

        match outcome.reason() {
            Some(reason) => warn!(
                "Wallet {}: call to {} failed: {}",
                self.address, request.destination, reason
            ),
            None => info!(
                "Wallet {}: call to {} succeeded",
                self.address, request.destination
            ),
        }
        outcome
    }

    fn apply_self_call<H: Host>(&mut self, host: &mut H, request: &CallRequest) -> CallOutcome {
        let balance = host.balance(&self.address);
        if request.value > balance {
            return CallOutcome::failure(
                WalletError::InsufficientFunds {
                    have: balance,
                    need: request.value,
                }
                .to_string(),
            );
        }
        if request.payload.is_empty() {
            return CallOutcome::success(Vec::new());
        }

        match WalletCall::decode(&request.payload) {
            Ok(call) if call.is_governance() => self.apply_governance(host, call),
            Ok(call) => CallOutcome::failure(format!(
                "unsupported self-call: {}",
                call.signature()
            )),
            Err(e) => CallOutcome::failure(e.to_string()),
        }
    }

    fn apply_governance<H: Host>(&mut self, host: &mut H, call: WalletCall) -> CallOutcome {
        let token = GovernanceToken::issue();
        let result = match call {
            WalletCall::AddOwner(owner) => self.registry.add_owner(&token, owner),
            WalletCall::RemoveOwner(owner) => self.registry.remove_owner(&token, owner),
            WalletCall::ReplaceOwner { old, new } => {
                self.registry.replace_owner(&token, old, new)
            }
            WalletCall::ChangeRequirement(required) => {
                self.registry.change_threshold(&token, required)
            }
            other => {
                return CallOutcome::failure(format!("not a governance call: {}", other.signature()))
            }
        };

        match result {
            Ok(events) => {
                for event in events {
                    host.emit(self.address, event);
                }
                info!(
                    "Wallet {}: governance applied, now {}",
                    self.address,
                    self.registry.description()
                );
                CallOutcome::success(Vec::new())
            }
            Err(e) => CallOutcome::failure(e.to_string()),
        }
    }

    fn require_owner(&self, sender: &Address) -> Result<(), WalletError> {
        if !self.registry.is_owner(sender) {
            return Err(WalletError::NotOwner(*sender));
        }
        Ok(())
    }

    fn require_idle(&self) -> Result<(), WalletError> {
        if self.executing {
            return Err(WalletError::ExecutionInProgress);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::host::testing::MockHost;
    use crate::crypto::KeyPair;
    use crate::multisig::ledger::ActionStatus;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    const WALLET: Address = Address::from_bytes([0xaa; 20]);

    fn wallet(n: u8, threshold: u32) -> MultisigWallet {
        MultisigWallet::new(WALLET, (1..=n).map(addr).collect(), threshold).unwrap()
    }

    fn funded(amount: u128) -> MockHost {
        let mut host = MockHost::default();
        host.balances.insert(WALLET, amount);
        host
    }

    #[test]
    fn test_submit_auto_confirms() {
        let mut w = wallet(3, 2);
        let mut host = funded(10);

        let id = w
            .submit_transaction(&mut host, addr(1), addr(9), 1, vec![])
            .unwrap();
        assert_eq!(id, 0);
        assert_eq!(w.confirmation_count(id), 1);
        assert!(!w.transaction(id).unwrap().executed());
        assert_eq!(host.event_names(), vec!["Submission", "Confirmation"]);
    }

    #[test]
    fn test_non_owner_rejected() {
        let mut w = wallet(3, 2);
        let mut host = funded(10);

        let err = w
            .submit_transaction(&mut host, addr(7), addr(9), 1, vec![])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let id = w
            .submit_transaction(&mut host, addr(1), addr(9), 1, vec![])
            .unwrap();
        let err = w.confirm_transaction(&mut host, addr(7), id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(w.confirmation_count(id), 1);
    }

    #[test]
    fn test_executes_exactly_once_at_threshold() {
        let mut w = wallet(3, 2);
        let mut host = funded(10);

        let id = w
            .submit_transaction(&mut host, addr(1), addr(9), 4, vec![])
            .unwrap();
        let outcome = w.confirm_transaction(&mut host, addr(2), id).unwrap();
        assert!(outcome.unwrap().success);
        assert_eq!(host.balance(&addr(9)), 4);
        assert_eq!(w.transaction(id).unwrap().status, ActionStatus::Executed);

        let err = w.confirm_transaction(&mut host, addr(3), id).unwrap_err();
        assert!(matches!(err, WalletError::AlreadyExecuted(0)));
        assert_eq!(host.balance(&addr(9)), 4);
        assert_eq!(host.calls.len(), 1);
    }

    #[test]
    fn test_revoke_then_confirm_round_trip() {
        let mut w = wallet(3, 3);
        let mut host = funded(10);

        let id = w
            .submit_transaction(&mut host, addr(1), addr(9), 1, vec![])
            .unwrap();
        w.confirm_transaction(&mut host, addr(2), id).unwrap();
        assert_eq!(w.confirmation_count(id), 2);

        w.revoke_confirmation(&mut host, addr(2), id).unwrap();
        assert_eq!(w.confirmation_count(id), 1);
        w.confirm_transaction(&mut host, addr(2), id).unwrap();
        assert_eq!(w.confirmation_count(id), 2);
    }

    #[test]
    fn test_failed_call_is_consumed() {
        let mut w = wallet(2, 1);
        let mut host = funded(1);

        let id = w
            .submit_transaction(&mut host, addr(1), addr(9), 5, vec![])
            .unwrap();
        let action = w.transaction(id).unwrap();
        assert_eq!(action.status, ActionStatus::Failed);
        assert!(action.executed());
        assert_eq!(
            host.event_names(),
            vec!["Submission", "Confirmation", "ExecutionFailure"]
        );

        let err = w.execute_transaction(&mut host, addr(2), id).unwrap_err();
        assert!(matches!(err, WalletError::AlreadyExecuted(_)));
    }

    #[test]
    fn test_self_call_governance() {
        let mut w = wallet(4, 2);
        let mut host = funded(0);
        let payload = WalletCall::AddOwner(addr(5)).encode();

        let id = w
            .submit_transaction(&mut host, addr(1), WALLET, 0, payload)
            .unwrap();
        w.confirm_transaction(&mut host, addr(2), id).unwrap();

        assert_eq!(w.owners().len(), 5);
        assert_eq!(w.required(), 2);
        assert_eq!(
            host.event_names(),
            vec![
                "Submission",
                "Confirmation",
                "Confirmation",
                "OwnerAddition",
                "Execution"
            ]
        );
        assert!(host.calls.is_empty());
    }

    #[test]
    fn test_self_call_removing_last_owner_fails() {
        let mut w = wallet(1, 1);
        let mut host = funded(0);
        let payload = WalletCall::RemoveOwner(addr(1)).encode();

        let id = w
            .submit_transaction(&mut host, addr(1), WALLET, 0, payload)
            .unwrap();
        assert_eq!(w.transaction(id).unwrap().status, ActionStatus::Failed);
        assert_eq!(w.owners(), &[addr(1)]);
        assert_eq!(host.event_names().last(), Some(&"ExecutionFailure"));
    }

    #[test]
    fn test_external_governance_rejected() {
        let mut w = wallet(2, 1);
        let mut host = funded(0);
        let payload = WalletCall::AddOwner(addr(9)).encode();

        let outcome = w.handle_call(&mut host, addr(1), 0, &payload);
        assert!(!outcome.success);
        assert!(!w.is_owner(&addr(9)));
    }

    #[test]
    fn test_lowered_threshold_allows_manual_execution() {
        let mut w = wallet(3, 3);
        let mut host = funded(10);

        let send = w
            .submit_transaction(&mut host, addr(1), addr(9), 2, vec![])
            .unwrap();
        assert!(matches!(
            w.execute_transaction(&mut host, addr(1), send),
            Err(WalletError::NotYetConfirmed(_))
        ));

        let lower = w
            .submit_transaction(
                &mut host,
                addr(1),
                WALLET,
                0,
                WalletCall::ChangeRequirement(1).encode(),
            )
            .unwrap();
        w.confirm_transaction(&mut host, addr(2), lower).unwrap();
        w.confirm_transaction(&mut host, addr(3), lower).unwrap();
        assert_eq!(w.required(), 1);

        let outcome = w.execute_transaction(&mut host, addr(3), send).unwrap();
        assert!(outcome.success);
        assert_eq!(host.balance(&addr(9)), 2);
    }

    #[test]
    fn test_signed_execution_consumes_nonce() {
        let mut keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        keys.sort_by_key(|k| k.address());
        let owners = keys.iter().map(|k| k.address()).collect();
        let mut w = MultisigWallet::new(WALLET, owners, 2).unwrap();
        let mut host = funded(10);

        let digest = w.signing_digest(&addr(9), 3, b"");
        let bundle = EndorsementBundle::sign_sorted(&[&keys[0], &keys[2]], &digest).unwrap();

        let outcome = w
            .execute_signed(&mut host, addr(9), 3, vec![], &bundle)
            .unwrap();
        assert!(outcome.success);
        assert_eq!(w.nonce(), 1);
        assert_eq!(host.balance(&addr(9)), 3);

        let err = w
            .execute_signed(&mut host, addr(9), 3, vec![], &bundle)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VerificationFailure);
        assert_eq!(w.nonce(), 1);
        assert_eq!(host.balance(&addr(9)), 3);
    }

    #[test]
    fn test_signed_failure_still_advances_nonce() {
        let key = KeyPair::generate();
        let mut w = MultisigWallet::new(WALLET, vec![key.address()], 1).unwrap();
        let mut host = funded(0);

        let digest = w.signing_digest(&addr(9), 5, b"");
        let bundle = EndorsementBundle::sign_sorted(&[&key], &digest).unwrap();
        let outcome = w
            .execute_signed(&mut host, addr(9), 5, vec![], &bundle)
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(w.nonce(), 1);
        assert_eq!(host.event_names(), vec!["ExecutionFailure"]);
    }

    #[test]
    fn test_deposit_via_empty_payload() {
        let mut w = wallet(1, 1);
        let mut host = funded(0);

        assert!(w.handle_call(&mut host, addr(4), 7, &[]).success);
        assert_eq!(
            host.events[0].1,
            Event::Deposit {
                sender: addr(4),
                value: 7
            }
        );
        assert!(w.handle_call(&mut host, addr(4), 0, &[]).success);
        assert_eq!(host.events.len(), 1);
    }

    #[test]
    fn test_nested_submit_returns_id() {
        let mut w = wallet(2, 2);
        let mut host = funded(0);
        let payload = WalletCall::Submit {
            destination: addr(9),
            value: 0,
            payload: vec![],
        }
        .encode();

        let outcome = w.handle_call(&mut host, addr(2), 0, &payload);
        assert!(outcome.success);
        assert_eq!(outcome.return_data, 0u64.to_be_bytes().to_vec());
        assert!(w.transaction(0).unwrap().is_confirmed_by(&addr(2)));
    }

    #[test]
    fn test_value_rejected_on_non_deposit_calls() {
        let mut w = wallet(2, 2);
        let mut host = funded(0);
        w.submit_transaction(&mut host, addr(1), addr(9), 0, vec![])
            .unwrap();
        let events_before = host.events.len();

        let outcome = w.handle_call(&mut host, addr(2), 50, &WalletCall::Confirm(0).encode());
        assert!(!outcome.success);
        assert!(outcome.reason().unwrap().contains("does not accept value"));
        assert_eq!(w.confirmation_count(0), 1);
        assert_eq!(host.events.len(), events_before);

        let outcome = w.handle_call(&mut host, addr(2), 0, &WalletCall::Confirm(0).encode());
        assert!(outcome.success);
    }

    #[test]
    fn test_serde_round_trip_keeps_state() {
        let mut w = wallet(3, 2);
        let mut host = funded(0);
        w.submit_transaction(&mut host, addr(1), addr(9), 0, vec![1, 2])
            .unwrap();

        let json = serde_json::to_string(&w).unwrap();
        let back: MultisigWallet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.owners(), w.owners());
        assert_eq!(back.confirmation_count(0), 1);
        assert_eq!(back.transaction(0).unwrap().payload, vec![1, 2]);
    }
}
