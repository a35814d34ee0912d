//! Pending-action ledger for confirmation-based authorization
//!
//! Tracks proposed actions and the owners that confirmed each one. The
//! ledger only does bookkeeping; the wallet decides when quorum triggers
//! execution.

use crate::core::host::hex_bytes;
use crate::core::{Address, CallRequest};
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::wallet::WalletError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a proposed action
pub type ActionId = u64;

/// Lifecycle state of a proposed action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Collecting confirmations
    Pending,
    /// Executed; the call succeeded
    Executed,
    /// Executed; the call reverted. Still terminal.
    Failed,
}

/// A candidate action awaiting owner confirmations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposedAction {
    pub id: ActionId,
    pub destination: Address,
    pub value: u128,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// Owners that confirmed, in confirmation order
    confirmations: Vec<Address>,
    pub status: ActionStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl ProposedAction {
    fn new(id: ActionId, destination: Address, value: u128, payload: Vec<u8>) -> Self {
        Self {
            id,
            destination,
            value,
            payload,
            confirmations: Vec::new(),
            status: ActionStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
        }
    }

    /// Whether execution has been attempted
    pub fn executed(&self) -> bool {
        self.status != ActionStatus::Pending
    }

    /// Whether `owner` currently confirms this action
    pub fn is_confirmed_by(&self, owner: &Address) -> bool {
        self.confirmations.contains(owner)
    }

    /// Everyone who confirmed, including since-removed owners
    pub fn confirmed_by(&self) -> &[Address] {
        &self.confirmations
    }

    /// The call this action performs
    pub fn request(&self) -> CallRequest {
        CallRequest::new(self.destination, self.value, self.payload.clone())
    }
}

/// Sequenced store of proposed actions
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PendingActionLedger {
    actions: BTreeMap<ActionId, ProposedAction>,
    next_id: ActionId,
}

impl PendingActionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new action and return its id
    pub fn submit(&mut self, destination: Address, value: u128, payload: Vec<u8>) -> ActionId {
        let id = self.next_id;
        self.next_id += 1;
        self.actions
            .insert(id, ProposedAction::new(id, destination, value, payload));
        id
    }

    pub fn get(&self, id: ActionId) -> Option<&ProposedAction> {
        self.actions.get(&id)
    }

    /// Look up an action that may still change
    pub fn pending(&self, id: ActionId) -> Result<&ProposedAction, WalletError> {
        let action = self
            .actions
            .get(&id)
            .ok_or(WalletError::TransactionNotFound(id))?;
        if action.executed() {
            return Err(WalletError::AlreadyExecuted(id));
        }
        Ok(action)
    }

    /// Add `owner`'s confirmation
    pub fn confirm(&mut self, id: ActionId, owner: Address) -> Result<(), WalletError> {
        if self.pending(id)?.is_confirmed_by(&owner) {
            return Err(WalletError::AlreadyConfirmed { id, owner });
        }
        if let Some(action) = self.actions.get_mut(&id) {
            action.confirmations.push(owner);
        }
        Ok(())
    }

    /// Withdraw `owner`'s confirmation
    pub fn revoke(&mut self, id: ActionId, owner: Address) -> Result<(), WalletError> {
        if !self.pending(id)?.is_confirmed_by(&owner) {
            return Err(WalletError::NotConfirmed { id, owner });
        }
        if let Some(action) = self.actions.get_mut(&id) {
            action.confirmations.retain(|o| o != &owner);
        }
        Ok(())
    }

    /// Move an action to its terminal state before its call is made
    pub fn mark_executed(&mut self, id: ActionId) -> Result<(), WalletError> {
        self.pending(id)?;
        if let Some(action) = self.actions.get_mut(&id) {
            action.status = ActionStatus::Executed;
            action.executed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Record that the call of an executed action reverted
    pub fn record_failure(&mut self, id: ActionId) {
        if let Some(action) = self.actions.get_mut(&id) {
            if action.status == ActionStatus::Executed {
                action.status = ActionStatus::Failed;
            }
        }
    }

    /// Confirmations from current owners, in owner order
    pub fn confirmations(&self, id: ActionId, owners: &OwnerRegistry) -> Vec<Address> {
        match self.actions.get(&id) {
            Some(action) => owners
                .owners()
                .iter()
                .filter(|owner| action.is_confirmed_by(owner))
                .copied()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of current owners confirming the action
    pub fn confirmation_count(&self, id: ActionId, owners: &OwnerRegistry) -> usize {
        self.confirmations(id, owners).len()
    }

    /// Whether current-owner confirmations meet the threshold
    pub fn is_confirmed(&self, id: ActionId, owners: &OwnerRegistry) -> bool {
        self.confirmation_count(id, owners) >= owners.threshold() as usize
    }

    /// Total number of actions ever proposed
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Count actions matching the status filter
    pub fn count(&self, pending: bool, executed: bool) -> usize {
        self.filtered(pending, executed).count()
    }

    /// Ids matching the status filter, restricted to positions
    /// `from..to` of the filtered list
    pub fn ids(&self, from: usize, to: usize, pending: bool, executed: bool) -> Vec<ActionId> {
        let to = to.max(from);
        self.filtered(pending, executed)
            .skip(from)
            .take(to - from)
            .map(|action| action.id)
            .collect()
    }

    fn filtered(&self, pending: bool, executed: bool) -> impl Iterator<Item = &ProposedAction> {
        self.actions
            .values()
            .filter(move |a| (pending && !a.executed()) || (executed && a.executed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn owners() -> OwnerRegistry {
        OwnerRegistry::new(vec![addr(1), addr(2), addr(3)], 2).unwrap()
    }

    #[test]
    fn test_sequential_ids() {
        let mut ledger = PendingActionLedger::new();
        assert_eq!(ledger.submit(addr(9), 0, vec![]), 0);
        assert_eq!(ledger.submit(addr(9), 0, vec![]), 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_confirm_and_revoke() {
        let mut ledger = PendingActionLedger::new();
        let owners = owners();
        let id = ledger.submit(addr(9), 1, vec![]);

        ledger.confirm(id, addr(1)).unwrap();
        assert_eq!(ledger.confirmation_count(id, &owners), 1);
        assert!(!ledger.is_confirmed(id, &owners));

        assert!(matches!(
            ledger.confirm(id, addr(1)),
            Err(WalletError::AlreadyConfirmed { .. })
        ));
        assert_eq!(ledger.confirmation_count(id, &owners), 1);

        ledger.revoke(id, addr(1)).unwrap();
        assert_eq!(ledger.confirmation_count(id, &owners), 0);
        assert!(matches!(
            ledger.revoke(id, addr(1)),
            Err(WalletError::NotConfirmed { .. })
        ));

        ledger.confirm(id, addr(3)).unwrap();
        ledger.confirm(id, addr(1)).unwrap();
        assert!(ledger.is_confirmed(id, &owners));
        // Owner order, not confirmation order
        assert_eq!(ledger.confirmations(id, &owners), vec![addr(1), addr(3)]);
    }

    #[test]
    fn test_unknown_id() {
        let mut ledger = PendingActionLedger::new();
        assert!(matches!(
            ledger.confirm(4, addr(1)),
            Err(WalletError::TransactionNotFound(4))
        ));
        assert!(matches!(
            ledger.revoke(4, addr(1)),
            Err(WalletError::TransactionNotFound(4))
        ));
    }

    #[test]
    fn test_executed_is_terminal() {
        let mut ledger = PendingActionLedger::new();
        let id = ledger.submit(addr(9), 0, vec![]);
        ledger.confirm(id, addr(1)).unwrap();
        ledger.mark_executed(id).unwrap();
        ledger.record_failure(id);

        assert_eq!(ledger.get(id).unwrap().status, ActionStatus::Failed);
        assert!(matches!(
            ledger.mark_executed(id),
            Err(WalletError::AlreadyExecuted(_))
        ));
        assert!(matches!(
            ledger.confirm(id, addr(2)),
            Err(WalletError::AlreadyExecuted(_))
        ));
        assert!(matches!(
            ledger.revoke(id, addr(1)),
            Err(WalletError::AlreadyExecuted(_))
        ));
    }

    #[test]
    fn test_removed_owner_confirmation_not_counted() {
        let mut ledger = PendingActionLedger::new();
        let id = ledger.submit(addr(9), 0, vec![]);
        ledger.confirm(id, addr(4)).unwrap();
        ledger.confirm(id, addr(1)).unwrap();

        assert_eq!(ledger.confirmation_count(id, &owners()), 1);
        assert_eq!(ledger.get(id).unwrap().confirmed_by().len(), 2);
    }

    #[test]
    fn test_filtered_enumeration() {
        let mut ledger = PendingActionLedger::new();
        for _ in 0..5 {
            ledger.submit(addr(9), 0, vec![]);
        }
        ledger.mark_executed(1).unwrap();
        ledger.mark_executed(3).unwrap();

        assert_eq!(ledger.count(true, false), 3);
        assert_eq!(ledger.count(false, true), 2);
        assert_eq!(ledger.count(true, true), 5);
        assert_eq!(ledger.count(false, false), 0);

        assert_eq!(ledger.ids(0, 5, true, false), vec![0, 2, 4]);
        assert_eq!(ledger.ids(1, 2, true, false), vec![2]);
        assert_eq!(ledger.ids(0, 10, false, true), vec![1, 3]);
        assert!(ledger.ids(3, 1, true, true).is_empty());
    }
}
