//! Owner set and approval threshold
//!
//! Reads are open to everyone. Mutations require a [`GovernanceToken`],
//! which only the wallet's own execution path can issue, so an outside
//! caller has no way to reach them.

use crate::core::{Address, Event};
use crate::multisig::wallet::WalletError;
use serde::{Deserialize, Serialize};

/// Proof that a governance mutation comes from an authorized self-call.
///
/// Constructible only inside the `multisig` module.
pub struct GovernanceToken {
    _seal: (),
}

impl GovernanceToken {
    pub(in crate::multisig) fn issue() -> Self {
        Self { _seal: () }
    }
}

/// Ordered, duplicate-free owner list with its threshold
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerRegistry {
    owners: Vec<Address>,
    threshold: u32,
}

impl OwnerRegistry {
    /// Create a registry from the initial owners
    ///
    /// # Errors
    /// Fails on an empty owner list, a null or duplicate owner, or a
    /// threshold outside `1..=owners.len()`.
    pub fn new(owners: Vec<Address>, threshold: u32) -> Result<Self, WalletError> {
        if owners.is_empty() {
            return Err(WalletError::NoOwners);
        }

        for (i, owner) in owners.iter().enumerate() {
            if owner.is_zero() {
                return Err(WalletError::NullAddress);
            }
            if owners[..i].contains(owner) {
                return Err(WalletError::OwnerExists(*owner));
            }
        }

        check_threshold(threshold, owners.len())?;

        Ok(Self { owners, threshold })
    }

    /// Current owners in insertion order
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Required approvals
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// Description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }

    /// Append a new owner; threshold is unchanged
    pub fn add_owner(
        &mut self,
        _token: &GovernanceToken,
        owner: Address,
    ) -> Result<Vec<Event>, WalletError> {
        if owner.is_zero() {
            return Err(WalletError::NullAddress);
        }
        if self.is_owner(&owner) {
            return Err(WalletError::OwnerExists(owner));
        }

        self.owners.push(owner);
        Ok(vec![Event::OwnerAddition { owner }])
    }

    /// Remove an owner, clamping the threshold down if it would exceed
    /// the remaining owner count
    pub fn remove_owner(
        &mut self,
        _token: &GovernanceToken,
        owner: Address,
    ) -> Result<Vec<Event>, WalletError> {
        let index = self
            .position(&owner)
            .ok_or(WalletError::OwnerNotFound(owner))?;
        if self.owners.len() == 1 {
            return Err(WalletError::LastOwner);
        }

        self.owners.remove(index);

        let mut events = Vec::with_capacity(2);
        let remaining = self.owners.len() as u32;
        if self.threshold > remaining {
            self.threshold = remaining;
            events.push(Event::RequirementChange {
                required: remaining,
            });
        }
        events.push(Event::OwnerRemoval { owner });
        Ok(events)
    }

    /// Swap `old` for `new` in place
    pub fn replace_owner(
        &mut self,
        _token: &GovernanceToken,
        old: Address,
        new: Address,
    ) -> Result<Vec<Event>, WalletError> {
        let index = self.position(&old).ok_or(WalletError::OwnerNotFound(old))?;
        if new.is_zero() {
            return Err(WalletError::NullAddress);
        }
        if self.is_owner(&new) {
            return Err(WalletError::OwnerExists(new));
        }

        self.owners[index] = new;
        Ok(vec![
            Event::OwnerRemoval { owner: old },
            Event::OwnerAddition { owner: new },
        ])
    }

    /// Set a new threshold within `1..=owners`
    pub fn change_threshold(
        &mut self,
        _token: &GovernanceToken,
        threshold: u32,
    ) -> Result<Vec<Event>, WalletError> {
        check_threshold(threshold, self.owners.len())?;
        self.threshold = threshold;
        Ok(vec![Event::RequirementChange {
            required: threshold,
        }])
    }

    fn position(&self, owner: &Address) -> Option<usize> {
        self.owners.iter().position(|o| o == owner)
    }
}

fn check_threshold(threshold: u32, owners: usize) -> Result<(), WalletError> {
    if threshold == 0 || threshold as usize > owners {
        return Err(WalletError::InvalidThreshold { threshold, owners });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::wallet::ErrorKind;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn registry(n: u8, threshold: u32) -> OwnerRegistry {
        OwnerRegistry::new((1..=n).map(addr).collect(), threshold).unwrap()
    }

    #[test]
    fn test_construction_bounds() {
        for n in 1..=5u8 {
            for t in 1..=n as u32 {
                assert!(OwnerRegistry::new((1..=n).map(addr).collect(), t).is_ok());
            }
            let owners: Vec<Address> = (1..=n).map(addr).collect();
            assert!(OwnerRegistry::new(owners.clone(), 0).is_err());
            assert!(OwnerRegistry::new(owners, n as u32 + 1).is_err());
        }
        assert!(matches!(
            OwnerRegistry::new(vec![], 1),
            Err(WalletError::NoOwners)
        ));
    }

    #[test]
    fn test_construction_rejects_duplicates_and_null() {
        assert!(matches!(
            OwnerRegistry::new(vec![addr(1), addr(1)], 1),
            Err(WalletError::OwnerExists(_))
        ));
        assert!(matches!(
            OwnerRegistry::new(vec![addr(1), Address::ZERO], 1),
            Err(WalletError::NullAddress)
        ));
    }

    #[test]
    fn test_add_owner() {
        let mut reg = registry(2, 2);
        let token = GovernanceToken::issue();

        let events = reg.add_owner(&token, addr(9)).unwrap();
        assert_eq!(events, vec![Event::OwnerAddition { owner: addr(9) }]);
        assert_eq!(reg.owners(), &[addr(1), addr(2), addr(9)]);
        assert_eq!(reg.threshold(), 2);

        let err = reg.add_owner(&token, addr(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(reg.add_owner(&token, Address::ZERO).is_err());
    }

    #[test]
    fn test_remove_owner_preserves_order() {
        let mut reg = registry(5, 2);
        let token = GovernanceToken::issue();

        reg.remove_owner(&token, addr(2)).unwrap();
        assert_eq!(reg.owners(), &[addr(1), addr(3), addr(4), addr(5)]);
        assert_eq!(reg.threshold(), 2);
    }

    #[test]
    fn test_remove_owner_clamps_threshold() {
        let mut reg = registry(2, 2);
        let token = GovernanceToken::issue();

        let events = reg.remove_owner(&token, addr(2)).unwrap();
        assert_eq!(
            events,
            vec![
                Event::RequirementChange { required: 1 },
                Event::OwnerRemoval { owner: addr(2) },
            ]
        );
        assert_eq!(reg.threshold(), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_remove_last_owner_fails() {
        let mut reg = registry(1, 1);
        let token = GovernanceToken::issue();

        assert!(matches!(
            reg.remove_owner(&token, addr(1)),
            Err(WalletError::LastOwner)
        ));
        assert_eq!(reg.owners(), &[addr(1)]);
    }

    #[test]
    fn test_remove_unknown_owner() {
        let mut reg = registry(2, 1);
        let err = reg
            .remove_owner(&GovernanceToken::issue(), addr(7))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_replace_owner_keeps_position() {
        let mut reg = registry(4, 2);
        let token = GovernanceToken::issue();

        let events = reg.replace_owner(&token, addr(4), addr(7)).unwrap();
        assert_eq!(events[0].name(), "OwnerRemoval");
        assert_eq!(events[1].name(), "OwnerAddition");
        assert_eq!(reg.owners()[3], addr(7));
        assert_eq!(reg.len(), 4);

        assert!(reg.replace_owner(&token, addr(9), addr(8)).is_err());
        assert!(reg.replace_owner(&token, addr(1), addr(2)).is_err());
    }

    #[test]
    fn test_change_threshold() {
        let mut reg = registry(3, 1);
        let token = GovernanceToken::issue();

        reg.change_threshold(&token, 3).unwrap();
        assert_eq!(reg.threshold(), 3);
        assert!(reg.change_threshold(&token, 0).is_err());
        assert!(reg.change_threshold(&token, 4).is_err());
        assert_eq!(reg.threshold(), 3);
        assert_eq!(reg.description(), "3-of-3");
    }
}
