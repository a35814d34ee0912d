//! Single-owner access control
//!
//! Embedded by contracts that have one administrator, such as the name
//! registry and the factories.

use crate::core::{Address, Event};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Function signature shared by every ownable contract's ABI
pub const TRANSFER_OWNERSHIP: &str = "transferOwnership(address)";

/// Access-control errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Caller {caller} is not the owner {owner}")]
    NotOwner { caller: Address, owner: Address },
    #[error("New owner cannot be the null address")]
    NullOwner,
}

/// Single administrator of a contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Fail unless `caller` is the owner
    pub fn check(&self, caller: &Address) -> Result<(), AccessError> {
        if *caller != self.owner {
            return Err(AccessError::NotOwner {
                caller: *caller,
                owner: self.owner,
            });
        }
        Ok(())
    }

    /// Hand ownership to `new_owner`
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Event, AccessError> {
        self.check(caller)?;
        if new_owner.is_zero() {
            return Err(AccessError::NullOwner);
        }

        let old_owner = self.owner;
        self.owner = new_owner;
        Ok(Event::OwnershipChanged {
            old_owner,
            new_owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_transfer_ownership() {
        let mut ownable = Ownable::new(addr(1));
        let event = ownable.transfer_ownership(&addr(1), addr(2)).unwrap();

        assert_eq!(ownable.owner(), addr(2));
        assert_eq!(
            event,
            Event::OwnershipChanged {
                old_owner: addr(1),
                new_owner: addr(2)
            }
        );
    }

    #[test]
    fn test_only_owner_may_transfer() {
        let mut ownable = Ownable::new(addr(2));

        assert!(matches!(
            ownable.transfer_ownership(&addr(3), addr(3)),
            Err(AccessError::NotOwner { .. })
        ));
        // The prospective owner cannot claim it either
        assert!(ownable.transfer_ownership(&addr(4), addr(4)).is_err());
        assert_eq!(ownable.owner(), addr(2));
    }

    #[test]
    fn test_null_owner_rejected() {
        let mut ownable = Ownable::new(addr(1));
        assert_eq!(
            ownable.transfer_ownership(&addr(1), Address::ZERO),
            Err(AccessError::NullOwner)
        );
        assert_eq!(ownable.owner(), addr(1));
    }
}
