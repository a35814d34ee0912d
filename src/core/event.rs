//! Events emitted by contracts
//!
//! Every state transition that matters to an observer is reported as an
//! [`Event`]; the chain stamps it with the emitting address to form a [`Log`].

use crate::core::Address;
use serde::{Deserialize, Serialize};

/// What authorized an execution attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorization {
    /// Quorum reached on a proposed action with this id
    Proposal(u64),
    /// Endorsement bundle signed over this replay counter value
    Nonce(u64),
}

/// Contract events
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // Wallet
    Deposit {
        sender: Address,
        value: u128,
    },
    Submission {
        transaction_id: u64,
    },
    Confirmation {
        sender: Address,
        transaction_id: u64,
    },
    Revocation {
        sender: Address,
        transaction_id: u64,
    },
    Execution {
        authorization: Authorization,
        success: bool,
    },
    OwnerAddition {
        owner: Address,
    },
    OwnerRemoval {
        owner: Address,
    },
    RequirementChange {
        required: u32,
    },

    // Name registry
    Registered {
        id: String,
        address: Address,
    },
    Unregistered {
        id: String,
    },

    // Ownable / factory
    OwnershipChanged {
        old_owner: Address,
        new_owner: Address,
    },
    FeeChanged {
        new_fee: u128,
    },
    ContractCreated {
        sender: Address,
        address: Address,
    },
    FundWithdraw {
        amount: u128,
    },
}

impl Event {
    /// Event name for logging and assertions
    pub fn name(&self) -> &'static str {
        match self {
            Event::Deposit { .. } => "Deposit",
            Event::Submission { .. } => "Submission",
            Event::Confirmation { .. } => "Confirmation",
            Event::Revocation { .. } => "Revocation",
            Event::Execution { success: true, .. } => "Execution",
            Event::Execution { success: false, .. } => "ExecutionFailure",
            Event::OwnerAddition { .. } => "OwnerAddition",
            Event::OwnerRemoval { .. } => "OwnerRemoval",
            Event::RequirementChange { .. } => "RequirementChange",
            Event::Registered { .. } => "Registered",
            Event::Unregistered { .. } => "Unregistered",
            Event::OwnershipChanged { .. } => "OwnershipChanged",
            Event::FeeChanged { .. } => "FeeChanged",
            Event::ContractCreated { .. } => "ContractCreated",
            Event::FundWithdraw { .. } => "FundWithdraw",
        }
    }
}

/// An event together with the contract that emitted it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub event: Event,
}

/// Result of a committed top-level transaction
#[derive(Clone, Debug)]
pub struct Receipt<T> {
    /// Operation-specific output (new id, new address, ...)
    pub output: T,
    /// Events emitted during the transaction, in order
    pub logs: Vec<Log>,
}

impl<T> Receipt<T> {
    /// Names of all emitted events, in order
    pub fn event_names(&self) -> Vec<&'static str> {
        self.logs.iter().map(|log| log.event.name()).collect()
    }

    /// Events without their emitting address
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.logs.iter().map(|log| &log.event)
    }
}
