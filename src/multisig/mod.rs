//! Multi-signature wallet
//!
//! A wallet is controlled by an owner set and an approval threshold. An
//! action runs once a quorum approves it, by either of two mechanisms that
//! share one owner set:
//!
//! - on-chain confirmations recorded in a [`PendingActionLedger`]
//! - an [`EndorsementBundle`] of off-chain signatures over the current nonce
//!
//! # Example
//!
//! ```ignore
//! use quorum_wallet::multisig::MultisigWallet;
//!
//! // 2-of-3 wallet
//! let mut wallet = MultisigWallet::new(address, vec![a, b, c], 2)?;
//!
//! // A proposes, B's confirmation reaches quorum and executes the call
//! let id = wallet.submit_transaction(&mut host, a, recipient, 10, vec![])?;
//! wallet.confirm_transaction(&mut host, b, id)?;
//! ```

pub mod calls;
pub mod ledger;
pub mod owners;
pub mod signature;
pub mod wallet;

pub use calls::WalletCall;
pub use ledger::{ActionId, ActionStatus, PendingActionLedger, ProposedAction};
pub use owners::{GovernanceToken, OwnerRegistry};
pub use signature::{signing_digest, verify_endorsements, EndorsementBundle, ReplayGuard};
pub use wallet::{ErrorKind, MultisigWallet, WalletError};
