//! Quorum: multi-owner wallets in Rust
//!
//! This crate provides a multisig authorization and execution engine:
//! - Owner sets with an approval threshold, changed only by the wallet itself
//! - On-chain proposals collecting owner confirmations
//! - Off-chain endorsements (recoverable secp256k1 signatures) over a nonce
//! - Outbound calls with value, committed before the call and
//!   reentrancy-checked
//! - Ownable name registries and fee-charging factories reachable through
//!   nested calls
//! - An in-memory chain host with JSON persistence, a key store, a CLI and a
//!   read-only REST API
//!
//! # Example
//!
//! ```rust
//! use quorum_wallet::core::{Address, Chain};
//! use quorum_wallet::crypto::KeyPair;
//!
//! let alice = KeyPair::generate().address();
//! let bob = KeyPair::generate().address();
//! let recipient = Address::from_bytes([9; 20]);
//!
//! let mut chain = Chain::new();
//! let wallet = chain.deploy_wallet(alice, vec![alice, bob], 2).unwrap().output;
//! chain.mint(wallet, 100);
//!
//! // Alice proposes, Bob's confirmation executes the transfer
//! let id = chain
//!     .submit_transaction(alice, wallet, recipient, 10, vec![])
//!     .unwrap()
//!     .output;
//! chain.confirm_transaction(bob, wallet, id).unwrap();
//!
//! assert_eq!(chain.balance_of(&recipient), 10);
//! ```

pub mod access;
pub mod api;
pub mod cli;
pub mod core;
pub mod crypto;
pub mod factory;
pub mod keystore;
pub mod multisig;
pub mod registry;
pub mod storage;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use core::{Address, CallOutcome, CallRequest, Chain, ChainError, Event, Host, Receipt};
pub use crypto::KeyPair;
pub use factory::{Factory, FactoryKind};
pub use keystore::KeyStore;
pub use multisig::{EndorsementBundle, MultisigWallet, WalletCall, WalletError};
pub use registry::{namehash, NameRegistry};
pub use storage::Storage;
