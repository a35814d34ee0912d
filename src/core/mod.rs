//! Core ledger components
//!
//! This module contains the building blocks contracts run on:
//! - Addresses (20-byte account identifiers)
//! - Call payload encoding (selectors and packed arguments)
//! - Events, logs and receipts
//! - The host boundary contracts call through
//! - The in-memory chain that hosts every contract

pub mod abi;
pub mod address;
pub mod chain;
pub mod event;
pub mod host;

pub use abi::{selector, AbiDecoder, AbiEncoder, AbiError, Selector};
pub use address::{Address, AddressError};
pub use chain::{Account, Chain, ChainError, Contract};
pub use event::{Authorization, Event, Log, Receipt};
pub use host::{CallOutcome, CallRequest, Host};
