//! Contract factories
//!
//! Deploy multisig wallets or name registries for a fee.

pub mod factory;

pub use factory::{calls, Deployer, Deployment, Factory, FactoryError, FactoryKind};
