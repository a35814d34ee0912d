//! Key store module for owner key management

pub mod keystore;

pub use keystore::{KeyInfo, KeyStore, KeystoreError, StoredKey};
