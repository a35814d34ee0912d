//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 and HASH160 hashing
//! - Recoverable ECDSA signatures (secp256k1)

pub mod hash;
pub mod keys;

pub use hash::{hash160, sha256};
pub use keys::{
    public_key_to_address, recover_signer, sign_recoverable, KeyError,
    KeyPair, SIGNATURE_LENGTH,
};
