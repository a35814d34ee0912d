//! Access control primitives

pub mod ownable;

pub use ownable::{AccessError, Ownable, TRANSFER_OWNERSHIP};
