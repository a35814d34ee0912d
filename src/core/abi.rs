//! Call payload encoding
//!
//! Payloads are `selector || arguments`. The selector is the first four
//! bytes of SHA-256 over the function signature text, e.g.
//! `addOwner(address)`. Arguments are packed without padding:
//!
//! | type        | encoding                              |
//! |-------------|---------------------------------------|
//! | `address`   | 20 bytes                              |
//! | `uint128`   | 16 bytes big-endian                   |
//! | `uint64`    | 8 bytes big-endian                    |
//! | `uint32`    | 4 bytes big-endian                    |
//! | `bytes32`   | 32 raw bytes                          |
//! | `bytes`     | u32 big-endian length, then the bytes |
//! | `address[]` | u32 big-endian count, then addresses  |

use crate::core::Address;
use crate::crypto::sha256;
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Four-byte function selector
pub type Selector = [u8; 4];

/// Payload decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("Payload too short for a selector")]
    MissingSelector,
    #[error("Unknown selector: 0x{}", hex::encode(.0))]
    UnknownSelector(Selector),
    #[error("Truncated payload: need {need} more bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("Trailing bytes after arguments: {0}")]
    TrailingBytes(usize),
}

/// Compute the selector for a function signature
pub fn selector(signature: &str) -> Selector {
    let hash = sha256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Builder for call payloads
pub struct AbiEncoder {
    buf: BytesMut,
}

impl AbiEncoder {
    /// Start a payload for the given selector
    pub fn new(selector: Selector) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_slice(&selector);
        Self { buf }
    }

    pub fn address(mut self, address: &Address) -> Self {
        self.buf.put_slice(address.as_bytes());
        self
    }

    pub fn uint128(mut self, value: u128) -> Self {
        self.buf.put_u128(value);
        self
    }

    pub fn uint64(mut self, value: u64) -> Self {
        self.buf.put_u64(value);
        self
    }

    pub fn uint32(mut self, value: u32) -> Self {
        self.buf.put_u32(value);
        self
    }

    pub fn word(mut self, word: &[u8; 32]) -> Self {
        self.buf.put_slice(word);
        self
    }

    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.buf.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        self
    }

    pub fn addresses(mut self, addresses: &[Address]) -> Self {
        self.buf.put_u32(addresses.len() as u32);
        for address in addresses {
            self.buf.put_slice(address.as_bytes());
        }
        self
    }

    /// Finish and return the encoded payload
    pub fn finish(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Cursor over a call payload's arguments
pub struct AbiDecoder<'a> {
    buf: &'a [u8],
}

impl<'a> AbiDecoder<'a> {
    /// Split off the selector and return a decoder over the arguments
    pub fn new(payload: &'a [u8]) -> Result<(Selector, Self), AbiError> {
        if payload.len() < 4 {
            return Err(AbiError::MissingSelector);
        }
        let (head, rest) = payload.split_at(4);
        let selector = [head[0], head[1], head[2], head[3]];
        Ok((selector, Self { buf: rest }))
    }

    fn need(&self, n: usize) -> Result<(), AbiError> {
        if self.buf.remaining() < n {
            return Err(AbiError::Truncated {
                need: n,
                have: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn address(&mut self) -> Result<Address, AbiError> {
        self.need(20)?;
        let mut bytes = [0u8; 20];
        self.buf.copy_to_slice(&mut bytes);
        Ok(Address::from_bytes(bytes))
    }

    pub fn uint128(&mut self) -> Result<u128, AbiError> {
        self.need(16)?;
        Ok(self.buf.get_u128())
    }

    pub fn uint64(&mut self) -> Result<u64, AbiError> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn uint32(&mut self) -> Result<u32, AbiError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn word(&mut self) -> Result<[u8; 32], AbiError> {
        self.need(32)?;
        let mut word = [0u8; 32];
        self.buf.copy_to_slice(&mut word);
        Ok(word)
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, AbiError> {
        let len = self.uint32()? as usize;
        self.need(len)?;
        let mut data = vec![0u8; len];
        self.buf.copy_to_slice(&mut data);
        Ok(data)
    }

    pub fn addresses(&mut self) -> Result<Vec<Address>, AbiError> {
        let count = self.uint32()? as usize;
        self.need(count.saturating_mul(20))?;
        (0..count).map(|_| self.address()).collect()
    }

    /// Ensure every argument byte was consumed
    pub fn finish(self) -> Result<(), AbiError> {
        if self.buf.has_remaining() {
            return Err(AbiError::TrailingBytes(self.buf.remaining()));
        }
        Ok(())
    }
}
