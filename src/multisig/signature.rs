//! Off-chain endorsements
//!
//! Owners sign a canonical digest of `(wallet, destination, value, payload,
//! nonce)` off-chain. A relayer submits the concatenated signatures; the
//! verifier recovers every signer and checks them against the live owner set.
//! Signers must appear in strictly increasing address order, which also
//! rules out duplicates.

use crate::core::host::hex_bytes;
use crate::core::Address;
use crate::crypto::{recover_signer, sha256, KeyPair, SIGNATURE_LENGTH};
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::wallet::WalletError;
use bytes::BufMut;
use serde::{Deserialize, Serialize};

/// Domain prefix of the signed message
const MESSAGE_PREFIX: [u8; 2] = [0x19, 0x00];

/// Per-wallet counter consumed by each signature-authorized execution
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayGuard {
    nonce: u64,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value the next endorsement bundle must be signed over
    pub fn current(&self) -> u64 {
        self.nonce
    }

    /// Consume the current value, returning it
    pub(in crate::multisig) fn advance(&mut self) -> u64 {
        let used = self.nonce;
        self.nonce += 1;
        used
    }
}

/// Canonical digest an owner signs to endorse an action
pub fn signing_digest(
    wallet: &Address,
    destination: &Address,
    value: u128,
    payload: &[u8],
    nonce: u64,
) -> [u8; 32] {
    let mut message = Vec::with_capacity(70 + payload.len());
    message.put_slice(&MESSAGE_PREFIX);
    message.put_slice(wallet.as_bytes());
    message.put_slice(destination.as_bytes());
    message.put_u128(value);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.put_u64(nonce);
    sha256(&message)
}

/// Concatenated 65-byte signatures
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementBundle(#[serde(with = "hex_bytes")] Vec<u8>);

impl EndorsementBundle {
    /// Wrap raw concatenated signatures
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Concatenate signatures in the given order
    pub fn from_signatures(signatures: &[[u8; SIGNATURE_LENGTH]]) -> Self {
        Self(signatures.concat())
    }

    /// Sign `digest` with every key and order the signatures by signer
    /// address, as the verifier requires
    pub fn sign_sorted(keys: &[&KeyPair], digest: &[u8; 32]) -> Result<Self, WalletError> {
        let mut signed = keys
            .iter()
            .map(|key| -> Result<_, WalletError> { Ok((key.address(), key.sign(digest)?)) })
            .collect::<Result<Vec<_>, _>>()?;
        signed.sort_by_key(|(address, _)| *address);
        let signatures: Vec<[u8; SIGNATURE_LENGTH]> =
            signed.into_iter().map(|(_, sig)| sig).collect();
        Ok(Self::from_signatures(&signatures))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of complete signatures
    pub fn len(&self) -> usize {
        self.0.len() / SIGNATURE_LENGTH
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Individual signatures, in bundle order
    pub fn signatures(&self) -> impl Iterator<Item = &[u8]> {
        self.0.chunks(SIGNATURE_LENGTH)
    }
}

/// Verify `bundle` over `digest` against the current owners and threshold.
///
/// Returns the recovered signers in bundle order.
pub fn verify_endorsements(
    owners: &OwnerRegistry,
    digest: &[u8; 32],
    bundle: &EndorsementBundle,
) -> Result<Vec<Address>, WalletError> {
    if bundle.as_bytes().len() % SIGNATURE_LENGTH != 0 {
        return Err(WalletError::MalformedSignatures(bundle.as_bytes().len()));
    }

    let count = bundle.len();
    let need = owners.threshold() as usize;
    if count < need {
        return Err(WalletError::InsufficientSignatures { have: count, need });
    }

    let mut signers = Vec::with_capacity(count);
    let mut last = Address::ZERO;
    for signature in bundle.signatures() {
        let signer =
            recover_signer(digest, signature).map_err(|_| WalletError::InvalidSignature)?;
        if signer <= last {
            return Err(WalletError::SignersNotSorted);
        }
        if !owners.is_owner(&signer) {
            return Err(WalletError::SignerNotOwner(signer));
        }
        signers.push(signer);
        last = signer;
    }

    Ok(signers)
}
