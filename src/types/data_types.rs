/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::Hash,
};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};

use super::crypto_primitives::VerifyingKey;

/// Height of a block, as reported by the consensus engine.
///
/// Heights start at 1 for the first block. Vote extensions produced at height `h` are consumed by the
/// proposer of height `h + 1`.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    BorshDeserialize,
    BorshSerialize,
)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the height directly below this one, or `None` if this is height 0.
    pub fn prev(&self) -> Option<BlockHeight> {
        self.0.checked_sub(1).map(BlockHeight)
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// 32-byte SHA256 hash of the canonical (borsh) encoding of a [`Transaction`](super::transaction::Transaction).
///
/// The mempool computes a transaction's `TxHash` once, when the transaction is inserted, and uses it to
/// locate the transaction when promoting it to the ready pool or removing it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Create a new `TxHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `TxHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD_NO_PAD.encode(self.0))
    }
}

impl Debug for TxHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

/// Address of the account that signed a transaction.
///
/// The address is the unpadded standard Base64 encoding of the signer's Ed25519 verifying key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct SignerAddress(String);

impl SignerAddress {
    /// Derive the address of the signer holding `verifying_key`.
    pub fn from_verifying_key(verifying_key: &VerifyingKey) -> Self {
        Self(STANDARD_NO_PAD.encode(verifying_key.to_bytes()))
    }

    /// Get the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SignerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for SignerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SignerAddress({})", self.0)
    }
}

/// Bytes of an Ed25519 verifying key, as carried inside serialized transactions and vote infos.
pub type VerifyingKeyBytes = [u8; 32];

/// Ed25519 digital signature.
#[derive(Clone, Copy, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    /// Create a new `SignatureBytes` wrapping `bytes`.
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 64]` value of this `SignatureBytes`.
    pub const fn bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({})", STANDARD_NO_PAD.encode(self.0))
    }
}
