/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Entries, iterators and errors of the [threshold mempool](super::ThresholdMempool).

use std::fmt::{self, Display, Formatter};
use std::io;
use std::sync::Arc;

use crate::types::{
    data_types::{SignerAddress, TxHash},
    transaction::Transaction,
};

/// Priority given to entries in the pending pool.
pub const PENDING_PRIORITY: i64 = 0;

/// Priority given to entries when they are promoted to the ready pool.
pub const READY_PRIORITY: i64 = 1;

/// A transaction held in one of the mempool's pools.
///
/// `priority` is informational only: both pools are ordered by insertion, never by priority.
#[derive(Clone, Debug)]
pub struct MempoolEntry {
    pub signer: SignerAddress,
    pub priority: i64,
    pub tx_hash: TxHash,
    pub tx: Arc<Transaction>,
}

/// Two entries are equal iff they were signed by the same signer and hold transactions with the same
/// hash. `priority` is not compared, so an entry is equal to its promoted self.
impl PartialEq for MempoolEntry {
    fn eq(&self, other: &Self) -> bool {
        self.signer == other.signer && self.tx_hash == other.tx_hash
    }
}

impl Eq for MempoolEntry {}

/// A forward iterator over a snapshot of one of the mempool's pools, in insertion order.
///
/// The snapshot is copied when the iterator is created, so inserting, promoting or removing
/// transactions afterwards does not change what the iterator yields.
///
/// ## Cursor
///
/// The cursor starts *before* the first entry. Every successful call to [`next`](Iterator::next)
/// advances it by one, after which [`tx`](Self::tx) and [`entry`](Self::entry) return the entry under
/// the cursor. [`rewind`](Self::rewind) moves the cursor back before the first entry.
#[derive(Clone, Debug)]
pub struct MempoolIterator {
    entries: Vec<MempoolEntry>,
    // Index of the entry under the cursor. `None` before the first call to `next`.
    cursor: Option<usize>,
}

impl MempoolIterator {
    pub(crate) fn new(entries: Vec<MempoolEntry>) -> MempoolIterator {
        MempoolIterator {
            entries,
            cursor: None,
        }
    }

    /// Get the transaction under the cursor.
    pub fn tx(&self) -> Option<&Arc<Transaction>> {
        self.entry().map(|entry| &entry.tx)
    }

    /// Get the entry under the cursor.
    pub fn entry(&self) -> Option<&MempoolEntry> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    /// Move the cursor back before the first entry, so that the snapshot can be iterated again.
    pub fn rewind(&mut self) {
        self.cursor = None;
    }

    /// Whether the snapshot contains no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get all the entries of the snapshot, regardless of the cursor.
    pub fn entries(&self) -> &[MempoolEntry] {
        &self.entries
    }

    fn next_index(&self) -> usize {
        self.cursor.map_or(0, |cursor| cursor + 1)
    }
}

impl Iterator for MempoolIterator {
    type Item = Arc<Transaction>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.next_index();
        if next < self.entries.len() {
            self.cursor = Some(next);
            Some(Arc::clone(&self.entries[next].tx))
        } else {
            // Park the cursor past the end, so that `tx` returns `None` once exhausted.
            self.cursor = Some(self.entries.len());
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len().saturating_sub(self.next_index());
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MempoolIterator {}

/// The different ways a call to a method of the [`ThresholdMempool`](super::ThresholdMempool) can fail.
#[derive(Debug)]
pub enum MempoolError {
    /// The transaction carries no signature that verifies, so no signer address can be derived from it.
    /// Retrying with the same transaction will fail in the same way.
    MissingSignature,

    /// No entry with the transaction's signer and hash is in the pool that the operation searches
    /// (pending for `update`, ready for `remove`). Callers should treat the transaction as already absent.
    TxNotFound { tx_hash: TxHash },

    /// The transaction could not be serialized in order to compute its hash.
    HashTxError(io::Error),
}

impl Display for MempoolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MempoolError::MissingSignature => write!(f, "transaction has no verifiable signature"),
            MempoolError::TxNotFound { tx_hash } => {
                write!(f, "transaction {} not found in the mempool", tx_hash)
            }
            MempoolError::HashTxError(err) => write!(f, "failed to hash transaction: {}", err),
        }
    }
}

impl From<io::Error> for MempoolError {
    fn from(value: io::Error) -> Self {
        MempoolError::HashTxError(value)
    }
}
