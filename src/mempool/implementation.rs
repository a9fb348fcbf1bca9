/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`ThresholdMempool`] and its two pools.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use crate::events::{Event, InsertTxEvent, PromoteTxEvent, RemoveTxEvent};
use crate::types::{
    data_types::{SignerAddress, TxHash},
    transaction::Transaction,
};

use super::types::{MempoolEntry, MempoolError, MempoolIterator, PENDING_PRIORITY, READY_PRIORITY};

/// A mempool that holds transactions in a *pending* pool until they have been witnessed by a vote
/// extension pass, and only then promotes them to a *ready* pool from which proposals are built.
///
/// `ThresholdMempool` is a cheaply cloneable handle: every clone refers to the same pools. All pool
/// mutations and snapshots happen under a single lock, so transactions may be [`insert`](Self::insert)-ed
/// from a gossip thread while the vote extension and proposal handlers run on another.
#[derive(Clone, Default)]
pub struct ThresholdMempool {
    pools: Arc<Mutex<Pools>>,
}

#[derive(Default)]
struct Pools {
    pending: Pool,
    ready: Pool,
    event_publisher: Option<Sender<Event>>,
}

impl ThresholdMempool {
    /// Create an empty mempool.
    pub fn new() -> ThresholdMempool {
        ThresholdMempool::default()
    }

    /// Publish the mempool's events into `event_publisher` from now on, from every clone of this handle.
    pub(crate) fn set_event_publisher(&self, event_publisher: Option<Sender<Event>>) {
        self.lock().event_publisher = event_publisher;
    }

    /// Append `tx` to the pending pool, returning its hash.
    ///
    /// The entry's signer is the signer of the first verifiable signature of `tx`. Transactions are not
    /// deduplicated: inserting the same transaction twice creates two entries.
    pub fn insert(&self, tx: Transaction) -> Result<TxHash, MempoolError> {
        let (signer, tx_hash) = identify(&tx)?;

        let mut pools = self.lock();
        pools.pending.push(MempoolEntry {
            signer: signer.clone(),
            priority: PENDING_PRIORITY,
            tx_hash,
            tx: Arc::new(tx),
        });

        Event::publish(
            &pools.event_publisher,
            Event::InsertTx(InsertTxEvent {
                timestamp: SystemTime::now(),
                signer,
                tx_hash,
                pending: pools.pending.len(),
            }),
        );

        Ok(tx_hash)
    }

    /// Get an iterator over a snapshot of the pending pool, in insertion order.
    pub fn select_pending(&self) -> MempoolIterator {
        MempoolIterator::new(self.lock().pending.snapshot())
    }

    /// Get an iterator over a snapshot of the ready pool, in the order that its entries were promoted.
    ///
    /// This is the only source of transactions for block proposals.
    pub fn select(&self) -> MempoolIterator {
        MempoolIterator::new(self.lock().ready.snapshot())
    }

    /// Move the oldest pending entry that matches `tx` to the back of the ready pool.
    pub fn update(&self, tx: &Transaction) -> Result<(), MempoolError> {
        let (signer, tx_hash) = identify(tx)?;

        let mut pools = self.lock();
        let mut entry = pools
            .pending
            .take(&signer, &tx_hash)
            .ok_or(MempoolError::TxNotFound { tx_hash })?;
        entry.priority = READY_PRIORITY;
        pools.ready.push(entry);

        Event::publish(
            &pools.event_publisher,
            Event::PromoteTx(PromoteTxEvent {
                timestamp: SystemTime::now(),
                signer,
                tx_hash,
            }),
        );

        Ok(())
    }

    /// Remove the oldest ready entry that matches `tx`.
    ///
    /// Pending entries are never removed by this method: a transaction that has not yet been promoted
    /// is reported as [`TxNotFound`](MempoolError::TxNotFound).
    pub fn remove(&self, tx: &Transaction) -> Result<(), MempoolError> {
        let (signer, tx_hash) = identify(tx)?;

        let mut pools = self.lock();
        pools
            .ready
            .take(&signer, &tx_hash)
            .ok_or(MempoolError::TxNotFound { tx_hash })?;

        Event::publish(
            &pools.event_publisher,
            Event::RemoveTx(RemoveTxEvent {
                timestamp: SystemTime::now(),
                signer,
                tx_hash,
            }),
        );

        Ok(())
    }

    /// Get the number of transactions in the **pending** pool.
    ///
    /// Transactions in the ready pool are not counted. Use [`len`](Self::len) for the total.
    pub fn count_tx(&self) -> usize {
        self.lock().pending.len()
    }

    /// Get the number of transactions in the ready pool.
    pub fn count_ready(&self) -> usize {
        self.lock().ready.len()
    }

    /// Get the number of transactions in both pools.
    pub fn len(&self) -> usize {
        let pools = self.lock();
        pools.pending.len() + pools.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The pools hold no invariant that a thread panicking mid-operation could leave half-established,
    // so a poisoned lock is simply taken over.
    fn lock(&self) -> MutexGuard<'_, Pools> {
        self.pools.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Derive the signer address and hash that identify `tx` inside the pools.
fn identify(tx: &Transaction) -> Result<(SignerAddress, TxHash), MempoolError> {
    let signer = tx
        .verified_signers()
        .into_iter()
        .next()
        .ok_or(MempoolError::MissingSignature)?;
    let tx_hash = tx.hash()?;
    Ok((signer.address, tx_hash))
}

/// An insertion-ordered sequence of entries, indexed by transaction hash.
///
/// Entries are keyed by a monotonically increasing sequence number, so iterating `entries` yields them
/// in insertion order, and `index` locates every entry holding a given hash without scanning the pool.
#[derive(Default)]
struct Pool {
    next_seq: u64,
    entries: BTreeMap<u64, MempoolEntry>,
    // Sequence numbers of the entries holding each hash, oldest first.
    index: HashMap<TxHash, VecDeque<u64>>,
}

impl Pool {
    fn push(&mut self, entry: MempoolEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.entry(entry.tx_hash).or_default().push_back(seq);
        self.entries.insert(seq, entry);
    }

    /// Remove and return the oldest entry signed by `signer` and holding `tx_hash`.
    fn take(&mut self, signer: &SignerAddress, tx_hash: &TxHash) -> Option<MempoolEntry> {
        let seqs = self.index.get_mut(tx_hash)?;
        let position = seqs
            .iter()
            .position(|seq| self.entries.get(seq).is_some_and(|entry| &entry.signer == signer))?;
        let seq = seqs.remove(position)?;
        if seqs.is_empty() {
            self.index.remove(tx_hash);
        }
        self.entries.remove(&seq)
    }

    fn snapshot(&self) -> Vec<MempoolEntry> {
        self.entries.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
