/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The threshold mempool.
//!
//! ## Pending and ready pools
//!
//! Transactions received through gossip are [`insert`](ThresholdMempool::insert)-ed into the
//! **pending** pool. They stay there until the next vote extension pass
//! ([`VoteExtensionHandler::extend`](crate::vote_extension::VoteExtensionHandler::extend)) drains the
//! pending pool and [`update`](ThresholdMempool::update)s every drained transaction into the **ready**
//! pool. Only transactions in the ready pool are [`select`](ThresholdMempool::select)-ed into block
//! proposals, and they leave the ready pool when the application [`remove`](ThresholdMempool::remove)s
//! them after commit.
//!
//! ```text
//! insert ──► pending ──update──► ready ──remove──► (gone)
//! ```
//!
//! An entry is always in exactly one of the two pools, or in neither. Both pools are ordered by
//! insertion; the `priority` recorded in each [`MempoolEntry`] does not reorder them.
//!
//! ## Identifying transactions
//!
//! Entries are identified by their signer (derived from the transaction's first verifiable signature)
//! together with the SHA256 hash of the transaction's canonical encoding, computed once at insertion.

pub mod implementation;
pub use implementation::ThresholdMempool;

pub mod types;
pub use types::{MempoolEntry, MempoolError, MempoolIterator};
