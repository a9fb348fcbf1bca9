/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The test suite drives the mempool and the handlers directly, the way a consensus engine would: it
//! inserts signed transactions, extends votes, and feeds the resulting vote extensions into proposal
//! requests. Nothing here touches the network or the disk.
//!
//! - [fixtures] builds keys, bids, transactions and extended votes.
//! - [mocks] provides subscribers, proposal builders and codecs whose behavior tests can control and
//!   observe.

pub(crate) mod fixtures;

pub(crate) mod logging;

pub(crate) mod mocks;
