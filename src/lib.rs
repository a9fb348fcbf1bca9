/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A two-stage mempool and the block proposal handlers of a chain that runs sealed-bid style auctions
//! through consensus vote extensions.
//!
//! Transactions first wait in the [mempool's](mempool) *pending* pool. Once per height, every validator
//! drains the pending pool into its [vote extension](vote_extension), which promotes the drained
//! transactions to the *ready* pool. The next height's proposer places every bid from the collected
//! vote extensions into a special transaction at the head of its [proposal](proposal), and every validator
//! [rejects](validation) a proposal that carries a bid that too few vote extensions contained.
//!
//! The components can be used individually, or wired together into a [ThresholdApp](app::ThresholdApp)
//! that also publishes [events](events) to logging and user-defined handlers.

pub mod app;

pub mod config;

pub mod events;

pub mod mempool;

pub mod proposal;

pub mod types;

pub mod validation;

pub mod vote_extension;

pub(crate) mod event_bus;

pub(crate) mod logging;
