/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Block proposals: preparing them as a proposer, and deciding on them as a validator.
//!
//! ## Preparing proposals
//!
//! The proposer of height `h` receives the extended votes of height `h - 1` and calls
//! [`prepare`](PrepareProposalHandler::prepare). The resulting proposal is:
//! 1. A [`SpecialTransaction`] carrying every bid in those vote extensions (the **reference bids**),
//!    if `h` is at least [`special_tx_min_height`](crate::config::Configuration::special_tx_min_height).
//! 2. The transactions of the [mempool's](crate::mempool) ready pool, optionally reshaped by a
//!    [`ProposalBuilder`].
//!
//! ## Processing proposals
//!
//! Every validator calls [`process`](ProcessProposalHandler::process) on the proposals it receives. A
//! proposal is rejected if it carries a bid that does not appear often enough among its own reference
//! bids, which keeps a proposer from sneaking in bids that the other validators never saw.

pub mod builder;
pub use builder::{ProposalBuilder, ProposalBuilderError};

pub mod prepare;
pub use prepare::PrepareProposalHandler;

pub mod process;
pub use process::ProcessProposalHandler;

pub mod types;
pub use types::{
    ExtendedVoteInfo, PrepareProposalRequest, PreparedProposal, ProcessProposalRequest,
    ProcessProposalStatus, SkippedItem, SpecialTransaction,
};
