/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Vote extensions: the data that every validator attaches to its consensus vote, and which the next
//! height's proposer aggregates into the special transaction.
//!
//! ## Producing vote extensions
//!
//! Once per height, every validator (proposer or not) calls
//! [`extend`](VoteExtensionHandler::extend). This drains the [mempool's](crate::mempool) pending pool:
//! bids go directly into the extension's `bids`, other messages are offered to the registered
//! [subscribers](VoteExtensionSubscriber), and every drained transaction is promoted to the ready pool.
//!
//! ## Verifying vote extensions
//!
//! [`verify`](VoteExtensionHandler::verify) checks a peer's extension by handing each entry of its
//! `extra_info` to the subscriber registered under the same key. Entries with no registered subscriber
//! cause the extension to be rejected, so that extensions for modules this validator does not run are
//! never silently accepted.

pub mod implementation;
pub use implementation::VoteExtensionHandler;

pub mod subscriber;
pub use subscriber::{FnSubscriber, VoteExtensionSubscriber};

pub mod types;
pub use types::{ExtendRequest, ExtendVoteError, SubscriberError, VerifyStatus, VoteExtension};
