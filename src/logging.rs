/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the app's
//! [configuration](crate::config::Configuration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an [InsertTx](crate::events::InsertTxEvent) is printed:
//!
//! ```text
//! InsertTx, 1701329264, Id5u7f6, fNGCJyk, 3
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the signer's address.
//! - The fourth value is the first seven characters of the Base64 encoding of the transaction's hash.
//! - The fifth value is the number of transactions in the pending pool after the insertion.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log;
use std::time::SystemTime;

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const INSERT_TX: &str = "InsertTx";
pub const PROMOTE_TX: &str = "PromoteTx";
pub const REMOVE_TX: &str = "RemoveTx";

pub const EXTEND_VOTE: &str = "ExtendVote";
pub const VERIFY_VOTE_EXTENSION: &str = "VerifyVoteExtension";

pub const PREPARE_PROPOSAL: &str = "PrepareProposal";
pub const PROCESS_PROPOSAL: &str = "ProcessProposal";
pub const SKIP_PROPOSAL_ITEM: &str = "SkipProposalItem";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for InsertTxEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |insert_tx_event: &InsertTxEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                INSERT_TX,
                secs_since_unix_epoch(insert_tx_event.timestamp),
                first_seven_chars(insert_tx_event.signer.as_str()),
                first_seven_base64_chars(&insert_tx_event.tx_hash.bytes()),
                insert_tx_event.pending
            )
        };
        Box::new(logger)
    }
}

impl Logger for PromoteTxEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |promote_tx_event: &PromoteTxEvent| {
            log::info!(
                "{}, {}, {}, {}",
                PROMOTE_TX,
                secs_since_unix_epoch(promote_tx_event.timestamp),
                first_seven_chars(promote_tx_event.signer.as_str()),
                first_seven_base64_chars(&promote_tx_event.tx_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for RemoveTxEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |remove_tx_event: &RemoveTxEvent| {
            log::info!(
                "{}, {}, {}, {}",
                REMOVE_TX,
                secs_since_unix_epoch(remove_tx_event.timestamp),
                first_seven_chars(remove_tx_event.signer.as_str()),
                first_seven_base64_chars(&remove_tx_event.tx_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for ExtendVoteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |extend_vote_event: &ExtendVoteEvent| {
            log::info!(
                "{}, {}, {}, {}, {:?}, {}",
                EXTEND_VOTE,
                secs_since_unix_epoch(extend_vote_event.timestamp),
                extend_vote_event.height,
                extend_vote_event.bids,
                extend_vote_event.extra_info_keys,
                extend_vote_event.promoted
            )
        };
        Box::new(logger)
    }
}

impl Logger for VerifyVoteExtensionEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |verify_vote_extension_event: &VerifyVoteExtensionEvent| {
            log::info!(
                "{}, {}, {}, {:?}",
                VERIFY_VOTE_EXTENSION,
                secs_since_unix_epoch(verify_vote_extension_event.timestamp),
                verify_vote_extension_event
                    .height
                    .map_or(String::from("-"), |height| height.to_string()),
                verify_vote_extension_event.status
            )
        };
        Box::new(logger)
    }
}

impl Logger for PrepareProposalEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |prepare_proposal_event: &PrepareProposalEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                PREPARE_PROPOSAL,
                secs_since_unix_epoch(prepare_proposal_event.timestamp),
                prepare_proposal_event.height,
                prepare_proposal_event
                    .special_tx_bids
                    .map_or(String::from("-"), |bids| bids.to_string()),
                prepare_proposal_event.txs,
                prepare_proposal_event.skipped
            )
        };
        Box::new(logger)
    }
}

impl Logger for ProcessProposalEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |process_proposal_event: &ProcessProposalEvent| {
            log::info!(
                "{}, {}, {}, {:?}",
                PROCESS_PROPOSAL,
                secs_since_unix_epoch(process_proposal_event.timestamp),
                process_proposal_event.txs,
                process_proposal_event.status
            )
        };
        Box::new(logger)
    }
}

impl Logger for SkipProposalItemEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |skip_proposal_item_event: &SkipProposalItemEvent| {
            log::warn!(
                "{}, {}, {}, {}",
                SKIP_PROPOSAL_ITEM,
                secs_since_unix_epoch(skip_proposal_item_event.timestamp),
                skip_proposal_item_event.height,
                skip_proposal_item_event.item
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    first_seven_chars(&STANDARD_NO_PAD.encode(bytes))
}

fn first_seven_chars(string: &str) -> String {
    string.chars().take(7).collect()
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
