/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by the mempool and the ABCI-style handlers, for event handling
//! and logging.
//!
//! Note: an event for a given action indicates that the action has been completed.
//!
//! Components publish events into an optional [`Sender<Event>`]. When the components are wired together
//! with [`ThresholdAppSpec`](crate::app::ThresholdAppSpec), the events are consumed by the
//! [event bus](crate::event_bus), which passes each one to the default logging handler (if
//! [`log_events`](crate::config::Configuration::log_events) is set) and to the user-registered handlers.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::proposal::types::{ProcessProposalStatus, SkippedItem};
use crate::types::data_types::{BlockHeight, SignerAddress, TxHash};
use crate::vote_extension::types::VerifyStatus;

pub enum Event {
    // Events that change the contents of the mempool.
    InsertTx(InsertTxEvent),
    PromoteTx(PromoteTxEvent),
    RemoveTx(RemoveTxEvent),
    // Vote extension events.
    ExtendVote(ExtendVoteEvent),
    VerifyVoteExtension(VerifyVoteExtensionEvent),
    // Proposal events.
    PrepareProposal(PrepareProposalEvent),
    ProcessProposal(ProcessProposalEvent),
    SkipProposalItem(SkipProposalItemEvent),
}

impl Event {
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            // The receiving end is dropped only when the event bus shuts down.
            let _ = event_publisher.send(event);
        }
    }
}

/// A transaction was appended to the pending pool.
pub struct InsertTxEvent {
    pub timestamp: SystemTime,
    pub signer: SignerAddress,
    pub tx_hash: TxHash,
    pub pending: usize,
}

/// A transaction was moved from the pending pool to the ready pool.
pub struct PromoteTxEvent {
    pub timestamp: SystemTime,
    pub signer: SignerAddress,
    pub tx_hash: TxHash,
}

/// A transaction was removed from the ready pool.
pub struct RemoveTxEvent {
    pub timestamp: SystemTime,
    pub signer: SignerAddress,
    pub tx_hash: TxHash,
}

/// This validator produced its vote extension for `height`.
pub struct ExtendVoteEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub bids: usize,
    pub extra_info_keys: Vec<String>,
    pub promoted: usize,
}

/// This validator verified a peer's vote extension. `height` is `None` if the extension could not be
/// deserialized.
pub struct VerifyVoteExtensionEvent {
    pub timestamp: SystemTime,
    pub height: Option<BlockHeight>,
    pub status: VerifyStatus,
}

/// This validator, as proposer, assembled a proposal for `height`.
pub struct PrepareProposalEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub special_tx_bids: Option<usize>,
    pub txs: usize,
    pub skipped: usize,
}

/// This validator decided whether to accept a proposal.
pub struct ProcessProposalEvent {
    pub timestamp: SystemTime,
    pub txs: usize,
    pub status: ProcessProposalStatus,
}

/// An item was left out of the proposal for `height`.
pub struct SkipProposalItemEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub item: SkippedItem,
}
