/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`PrepareProposalHandler`].

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::Configuration;
use crate::events::{Event, PrepareProposalEvent, SkipProposalItemEvent};
use crate::mempool::ThresholdMempool;
use crate::types::{
    data_types::BlockHeight,
    transaction::{Transaction, TxCodec},
};
use crate::vote_extension::VoteExtension;

use super::builder::ProposalBuilder;
use super::types::{
    ExtendedVoteInfo, PrepareProposalRequest, PreparedProposal, SkippedItem, SpecialTransaction,
};

/// Builds this validator's block proposals out of the previous height's vote extensions and the
/// mempool's ready pool.
pub struct PrepareProposalHandler {
    configuration: Configuration,
    codec: Arc<dyn TxCodec>,
    mempool: ThresholdMempool,
    proposal_builder: Option<Box<dyn ProposalBuilder>>,
    event_publisher: Option<Sender<Event>>,
}

impl PrepareProposalHandler {
    pub fn new(
        configuration: Configuration,
        codec: Arc<dyn TxCodec>,
        mempool: ThresholdMempool,
        proposal_builder: Option<Box<dyn ProposalBuilder>>,
        event_publisher: Option<Sender<Event>>,
    ) -> PrepareProposalHandler {
        PrepareProposalHandler {
            configuration,
            codec,
            mempool,
            proposal_builder,
            event_publisher,
        }
    }

    /// Prepare a proposal for `request.height`.
    ///
    /// At heights of at least [`special_tx_min_height`](Configuration::special_tx_min_height), the first
    /// transaction of the proposal is a [`SpecialTransaction`] aggregating the bids of every vote
    /// extension in `request.local_last_commit`. It is followed by the transactions of the ready pool, in
    /// pool order, passed through the proposal builder if one is configured and enabled.
    ///
    /// Preparing a proposal never fails. Everything that had to be left out is reported in
    /// [`PreparedProposal::skipped`], in the order it was encountered.
    pub fn prepare(&mut self, request: PrepareProposalRequest) -> PreparedProposal {
        let height = request.height;
        let mut txs = Vec::new();
        let mut skipped = Vec::new();
        let mut tx_bytes: u64 = 0;

        let mut special_tx_bids = None;
        if height >= self.configuration.special_tx_min_height {
            let special_tx =
                aggregate_vote_extensions(height, &request.local_last_commit, &mut skipped);
            match special_tx.to_bytes() {
                Ok(bytes) => {
                    special_tx_bids = Some(special_tx.bids.len());
                    tx_bytes += bytes.len() as u64;
                    txs.push(bytes);
                }
                Err(err) => {
                    log::error!("Unable to serialize special transaction: {}", err);
                    skipped.push(SkippedItem::SpecialTransaction {
                        reason: err.to_string(),
                    });
                }
            }
        }

        for tx in self.ready_txs(height, &mut skipped) {
            let bytes = match self.codec.encode(&tx) {
                Ok(bytes) => bytes,
                Err(err) => {
                    skipped.push(SkippedItem::EncodeTx {
                        tx_hash: tx.hash().ok(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let size = bytes.len() as u64;
            if let Some(max_tx_bytes) = self.configuration.max_tx_bytes {
                if tx_bytes + size > max_tx_bytes {
                    skipped.push(SkippedItem::ExceedsMaxTxBytes {
                        tx_hash: tx.hash().ok(),
                        size,
                    });
                    continue;
                }
            }

            tx_bytes += size;
            txs.push(bytes);
        }

        for item in &skipped {
            Event::publish(
                &self.event_publisher,
                Event::SkipProposalItem(SkipProposalItemEvent {
                    timestamp: SystemTime::now(),
                    height,
                    item: item.clone(),
                }),
            );
        }
        Event::publish(
            &self.event_publisher,
            Event::PrepareProposal(PrepareProposalEvent {
                timestamp: SystemTime::now(),
                height,
                special_tx_bids,
                txs: txs.len(),
                skipped: skipped.len(),
            }),
        );

        PreparedProposal { txs, skipped }
    }

    /// Get the ready transactions to propose at `height`, falling back to the ready pool's own selection
    /// if the proposal builder fails.
    fn ready_txs(
        &mut self,
        height: BlockHeight,
        skipped: &mut Vec<SkippedItem>,
    ) -> Vec<Arc<Transaction>> {
        let selected: Vec<Arc<Transaction>> = self.mempool.select().collect();
        if !self.configuration.run_proposal_builder {
            return selected;
        }
        let Some(proposal_builder) = self.proposal_builder.as_mut() else {
            return selected;
        };

        match proposal_builder.build_proposal(height, selected.clone()) {
            Ok(built) => built,
            Err(err) => {
                log::error!("Proposal builder failed at height {}: {}", height, err);
                skipped.push(SkippedItem::ProposalBuilder {
                    reason: err.to_string(),
                });
                selected
            }
        }
    }
}

/// Aggregate the bids of every vote extension in `votes` into the special transaction of `height`.
///
/// Bids keep the order of `votes`, then the order within each extension. Votes without an extension are
/// passed over. Extensions that cannot be decoded, or that were produced at a height other than
/// `height - 1`, are reported in `skipped` and contribute no bids.
///
/// The special transaction's height is that of the last aggregated extension, or `height - 1` if no
/// extension was aggregated.
pub fn aggregate_vote_extensions(
    height: BlockHeight,
    votes: &[ExtendedVoteInfo],
    skipped: &mut Vec<SkippedItem>,
) -> SpecialTransaction {
    let expected_height = height.prev().unwrap_or_default();
    let mut special_tx = SpecialTransaction {
        height: expected_height,
        bids: Vec::new(),
    };

    for vote in votes {
        if vote.vote_extension.is_empty() {
            continue;
        }

        match VoteExtension::from_bytes(&vote.vote_extension) {
            Ok(vote_extension) if vote_extension.height == expected_height => {
                special_tx.height = vote_extension.height;
                special_tx.bids.extend(vote_extension.bids);
            }
            Ok(vote_extension) => skipped.push(SkippedItem::VoteExtensionHeightMismatch {
                validator: vote.validator,
                height: vote_extension.height,
            }),
            Err(err) => skipped.push(SkippedItem::MalformedVoteExtension {
                validator: vote.validator,
                reason: err.to_string(),
            }),
        }
    }

    special_tx
}
