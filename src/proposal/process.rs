/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`ProcessProposalHandler`].

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::Configuration;
use crate::events::{Event, ProcessProposalEvent};
use crate::types::transaction::TxCodec;
use crate::validation::validate_bids;

use super::types::{ProcessProposalRequest, ProcessProposalStatus, SpecialTransaction};

/// Decides whether this validator accepts a block proposal, by checking the proposal's bids against the
/// reference bids carried in its special transaction.
pub struct ProcessProposalHandler {
    configuration: Configuration,
    codec: Arc<dyn TxCodec>,
    event_publisher: Option<Sender<Event>>,
}

impl ProcessProposalHandler {
    pub fn new(
        configuration: Configuration,
        codec: Arc<dyn TxCodec>,
        event_publisher: Option<Sender<Event>>,
    ) -> ProcessProposalHandler {
        ProcessProposalHandler {
            configuration,
            codec,
            event_publisher,
        }
    }

    /// Decide on the proposal in `request`.
    ///
    /// A proposal is accepted if:
    /// - It is empty.
    /// - Its first transaction is not a special transaction, unless
    ///   [`reject_malformed_special_tx`](Configuration::reject_malformed_special_tx) is set and the
    ///   proposal is at a height that always carries one.
    /// - Its special transaction carries no bids.
    /// - Every bid in its remaining transactions appears among the special transaction's bids at least
    ///   the threshold number of times (see [`validation`](crate::validation)).
    ///
    /// Otherwise, including when the special transaction's bids or the remaining transactions cannot be
    /// decoded, it is rejected.
    pub fn process(&self, request: &ProcessProposalRequest) -> ProcessProposalStatus {
        let status = self.decide(request);

        Event::publish(
            &self.event_publisher,
            Event::ProcessProposal(ProcessProposalEvent {
                timestamp: SystemTime::now(),
                txs: request.txs.len(),
                status,
            }),
        );

        status
    }

    fn decide(&self, request: &ProcessProposalRequest) -> ProcessProposalStatus {
        let Some((first_tx, rest)) = request.txs.split_first() else {
            return ProcessProposalStatus::Accept;
        };

        let special_tx = match SpecialTransaction::from_bytes(first_tx) {
            Ok(special_tx) => special_tx,
            Err(err) => {
                if self.configuration.reject_malformed_special_tx
                    && request.height >= self.configuration.special_tx_min_height
                {
                    log::warn!(
                        "Rejecting proposal at height {} with malformed special transaction: {}",
                        request.height,
                        err
                    );
                    return ProcessProposalStatus::Reject;
                }
                log::debug!(
                    "First transaction of proposal at height {} is not a special transaction: {}",
                    request.height,
                    err
                );
                return ProcessProposalStatus::Accept;
            }
        };

        if special_tx.bids.is_empty() {
            return ProcessProposalStatus::Accept;
        }

        let reference_bids = match special_tx.decode_bids() {
            Ok(reference_bids) => reference_bids,
            Err(err) => {
                log::warn!(
                    "Rejecting proposal at height {} with undecodable reference bids: {}",
                    request.height,
                    err
                );
                return ProcessProposalStatus::Reject;
            }
        };

        match validate_bids(self.codec.as_ref(), &reference_bids, rest) {
            Ok(true) => ProcessProposalStatus::Accept,
            Ok(false) => ProcessProposalStatus::Reject,
            Err(err) => {
                log::warn!(
                    "Rejecting proposal at height {} whose bids cannot be validated: {}",
                    request.height,
                    err
                );
                ProcessProposalStatus::Reject
            }
        }
    }
}
