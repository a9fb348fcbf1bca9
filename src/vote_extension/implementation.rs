/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The [`VoteExtensionHandler`].

use std::collections::BTreeMap;
use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::events::{Event, ExtendVoteEvent, VerifyVoteExtensionEvent};
use crate::mempool::ThresholdMempool;
use crate::types::{data_types::BlockHeight, transaction::Message};

use super::subscriber::VoteExtensionSubscriber;
use super::types::{ExtendRequest, ExtendVoteError, VerifyStatus, VoteExtension};

/// Produces this validator's vote extensions and verifies those of its peers.
pub struct VoteExtensionHandler {
    mempool: ThresholdMempool,
    subscribers: BTreeMap<String, Box<dyn VoteExtensionSubscriber>>,
    event_publisher: Option<Sender<Event>>,
}

impl VoteExtensionHandler {
    pub fn new(
        mempool: ThresholdMempool,
        event_publisher: Option<Sender<Event>>,
    ) -> VoteExtensionHandler {
        VoteExtensionHandler {
            mempool,
            subscribers: BTreeMap::new(),
            event_publisher,
        }
    }

    /// Register `subscriber` under `key`, replacing any subscriber previously registered under the same
    /// key.
    pub fn register_subscriber(
        &mut self,
        key: impl Into<String>,
        subscriber: impl VoteExtensionSubscriber + 'static,
    ) {
        self.subscribers.insert(key.into(), Box::new(subscriber));
    }

    pub(crate) fn register_boxed_subscriber(
        &mut self,
        key: String,
        subscriber: Box<dyn VoteExtensionSubscriber>,
    ) {
        self.subscribers.insert(key, subscriber);
    }

    /// Get the keys of the registered subscribers, in ascending order.
    pub fn subscriber_keys(&self) -> impl Iterator<Item = &str> {
        self.subscribers.keys().map(String::as_str)
    }

    /// Drain the pending pool into this validator's vote extension for `height`, and return the
    /// serialized extension.
    ///
    /// Every bid found in the drained transactions goes into the extension's `bids`. Every other
    /// message is offered to every registered subscriber; the last successful contribution of each
    /// subscriber ends up in `extra_info`. Each drained transaction is then promoted to the ready pool,
    /// whether or not any subscriber made use of it.
    ///
    /// Failures to serialize a bid, failures of subscribers, and failures to promote a transaction are
    /// logged and do not stop the pass.
    pub fn extend(&self, height: BlockHeight) -> Result<Vec<u8>, ExtendVoteError> {
        let mut bids = Vec::new();
        let mut extra_info = BTreeMap::new();
        let mut promoted = 0;

        for tx in self.mempool.select_pending() {
            for message in tx.messages() {
                match message {
                    Message::Bid(bid) => match bid.canonical_bytes() {
                        Ok(bid_bytes) => bids.push(bid_bytes),
                        Err(err) => {
                            log::error!("Failed to serialize bid for vote extension: {}", err)
                        }
                    },
                    Message::Opaque(_) => {
                        let request = ExtendRequest { height, message };
                        for (key, subscriber) in &self.subscribers {
                            match subscriber.extend(&request) {
                                Ok(info) => {
                                    extra_info.insert(key.clone(), info);
                                }
                                Err(err) => {
                                    log::warn!("Subscriber {} failed to extend vote: {}", key, err)
                                }
                            }
                        }
                    }
                }
            }

            match self.mempool.update(&tx) {
                Ok(()) => promoted += 1,
                Err(err) => log::warn!("Unable to promote mempool transaction: {}", err),
            }
        }

        let vote_extension = VoteExtension {
            height,
            bids,
            extra_info,
        };
        let bytes = vote_extension
            .to_bytes()
            .map_err(ExtendVoteError::SerializeVoteExtension)?;

        Event::publish(
            &self.event_publisher,
            Event::ExtendVote(ExtendVoteEvent {
                timestamp: SystemTime::now(),
                height,
                bids: vote_extension.bids.len(),
                extra_info_keys: vote_extension.extra_info.into_keys().collect(),
                promoted,
            }),
        );

        Ok(bytes)
    }

    /// Verify a peer's serialized vote extension.
    ///
    /// Returns:
    /// - `Reject` if `payload` is not a vote extension, or if it carries `extra_info` under a key that no
    ///   subscriber is registered under.
    /// - `Unknown` if a subscriber fails while verifying its part.
    /// - The status of the first subscriber that does not accept its part. Subscribers are consulted in
    ///   ascending key order, and none is consulted after that.
    /// - `Accept` otherwise.
    pub fn verify(&self, payload: &[u8]) -> VerifyStatus {
        let (height, status) = match VoteExtension::from_bytes(payload) {
            Ok(vote_extension) => (
                Some(vote_extension.height),
                self.verify_extra_info(&vote_extension.extra_info),
            ),
            Err(err) => {
                log::warn!("Rejecting malformed vote extension: {}", err);
                (None, VerifyStatus::Reject)
            }
        };

        Event::publish(
            &self.event_publisher,
            Event::VerifyVoteExtension(VerifyVoteExtensionEvent {
                timestamp: SystemTime::now(),
                height,
                status,
            }),
        );

        status
    }

    fn verify_extra_info(&self, extra_info: &BTreeMap<String, Vec<u8>>) -> VerifyStatus {
        for (key, info) in extra_info {
            let Some(subscriber) = self.subscribers.get(key) else {
                log::warn!("Rejecting vote extension with unknown key {}", key);
                return VerifyStatus::Reject;
            };

            match subscriber.verify(info) {
                Ok(VerifyStatus::Accept) => (),
                Ok(status) => return status,
                Err(err) => {
                    log::error!("Subscriber {} failed to verify vote extension: {}", key, err);
                    return VerifyStatus::Unknown;
                }
            }
        }

        VerifyStatus::Accept
    }
}
