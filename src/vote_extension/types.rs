/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The vote extension payload and the types exchanged with vote extension subscribers.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::io;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::{data_types::BlockHeight, transaction::Message};

/// The payload that a validator attaches to its consensus vote at `height`.
///
/// - `bids` are the [canonical bytes](crate::types::transaction::MsgBid::canonical_bytes) of every bid
///   drained from the validator's pending pool at `height`.
/// - `extra_info` maps the key of each [subscriber](super::VoteExtensionSubscriber) to the bytes it
///   produced at `height`. Keys are kept sorted, so the payload's encoding is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VoteExtension {
    pub height: BlockHeight,
    pub bids: Vec<Vec<u8>>,
    pub extra_info: BTreeMap<String, Vec<u8>>,
}

impl VoteExtension {
    /// Serialize the vote extension into the bytes carried by the consensus vote.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    /// Deserialize a vote extension from the bytes carried by a consensus vote.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<VoteExtension> {
        VoteExtension::try_from_slice(bytes)
    }
}

/// The outcome of verifying a vote extension, or a part of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyStatus {
    /// The content is valid.
    Accept,

    /// The content is invalid.
    Reject,

    /// The verifier could not determine whether the content is valid. This must never be treated as
    /// `Accept`.
    Unknown,
}

/// What a [subscriber](super::VoteExtensionSubscriber) is given when asked to contribute to this
/// validator's vote extension: one non-bid message drained from the pending pool.
#[derive(Clone, Copy, Debug)]
pub struct ExtendRequest<'a> {
    pub height: BlockHeight,
    pub message: &'a Message,
}

/// Error returned by a subscriber that could not produce or judge its part of a vote extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriberError(pub String);

impl Display for SubscriberError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ways [`extend`](super::VoteExtensionHandler::extend) can fail.
#[derive(Debug)]
pub enum ExtendVoteError {
    /// The assembled vote extension could not be serialized.
    SerializeVoteExtension(io::Error),
}

impl Display for ExtendVoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExtendVoteError::SerializeVoteExtension(err) => {
                write!(f, "failed to serialize vote extension: {}", err)
            }
        }
    }
}
