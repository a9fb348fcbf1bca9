/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Requests, responses and the special transaction exchanged by the proposal handlers.

use std::fmt::{self, Display, Formatter};
use std::io;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::logging::first_seven_base64_chars;
use crate::types::{
    data_types::{BlockHeight, TxHash, VerifyingKeyBytes},
    transaction::MsgBid,
};

/// The transaction that a proposer places first in its proposal, carrying every bid found in the vote
/// extensions of the previous height.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SpecialTransaction {
    pub height: BlockHeight,
    pub bids: Vec<Vec<u8>>,
}

impl SpecialTransaction {
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<SpecialTransaction> {
        SpecialTransaction::try_from_slice(bytes)
    }

    /// Decode every bid carried by the special transaction.
    pub fn decode_bids(&self) -> io::Result<Vec<MsgBid>> {
        self.bids
            .iter()
            .map(|bid| MsgBid::from_canonical_bytes(bid))
            .collect()
    }
}

/// A vote from the previous height, together with the vote extension it carried.
///
/// `vote_extension` is empty if the validator did not extend its vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedVoteInfo {
    pub validator: VerifyingKeyBytes,
    pub vote_extension: Vec<u8>,
}

/// What the consensus engine gives the proposer of `height`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareProposalRequest {
    pub height: BlockHeight,
    /// The extended votes of the previous height that this proposer collected.
    pub local_last_commit: Vec<ExtendedVoteInfo>,
}

/// A prepared proposal: the transaction bytes to propose, and every item that was left out along the
/// way.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreparedProposal {
    pub txs: Vec<Vec<u8>>,
    pub skipped: Vec<SkippedItem>,
}

/// Something that [`prepare`](super::PrepareProposalHandler::prepare) could not use, and left out of
/// the proposal instead of failing it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkippedItem {
    /// A collected vote extension could not be decoded; its bids are not aggregated.
    MalformedVoteExtension {
        validator: VerifyingKeyBytes,
        reason: String,
    },

    /// A collected vote extension was produced at a height other than the previous one; its bids are not
    /// aggregated.
    VoteExtensionHeightMismatch {
        validator: VerifyingKeyBytes,
        height: BlockHeight,
    },

    /// The special transaction could not be serialized; the proposal carries none.
    SpecialTransaction { reason: String },

    /// The proposal builder failed; the ready transactions are proposed as selected.
    ProposalBuilder { reason: String },

    /// A transaction could not be encoded.
    EncodeTx {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    /// Including a transaction would have made the proposal exceed the configured maximum size.
    ExceedsMaxTxBytes { tx_hash: Option<TxHash>, size: u64 },
}

impl Display for SkippedItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkippedItem::MalformedVoteExtension { validator, reason } => write!(
                f,
                "malformed vote extension from {}: {}",
                first_seven_base64_chars(validator),
                reason
            ),
            SkippedItem::VoteExtensionHeightMismatch { validator, height } => write!(
                f,
                "vote extension from {} is for height {}",
                first_seven_base64_chars(validator),
                height
            ),
            SkippedItem::SpecialTransaction { reason } => {
                write!(f, "special transaction: {}", reason)
            }
            SkippedItem::ProposalBuilder { reason } => write!(f, "proposal builder: {}", reason),
            SkippedItem::EncodeTx { tx_hash, reason } => {
                write!(f, "transaction {}: {}", tx_hash_info(tx_hash), reason)
            }
            SkippedItem::ExceedsMaxTxBytes { tx_hash, size } => write!(
                f,
                "transaction {} of {} bytes exceeds max tx bytes",
                tx_hash_info(tx_hash),
                size
            ),
        }
    }
}

fn tx_hash_info(tx_hash: &Option<TxHash>) -> String {
    tx_hash.map_or(String::from("-"), |tx_hash| {
        first_seven_base64_chars(&tx_hash.bytes())
    })
}

/// What the consensus engine gives every validator to decide on a proposal for `height`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessProposalRequest {
    pub height: BlockHeight,
    pub txs: Vec<Vec<u8>>,
}

/// Whether this validator accepts a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessProposalStatus {
    Accept,
    Reject,
}
