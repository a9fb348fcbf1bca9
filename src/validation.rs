/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The majority-agreement check on the bids placed in a proposal.
//!
//! A proposer could try to include bids in its proposal that no other validator has ever seen, e.g., to
//! make itself win an auction. To prevent this, every validator checks that each bid in a proposal
//! appeared often enough in the **reference bids**: the bids that the proposer aggregated from the
//! previous height's vote extensions into the special transaction.
//!
//! ## Threshold
//!
//! With `total` reference bids, the threshold is `floor(total * 0.5)`. A proposal bid is valid iff
//! the number of reference bids equal to it is **greater than or equal** to the threshold.
//!
//! Bids are compared by their [canonical bytes](MsgBid::canonical_bytes), a deterministic
//! serialization of their fields. This is not a cryptographic commitment: it relies on vote extension
//! collection (performed by the consensus engine) having included the extensions of enough voting
//! power for the reference bids to be meaningful.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::io;

use crate::types::transaction::{CodecError, MsgBid, TxCodec};

/// Decide whether every bid carried by `proposal_txs` appeared in `reference_bids` at least the
/// threshold number of times.
///
/// Returns `Ok(true)` if the proposal carries no bids. Returns an error, rather than `Ok(false)`, if a
/// proposal transaction cannot be decoded: malformed input is not the same as disagreement.
pub fn validate_bids(
    codec: &dyn TxCodec,
    reference_bids: &[MsgBid],
    proposal_txs: &[Vec<u8>],
) -> Result<bool, ValidateBidsError> {
    Ok(tally_bids(codec, reference_bids, proposal_txs)?.is_valid())
}

/// Same as [`validate_bids`], but returns the full [`BidTally`] instead of only its verdict.
pub fn tally_bids(
    codec: &dyn TxCodec,
    reference_bids: &[MsgBid],
    proposal_txs: &[Vec<u8>],
) -> Result<BidTally, ValidateBidsError> {
    let mut proposal_bids = Vec::new();
    for tx_bytes in proposal_txs {
        let tx = codec.decode(tx_bytes).map_err(|err| {
            log::error!("Unable to decode proposal transaction: {}", err);
            ValidateBidsError::DecodeTx(err)
        })?;
        proposal_bids.extend(tx.bids().cloned());
    }

    let mut reference_frequencies: HashMap<Vec<u8>, usize> = HashMap::new();
    for bid in reference_bids {
        *reference_frequencies
            .entry(bid.canonical_bytes().map_err(ValidateBidsError::EncodeBid)?)
            .or_default() += 1;
    }

    let total = reference_bids.len();
    let threshold = total / 2;

    let mut frequencies = Vec::with_capacity(proposal_bids.len());
    let mut invalid_bids = Vec::new();
    for bid in proposal_bids {
        let key = bid.canonical_bytes().map_err(ValidateBidsError::EncodeBid)?;
        let frequency = reference_frequencies.get(&key).copied().unwrap_or(0);
        if frequency < threshold {
            log::warn!(
                "Detected invalid proposal bid for {} by {}: frequency {} below threshold {}",
                bid.name,
                bid.owner,
                frequency,
                threshold
            );
            invalid_bids.push(bid.clone());
        }
        frequencies.push((bid, frequency));
    }

    Ok(BidTally {
        total,
        threshold,
        frequencies,
        invalid_bids,
    })
}

/// The result of checking a proposal's bids against the reference bids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BidTally {
    /// Number of reference bids.
    pub total: usize,

    /// Minimum number of times a bid must appear among the reference bids to be valid.
    pub threshold: usize,

    /// Every bid found in the proposal, in order, with the number of times it appeared among the
    /// reference bids.
    pub frequencies: Vec<(MsgBid, usize)>,

    /// The proposal bids whose frequency is below the threshold.
    pub invalid_bids: Vec<MsgBid>,
}

impl BidTally {
    pub fn is_valid(&self) -> bool {
        self.invalid_bids.is_empty()
    }
}

/// The ways checking a proposal's bids can fail to reach a verdict.
#[derive(Debug)]
pub enum ValidateBidsError {
    /// A proposal transaction could not be decoded.
    DecodeTx(CodecError),

    /// A bid could not be serialized into its canonical bytes.
    EncodeBid(io::Error),
}

impl Display for ValidateBidsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidateBidsError::DecodeTx(err) => write!(f, "{}", err),
            ValidateBidsError::EncodeBid(err) => write!(f, "failed to encode bid: {}", err),
        }
    }
}

impl From<CodecError> for ValidateBidsError {
    fn from(value: CodecError) -> Self {
        ValidateBidsError::DecodeTx(value)
    }
}
