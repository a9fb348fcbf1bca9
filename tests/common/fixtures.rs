/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Keys, bids, transactions and extended votes shared by the integration tests.

use rand_core::OsRng;
use threshold_proposer::{
    proposal::ExtendedVoteInfo,
    types::{
        crypto_primitives::SigningKey,
        data_types::BlockHeight,
        transaction::{BorshTxCodec, Coin, Message, MsgBid, Transaction, TxCodec},
    },
    vote_extension::VoteExtension,
};

pub(crate) fn signing_keys(n: usize) -> Vec<SigningKey> {
    let mut csprg = OsRng {};
    (0..n).map(|_| SigningKey::generate(&mut csprg)).collect()
}

pub(crate) fn bid(name: &str, owner: &str, amount: u128) -> MsgBid {
    MsgBid {
        name: name.to_string(),
        resolve_address: format!("{}.resolver", name),
        owner: owner.to_string(),
        amount: vec![Coin::new("stake", amount)],
    }
}

pub(crate) fn bid_tx(signing_key: &SigningKey, bids: &[MsgBid]) -> Transaction {
    let messages = bids.iter().cloned().map(Message::Bid).collect();
    Transaction::sign(messages, &[signing_key]).unwrap()
}

pub(crate) fn opaque_tx(signing_key: &SigningKey, type_url: &str, value: &[u8]) -> Transaction {
    Transaction::sign(vec![Message::opaque(type_url, value.to_vec())], &[signing_key]).unwrap()
}

pub(crate) fn encode(tx: &Transaction) -> Vec<u8> {
    BorshTxCodec.encode(tx).unwrap()
}

/// An extended vote from `signing_key`'s validator, whose vote extension carries `bids` for `height`.
pub(crate) fn extended_vote(
    signing_key: &SigningKey,
    height: u64,
    bids: &[MsgBid],
) -> ExtendedVoteInfo {
    let vote_extension = VoteExtension {
        height: BlockHeight::new(height),
        bids: bids.iter().map(|bid| bid.canonical_bytes().unwrap()).collect(),
        extra_info: Default::default(),
    };
    ExtendedVoteInfo {
        validator: signing_key.verifying_key().to_bytes(),
        vote_extension: vote_extension.to_bytes().unwrap(),
    }
}
