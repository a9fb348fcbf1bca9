/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc,
};

use log::LevelFilter;
use threshold_proposer::{
    app::ThresholdAppSpec,
    config::Configuration,
    mempool::ThresholdMempool,
    proposal::{
        ExtendedVoteInfo, PrepareProposalHandler, PrepareProposalRequest, PreparedProposal,
        ProcessProposalHandler, ProcessProposalRequest, ProcessProposalStatus, ProposalBuilder,
        SkippedItem, SpecialTransaction,
    },
    types::{
        crypto_primitives::SigningKey,
        data_types::BlockHeight,
        transaction::{BorshTxCodec, MsgBid, Transaction, TxCodec},
    },
    validation::tally_bids,
    vote_extension::{VerifyStatus, VoteExtension},
};

mod common;

use crate::common::{
    fixtures::{bid, bid_tx, encode, extended_vote, opaque_tx, signing_keys},
    logging::setup_logger,
    mocks::{
        FailingBuilder, PickyCodec, RecordingSubscriber, ReversingBuilder, UNENCODABLE_TYPE_URL,
    },
};

/// Insert `txs` into a fresh mempool and promote all of them to the ready pool.
fn ready_mempool(txs: &[Transaction]) -> ThresholdMempool {
    let mempool = ThresholdMempool::new();
    for tx in txs {
        mempool.insert(tx.clone()).unwrap();
        mempool.update(tx).unwrap();
    }
    mempool
}

fn prepare_handler(
    configuration: Configuration,
    codec: impl TxCodec + 'static,
    mempool: ThresholdMempool,
    proposal_builder: Option<Box<dyn ProposalBuilder>>,
) -> PrepareProposalHandler {
    PrepareProposalHandler::new(configuration, Arc::new(codec), mempool, proposal_builder, None)
}

fn prepare(
    mempool: ThresholdMempool,
    height: u64,
    votes: Vec<ExtendedVoteInfo>,
) -> PreparedProposal {
    prepare_handler(Configuration::default(), BorshTxCodec, mempool, None).prepare(
        PrepareProposalRequest {
            height: BlockHeight::new(height),
            local_last_commit: votes,
        },
    )
}

fn process(configuration: Configuration, height: u64, txs: Vec<Vec<u8>>) -> ProcessProposalStatus {
    ProcessProposalHandler::new(configuration, Arc::new(BorshTxCodec), None).process(
        &ProcessProposalRequest {
            height: BlockHeight::new(height),
            txs,
        },
    )
}

/// Extended votes of height `height` from `keys`, where the `i`-th vote carries `bids[i]`.
fn votes(keys: &[SigningKey], height: u64, bids: &[MsgBid]) -> Vec<ExtendedVoteInfo> {
    keys.iter()
        .zip(bids)
        .map(|(key, bid)| extended_vote(key, height, &[bid.clone()]))
        .collect()
}

#[test]
fn majority_bid_is_accepted_test() {
    setup_logger(LevelFilter::Trace);

    let keys = signing_keys(6);
    let x = bid("x.eth", "xavier", 100);
    let z = bid("z.eth", "zoe", 5);

    // Four of five validators saw X at height 5; the fifth saw only Z.
    let votes = votes(&keys[..5], 5, &[x.clone(), x.clone(), x.clone(), x.clone(), z]);
    let proposal_tx = bid_tx(&keys[5], &[x.clone()]);
    let prepared = prepare(ready_mempool(&[proposal_tx.clone()]), 6, votes);

    assert!(prepared.skipped.is_empty());
    assert_eq!(prepared.txs.len(), 2);
    let special_tx = SpecialTransaction::from_bytes(&prepared.txs[0]).unwrap();
    assert_eq!(special_tx.height, BlockHeight::new(5));
    assert_eq!(special_tx.bids.len(), 5);
    assert_eq!(prepared.txs[1], encode(&proposal_tx));

    let reference_bids = special_tx.decode_bids().unwrap();
    let tally = tally_bids(&BorshTxCodec, &reference_bids, &prepared.txs[1..]).unwrap();
    assert_eq!(tally.threshold, 2);
    assert_eq!(tally.frequencies, vec![(x, 4)]);
    assert!(tally.is_valid());

    assert_eq!(
        process(Configuration::default(), 6, prepared.txs),
        ProcessProposalStatus::Accept
    );
}

#[test]
fn minority_bid_is_rejected_test() {
    setup_logger(LevelFilter::Trace);

    let keys = signing_keys(6);
    let x = bid("x.eth", "xavier", 100);
    let y = bid("y.eth", "yusuf", 100);

    // Only one of five validators saw Y.
    let votes = votes(&keys[..5], 5, &[x.clone(), y.clone(), x.clone(), x.clone(), x]);
    let proposal_tx = bid_tx(&keys[5], &[y.clone()]);
    let prepared = prepare(ready_mempool(&[proposal_tx]), 6, votes);

    let special_tx = SpecialTransaction::from_bytes(&prepared.txs[0]).unwrap();
    let reference_bids = special_tx.decode_bids().unwrap();
    let tally = tally_bids(&BorshTxCodec, &reference_bids, &prepared.txs[1..]).unwrap();
    assert_eq!(tally.frequencies, vec![(y.clone(), 1)]);
    assert_eq!(tally.invalid_bids, vec![y]);

    assert_eq!(
        process(Configuration::default(), 6, prepared.txs),
        ProcessProposalStatus::Reject
    );
}

#[test]
fn early_heights_carry_no_special_transaction_test() {
    let keys = signing_keys(2);
    let tx = opaque_tx(&keys[0], "/test.Transfer", b"early");
    let mempool = ready_mempool(&[tx.clone()]);
    let votes = vec![extended_vote(&keys[1], 1, &[bid("a.eth", "a", 1)])];

    let prepared = prepare(mempool.clone(), 2, votes);
    assert_eq!(prepared.txs, vec![encode(&tx)]);
    assert!(prepared.skipped.is_empty());
    assert_eq!(
        process(Configuration::default(), 2, prepared.txs),
        ProcessProposalStatus::Accept
    );

    // From height 3 on, the special transaction leads the proposal.
    let prepared = prepare(mempool, 3, vec![extended_vote(&keys[1], 2, &[bid("a.eth", "a", 1)])]);
    assert_eq!(prepared.txs.len(), 2);
    assert_eq!(
        SpecialTransaction::from_bytes(&prepared.txs[0]).unwrap().bids.len(),
        1
    );
}

#[test]
fn unusable_vote_extensions_are_skipped_test() {
    let keys = signing_keys(3);
    let x = bid("x.eth", "xavier", 1);
    let votes = vec![
        extended_vote(&keys[0], 4, &[x.clone()]),
        ExtendedVoteInfo {
            validator: keys[1].verifying_key().to_bytes(),
            vote_extension: vec![1, 2, 3],
        },
        extended_vote(&keys[2], 3, &[x]),
    ];

    let prepared = prepare(ThresholdMempool::new(), 5, votes);
    let special_tx = SpecialTransaction::from_bytes(&prepared.txs[0]).unwrap();
    assert_eq!(special_tx.bids.len(), 1);
    assert_eq!(prepared.skipped.len(), 2);
    assert!(matches!(prepared.skipped[0], SkippedItem::MalformedVoteExtension { .. }));
    assert_eq!(
        prepared.skipped[1],
        SkippedItem::VoteExtensionHeightMismatch {
            validator: keys[2].verifying_key().to_bytes(),
            height: BlockHeight::new(3),
        }
    );
}

#[test]
fn proposal_builder_shapes_ready_transactions_test() {
    let keys = signing_keys(1);
    let txs: Vec<Transaction> = (0..3u8)
        .map(|i| opaque_tx(&keys[0], "/test.Transfer", &[i]))
        .collect();
    let mempool = ready_mempool(&txs);
    let request = PrepareProposalRequest {
        height: BlockHeight::new(1),
        local_last_commit: Vec::new(),
    };

    // The builder is only consulted if enabled.
    let calls = Arc::new(AtomicUsize::new(0));
    let mut disabled = prepare_handler(
        Configuration::default(),
        BorshTxCodec,
        mempool.clone(),
        Some(Box::new(ReversingBuilder { calls: calls.clone() })),
    );
    let prepared = disabled.prepare(request.clone());
    assert_eq!(prepared.txs, txs.iter().map(encode).collect::<Vec<_>>());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let mut enabled = prepare_handler(
        Configuration::builder().run_proposal_builder(true).build(),
        BorshTxCodec,
        mempool,
        Some(Box::new(ReversingBuilder { calls: calls.clone() })),
    );
    let prepared = enabled.prepare(request);
    assert_eq!(prepared.txs, txs.iter().rev().map(encode).collect::<Vec<_>>());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_proposal_builder_falls_back_to_selection_test() {
    let keys = signing_keys(1);
    let txs: Vec<Transaction> = (0..2u8)
        .map(|i| opaque_tx(&keys[0], "/test.Transfer", &[i]))
        .collect();
    let mut handler = prepare_handler(
        Configuration::builder().run_proposal_builder(true).build(),
        BorshTxCodec,
        ready_mempool(&txs),
        Some(Box::new(FailingBuilder)),
    );

    let prepared = handler.prepare(PrepareProposalRequest {
        height: BlockHeight::new(2),
        local_last_commit: Vec::new(),
    });
    assert_eq!(prepared.txs, txs.iter().map(encode).collect::<Vec<_>>());
    assert_eq!(
        prepared.skipped,
        vec![SkippedItem::ProposalBuilder {
            reason: String::from("builder unavailable")
        }]
    );
}

#[test]
fn unencodable_transactions_are_skipped_test() {
    let keys = signing_keys(1);
    let first = opaque_tx(&keys[0], "/test.Transfer", b"1");
    let unencodable = opaque_tx(&keys[0], UNENCODABLE_TYPE_URL, b"2");
    let last = opaque_tx(&keys[0], "/test.Transfer", b"3");
    let mut handler = prepare_handler(
        Configuration::default(),
        PickyCodec,
        ready_mempool(&[first.clone(), unencodable.clone(), last.clone()]),
        None,
    );

    let prepared = handler.prepare(PrepareProposalRequest {
        height: BlockHeight::new(4),
        local_last_commit: Vec::new(),
    });
    assert_eq!(prepared.txs.len(), 3);
    assert_eq!(prepared.txs[1..], [encode(&first), encode(&last)]);
    assert_eq!(prepared.skipped.len(), 1);
    assert!(matches!(
        &prepared.skipped[0],
        SkippedItem::EncodeTx { tx_hash: Some(tx_hash), .. }
            if *tx_hash == unencodable.hash().unwrap()
    ));
}

#[test]
fn max_tx_bytes_bounds_the_proposal_test() {
    let keys = signing_keys(1);
    let first = opaque_tx(&keys[0], "/test.Transfer", b"1");
    let second = opaque_tx(&keys[0], "/test.Transfer", b"2");
    let special_tx_size = SpecialTransaction {
        height: BlockHeight::new(2),
        bids: Vec::new(),
    }
    .to_bytes()
    .unwrap()
    .len() as u64;
    let max_tx_bytes = special_tx_size + encode(&first).len() as u64;

    let mut handler = prepare_handler(
        Configuration::builder().max_tx_bytes(max_tx_bytes).build(),
        BorshTxCodec,
        ready_mempool(&[first.clone(), second.clone()]),
        None,
    );
    let prepared = handler.prepare(PrepareProposalRequest {
        height: BlockHeight::new(3),
        local_last_commit: Vec::new(),
    });

    assert_eq!(prepared.txs.len(), 2);
    assert_eq!(prepared.txs[1], encode(&first));
    assert_eq!(
        prepared.skipped,
        vec![SkippedItem::ExceedsMaxTxBytes {
            tx_hash: Some(second.hash().unwrap()),
            size: encode(&second).len() as u64,
        }]
    );
}

#[test]
fn proposals_without_reference_bids_are_accepted_test() {
    let keys = signing_keys(1);
    let stray_bid_tx = encode(&bid_tx(&keys[0], &[bid("x.eth", "xavier", 1)]));

    assert_eq!(
        process(Configuration::default(), 5, Vec::new()),
        ProcessProposalStatus::Accept
    );

    let empty_special_tx = SpecialTransaction {
        height: BlockHeight::new(4),
        bids: Vec::new(),
    }
    .to_bytes()
    .unwrap();
    assert_eq!(
        process(Configuration::default(), 5, vec![empty_special_tx, stray_bid_tx]),
        ProcessProposalStatus::Accept
    );
}

#[test]
fn malformed_special_transaction_test() {
    let malformed = vec![vec![0xff; 3]];
    assert_eq!(
        process(Configuration::default(), 5, malformed.clone()),
        ProcessProposalStatus::Accept
    );

    let strict = Configuration::builder().reject_malformed_special_tx(true).build();
    assert_eq!(process(strict.clone(), 5, malformed.clone()), ProcessProposalStatus::Reject);
    assert_eq!(process(strict, 2, malformed), ProcessProposalStatus::Accept);
}

#[test]
fn undecodable_bids_are_rejected_test() {
    let keys = signing_keys(1);
    let x = bid("x.eth", "xavier", 1);

    // A reference bid that is not a bid.
    let special_tx = SpecialTransaction {
        height: BlockHeight::new(4),
        bids: vec![x.canonical_bytes().unwrap(), vec![0xff]],
    }
    .to_bytes()
    .unwrap();
    assert_eq!(
        process(
            Configuration::default(),
            5,
            vec![special_tx, encode(&bid_tx(&keys[0], &[x.clone()]))]
        ),
        ProcessProposalStatus::Reject
    );

    // A proposal transaction that is not a transaction.
    let special_tx = SpecialTransaction {
        height: BlockHeight::new(4),
        bids: vec![x.canonical_bytes().unwrap()],
    }
    .to_bytes()
    .unwrap();
    assert_eq!(
        process(Configuration::default(), 5, vec![special_tx, vec![0xff, 0xff]]),
        ProcessProposalStatus::Reject
    );
}

#[test]
fn app_drives_a_height_and_publishes_events_test() {
    setup_logger(LevelFilter::Trace);

    let keys = signing_keys(4);
    let x = bid("x.eth", "xavier", 100);
    let (insert_sender, insert_receiver) = mpsc::channel();
    let (prepare_sender, prepare_receiver) = mpsc::channel();
    let (skip_sender, skip_receiver) = mpsc::channel();
    let (process_sender, process_receiver) = mpsc::channel();

    let mempool = ThresholdMempool::new();
    let app = ThresholdAppSpec::builder()
        .mempool(mempool.clone())
        .on_insert_tx(move |event| insert_sender.send(event.tx_hash).unwrap())
        .on_prepare_proposal(move |event| {
            prepare_sender
                .send((event.height, event.special_tx_bids, event.txs, event.skipped))
                .unwrap()
        })
        .on_skip_proposal_item(move |event| skip_sender.send(event.item.clone()).unwrap())
        .on_process_proposal(move |event| process_sender.send(event.status).unwrap())
        .build();
    let mut app = app.start();

    let oracle = RecordingSubscriber::new("oracle", Ok(VerifyStatus::Accept));
    let verified_payloads = oracle.verified_payloads();
    app.register_boxed_subscriber("oracle", Box::new(oracle));

    // 1. Height 4: the bid reaches this validator's vote extension and the ready pool.
    let tx = bid_tx(&keys[0], &[x.clone()]);
    let tx_hash = mempool.insert(tx.clone()).unwrap();
    let own_extension = app.extend_vote(BlockHeight::new(4)).unwrap();
    assert_eq!(app.verify_vote_extension(&own_extension), VerifyStatus::Accept);
    assert_eq!(
        VoteExtension::from_bytes(&own_extension).unwrap().bids,
        vec![x.canonical_bytes().unwrap()]
    );
    assert_eq!(app.mempool().count_ready(), 1);

    // A peer's extension carrying oracle data is checked by the boxed subscriber.
    let peer_extension = VoteExtension {
        height: BlockHeight::new(4),
        bids: Vec::new(),
        extra_info: BTreeMap::from([(String::from("oracle"), b"42".to_vec())]),
    };
    assert_eq!(
        app.verify_vote_extension(&peer_extension.to_bytes().unwrap()),
        VerifyStatus::Accept
    );
    assert_eq!(*verified_payloads.lock().unwrap(), vec![b"42".to_vec()]);

    // 2. Height 5: this validator proposes, with the extensions of three peers plus its own.
    let mut local_last_commit = vec![ExtendedVoteInfo {
        validator: keys[0].verifying_key().to_bytes(),
        vote_extension: own_extension,
    }];
    local_last_commit.push(extended_vote(&keys[1], 4, &[x.clone()]));
    local_last_commit.push(extended_vote(&keys[2], 4, &[]));
    local_last_commit.push(extended_vote(&keys[3], 2, &[x]));
    let prepared = app.prepare_proposal(PrepareProposalRequest {
        height: BlockHeight::new(5),
        local_last_commit,
    });
    assert_eq!(prepared.txs.len(), 2);
    assert_eq!(prepared.skipped.len(), 1);

    let status = app.process_proposal(&ProcessProposalRequest {
        height: BlockHeight::new(5),
        txs: prepared.txs,
    });
    assert_eq!(status, ProcessProposalStatus::Accept);

    // 3. The block is committed.
    app.mempool().remove(&tx).unwrap();
    assert!(app.mempool().is_empty());

    // Dropping the app handles every event published so far.
    drop(app);
    assert_eq!(insert_receiver.try_iter().collect::<Vec<_>>(), vec![tx_hash]);
    assert_eq!(
        prepare_receiver.try_iter().collect::<Vec<_>>(),
        vec![(BlockHeight::new(5), Some(2), 2, 1)]
    );
    assert_eq!(
        skip_receiver.try_iter().collect::<Vec<_>>(),
        vec![SkippedItem::VoteExtensionHeightMismatch {
            validator: keys[3].verifying_key().to_bytes(),
            height: BlockHeight::new(2),
        }]
    );
    assert_eq!(
        process_receiver.try_iter().collect::<Vec<_>>(),
        vec![ProcessProposalStatus::Accept]
    );

    // Clones of the mempool keep working once the app is gone.
    mempool.insert(bid_tx(&keys[1], &[])).unwrap();
    assert_eq!(mempool.count_tx(), 1);
}
