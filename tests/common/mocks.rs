/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggables whose behavior the integration tests control, and whose calls they observe.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use threshold_proposer::{
    proposal::{ProposalBuilder, ProposalBuilderError},
    types::{
        data_types::BlockHeight,
        transaction::{BorshTxCodec, CodecError, Message, Transaction, TxCodec},
    },
    vote_extension::{ExtendRequest, SubscriberError, VerifyStatus, VoteExtensionSubscriber},
};

/// A subscriber that contributes the value of every opaque message it is offered, prefixed with its
/// name, and answers every verification with a fixed outcome.
pub(crate) struct RecordingSubscriber {
    name: &'static str,
    verify_outcome: Result<VerifyStatus, String>,
    extend_calls: Arc<AtomicUsize>,
    verified_payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSubscriber {
    pub(crate) fn new(name: &'static str, verify_outcome: Result<VerifyStatus, String>) -> Self {
        RecordingSubscriber {
            name,
            verify_outcome,
            extend_calls: Arc::new(AtomicUsize::new(0)),
            verified_payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn extend_calls(&self) -> Arc<AtomicUsize> {
        self.extend_calls.clone()
    }

    pub(crate) fn verified_payloads(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        self.verified_payloads.clone()
    }
}

impl VoteExtensionSubscriber for RecordingSubscriber {
    fn extend(&self, request: &ExtendRequest) -> Result<Vec<u8>, SubscriberError> {
        self.extend_calls.fetch_add(1, Ordering::SeqCst);
        match request.message {
            Message::Opaque(message) => {
                let mut info = self.name.as_bytes().to_vec();
                info.extend_from_slice(&message.value);
                Ok(info)
            }
            Message::Bid(_) => Err(SubscriberError(String::from("offered a bid"))),
        }
    }

    fn verify(&self, payload: &[u8]) -> Result<VerifyStatus, SubscriberError> {
        self.verified_payloads.lock().unwrap().push(payload.to_vec());
        self.verify_outcome.clone().map_err(SubscriberError)
    }
}

/// A proposal builder that proposes the selected transactions in reverse order.
pub(crate) struct ReversingBuilder {
    pub(crate) calls: Arc<AtomicUsize>,
}

impl ProposalBuilder for ReversingBuilder {
    fn build_proposal(
        &mut self,
        _height: BlockHeight,
        mut txs: Vec<Arc<Transaction>>,
    ) -> Result<Vec<Arc<Transaction>>, ProposalBuilderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        txs.reverse();
        Ok(txs)
    }
}

/// A proposal builder that always fails.
pub(crate) struct FailingBuilder;

impl ProposalBuilder for FailingBuilder {
    fn build_proposal(
        &mut self,
        _height: BlockHeight,
        _txs: Vec<Arc<Transaction>>,
    ) -> Result<Vec<Arc<Transaction>>, ProposalBuilderError> {
        Err(ProposalBuilderError(String::from("builder unavailable")))
    }
}

pub(crate) const UNENCODABLE_TYPE_URL: &str = "/test.Unencodable";

/// A borsh codec that refuses to encode transactions carrying an opaque message of type
/// [`UNENCODABLE_TYPE_URL`].
pub(crate) struct PickyCodec;

impl TxCodec for PickyCodec {
    fn encode(&self, tx: &Transaction) -> Result<Vec<u8>, CodecError> {
        let unencodable = tx.messages().iter().any(|message| {
            matches!(message, Message::Opaque(opaque) if opaque.type_url == UNENCODABLE_TYPE_URL)
        });
        if unencodable {
            return Err(CodecError::Encode(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unencodable message",
            )));
        }
        BorshTxCodec.encode(tx)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Transaction, CodecError> {
        BorshTxCodec.decode(bytes)
    }
}
