/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Wiring the mempool, the vote extension handler, and the proposal handlers together into a
//! [`ThresholdApp`].
//!
//! This module defines:
//! - The builder-pattern interface to construct a [specification of the app](ThresholdAppSpec) with:
//!   1. `ThresholdAppSpec::builder` to construct a `ThresholdAppSpecBuilder`,
//!   2. The setters of the `ThresholdAppSpecBuilder`, and
//!   3. The `ThresholdAppSpecBuilder::build` method to construct a [ThresholdAppSpec],
//! - The function to [start](ThresholdAppSpec::start) a [ThresholdApp] given its specification,
//! - The methods through which the consensus engine drives a [ThresholdApp].
//!
//! ## Starting an app
//!
//! ```ignore
//! let mempool = ThresholdMempool::new();
//!
//! let mut app =
//!     ThresholdAppSpec::builder()
//!     .mempool(mempool.clone())
//!     .configuration(configuration)
//!     .on_prepare_proposal(|event| println!("prepared {} txs", event.txs))
//!     .build()
//!     .start();
//!
//! app.register_subscriber("oracle", oracle_subscriber);
//! ```
//!
//! Every handler passed to the builder is invoked on the event bus thread, after the default logging
//! handler if [`log_events`](crate::config::Configuration::log_events) is set. The event bus thread is
//! started only if at least one handler is registered, and is shut down when the app is dropped.

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use typed_builder::TypedBuilder;

use crate::config::Configuration;
use crate::event_bus::*;
use crate::events::*;
use crate::mempool::ThresholdMempool;
use crate::proposal::{
    PrepareProposalHandler, PrepareProposalRequest, PreparedProposal, ProcessProposalHandler,
    ProcessProposalRequest, ProcessProposalStatus, ProposalBuilder,
};
use crate::types::{
    data_types::BlockHeight,
    transaction::{BorshTxCodec, TxCodec},
};
use crate::vote_extension::{
    ExtendVoteError, VerifyStatus, VoteExtensionHandler, VoteExtensionSubscriber,
};

/// Stores the user-defined parameters required to start a [ThresholdApp].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ThresholdAppSpec]. Every parameter is optional: by default the
    app uses a fresh mempool, the borsh transaction codec, no proposal builder, and the default
    [Configuration].
"))]
pub struct ThresholdAppSpec {
    #[builder(
        default,
        setter(doc = "Set the mempool that the app's handlers share. Optional.")
    )]
    mempool: ThresholdMempool,
    #[builder(
        default = Arc::new(BorshTxCodec) as Arc<dyn TxCodec>,
        setter(
            transform = |codec: impl TxCodec + 'static| Arc::new(codec) as Arc<dyn TxCodec>,
            doc = "Set the codec that converts transactions to and from proposal bytes. Optional."
        )
    )]
    codec: Arc<dyn TxCodec>,
    #[builder(
        default,
        setter(
            transform = |proposal_builder: impl ProposalBuilder + 'static| Some(Box::new(proposal_builder) as Box<dyn ProposalBuilder>),
            doc = "Set the proposal builder invoked when preparing proposals. Optional."
        )
    )]
    proposal_builder: Option<Box<dyn ProposalBuilder>>,
    #[builder(
        default,
        setter(doc = "Set the [configuration](Configuration) of the app's handlers. Optional.")
    )]
    configuration: Configuration,
    // Optional event handlers
    #[builder(default, setter(transform = |handler: impl Fn(&InsertTxEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<InsertTxEvent>),
    doc = "Register a handler closure to be invoked after a transaction is inserted into the pending pool. Optional."))]
    on_insert_tx: Option<HandlerPtr<InsertTxEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PromoteTxEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PromoteTxEvent>),
    doc = "Register a handler closure to be invoked after a transaction is promoted to the ready pool. Optional."))]
    on_promote_tx: Option<HandlerPtr<PromoteTxEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RemoveTxEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RemoveTxEvent>),
    doc = "Register a handler closure to be invoked after a transaction is removed from the ready pool. Optional."))]
    on_remove_tx: Option<HandlerPtr<RemoveTxEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ExtendVoteEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ExtendVoteEvent>),
    doc = "Register a handler closure to be invoked after this validator produces a vote extension. Optional."))]
    on_extend_vote: Option<HandlerPtr<ExtendVoteEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&VerifyVoteExtensionEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<VerifyVoteExtensionEvent>),
    doc = "Register a handler closure to be invoked after this validator verifies a peer's vote extension. Optional."))]
    on_verify_vote_extension: Option<HandlerPtr<VerifyVoteExtensionEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PrepareProposalEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PrepareProposalEvent>),
    doc = "Register a handler closure to be invoked after this validator prepares a proposal. Optional."))]
    on_prepare_proposal: Option<HandlerPtr<PrepareProposalEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProcessProposalEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProcessProposalEvent>),
    doc = "Register a handler closure to be invoked after this validator decides on a proposal. Optional."))]
    on_process_proposal: Option<HandlerPtr<ProcessProposalEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SkipProposalItemEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SkipProposalItemEvent>),
    doc = "Register a handler closure to be invoked for every item left out of a prepared proposal. Optional."))]
    on_skip_proposal_item: Option<HandlerPtr<SkipProposalItemEvent>>,
}

impl ThresholdAppSpec {
    /// Wire the app's handlers together around its mempool, start the event bus thread if any handler is
    /// registered, and return the handle to all of them in a [ThresholdApp].
    pub fn start(self) -> ThresholdApp {
        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_insert_tx,
            self.on_promote_tx,
            self.on_remove_tx,
            self.on_extend_vote,
            self.on_verify_vote_extension,
            self.on_prepare_proposal,
            self.on_process_proposal,
            self.on_skip_proposal_item,
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        self.mempool.set_event_publisher(event_publisher.clone());
        let vote_extension_handler =
            VoteExtensionHandler::new(self.mempool.clone(), event_publisher.clone());
        let prepare_proposal_handler = PrepareProposalHandler::new(
            self.configuration.clone(),
            self.codec.clone(),
            self.mempool.clone(),
            self.proposal_builder,
            event_publisher.clone(),
        );
        let process_proposal_handler =
            ProcessProposalHandler::new(self.configuration, self.codec, event_publisher);

        let (event_bus, event_bus_shutdown) = match event_subscriber {
            Some(event_subscriber) => {
                let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
                let event_bus =
                    start_event_bus(event_handlers, event_subscriber, event_bus_shutdown_receiver);
                (Some(event_bus), Some(event_bus_shutdown))
            }
            None => (None, None),
        };

        ThresholdApp {
            mempool: self.mempool,
            vote_extension_handler,
            prepare_proposal_handler,
            process_proposal_handler,
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// A handle to the handlers of a started app, and to its event bus thread. When this value is dropped,
/// the event bus thread is shut down after handling the events published so far.
pub struct ThresholdApp {
    mempool: ThresholdMempool,
    vote_extension_handler: VoteExtensionHandler,
    prepare_proposal_handler: PrepareProposalHandler,
    process_proposal_handler: ProcessProposalHandler,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl ThresholdApp {
    /// Get the mempool that this app's handlers share. Clone it to insert transactions from other threads.
    pub fn mempool(&self) -> &ThresholdMempool {
        &self.mempool
    }

    /// Register `subscriber` under `key`. See [`VoteExtensionHandler::register_subscriber`].
    pub fn register_subscriber(
        &mut self,
        key: impl Into<String>,
        subscriber: impl VoteExtensionSubscriber + 'static,
    ) {
        self.vote_extension_handler.register_subscriber(key, subscriber)
    }

    /// Register a subscriber that has already been boxed, e.g., one picked at runtime.
    pub fn register_boxed_subscriber(
        &mut self,
        key: impl Into<String>,
        subscriber: Box<dyn VoteExtensionSubscriber>,
    ) {
        self.vote_extension_handler
            .register_boxed_subscriber(key.into(), subscriber)
    }

    /// See [`VoteExtensionHandler::extend`].
    pub fn extend_vote(&self, height: BlockHeight) -> Result<Vec<u8>, ExtendVoteError> {
        self.vote_extension_handler.extend(height)
    }

    /// See [`VoteExtensionHandler::verify`].
    pub fn verify_vote_extension(&self, payload: &[u8]) -> VerifyStatus {
        self.vote_extension_handler.verify(payload)
    }

    /// See [`PrepareProposalHandler::prepare`].
    pub fn prepare_proposal(&mut self, request: PrepareProposalRequest) -> PreparedProposal {
        self.prepare_proposal_handler.prepare(request)
    }

    /// See [`ProcessProposalHandler::process`].
    pub fn process_proposal(&self, request: &ProcessProposalRequest) -> ProcessProposalStatus {
        self.process_proposal_handler.process(request)
    }
}

impl Drop for ThresholdApp {
    fn drop(&mut self) {
        // Clones of the mempool may outlive the app.
        self.mempool.set_event_publisher(None);

        if let Some(event_bus_shutdown) = &self.event_bus_shutdown {
            let _ = event_bus_shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            if event_bus.join().is_err() {
                log::error!("Event bus thread panicked");
            }
        }
    }
}
