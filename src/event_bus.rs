/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The thread that receives published [events](crate::events) and fires the handlers registered for
//! them.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

// How long the event bus waits for an event before checking for the shutdown signal again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The handlers registered for every kind of event, in the order that they will be fired.
pub(crate) struct EventHandlers {
    pub(crate) insert_tx_handlers: Vec<HandlerPtr<InsertTxEvent>>,
    pub(crate) promote_tx_handlers: Vec<HandlerPtr<PromoteTxEvent>>,
    pub(crate) remove_tx_handlers: Vec<HandlerPtr<RemoveTxEvent>>,
    pub(crate) extend_vote_handlers: Vec<HandlerPtr<ExtendVoteEvent>>,
    pub(crate) verify_vote_extension_handlers: Vec<HandlerPtr<VerifyVoteExtensionEvent>>,
    pub(crate) prepare_proposal_handlers: Vec<HandlerPtr<PrepareProposalEvent>>,
    pub(crate) process_proposal_handlers: Vec<HandlerPtr<ProcessProposalEvent>>,
    pub(crate) skip_proposal_item_handlers: Vec<HandlerPtr<SkipProposalItemEvent>>,
}

impl EventHandlers {
    /// Collect the user-defined handlers, placing the default logging handler first for each event type
    /// if `log_events` is set.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        insert_tx_handler: Option<HandlerPtr<InsertTxEvent>>,
        promote_tx_handler: Option<HandlerPtr<PromoteTxEvent>>,
        remove_tx_handler: Option<HandlerPtr<RemoveTxEvent>>,
        extend_vote_handler: Option<HandlerPtr<ExtendVoteEvent>>,
        verify_vote_extension_handler: Option<HandlerPtr<VerifyVoteExtensionEvent>>,
        prepare_proposal_handler: Option<HandlerPtr<PrepareProposalEvent>>,
        process_proposal_handler: Option<HandlerPtr<ProcessProposalEvent>>,
        skip_proposal_item_handler: Option<HandlerPtr<SkipProposalItemEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            insert_tx_handlers: handlers(log_events, insert_tx_handler),
            promote_tx_handlers: handlers(log_events, promote_tx_handler),
            remove_tx_handlers: handlers(log_events, remove_tx_handler),
            extend_vote_handlers: handlers(log_events, extend_vote_handler),
            verify_vote_extension_handlers: handlers(log_events, verify_vote_extension_handler),
            prepare_proposal_handlers: handlers(log_events, prepare_proposal_handler),
            process_proposal_handlers: handlers(log_events, process_proposal_handler),
            skip_proposal_item_handlers: handlers(log_events, skip_proposal_item_handler),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.insert_tx_handlers.is_empty()
            && self.promote_tx_handlers.is_empty()
            && self.remove_tx_handlers.is_empty()
            && self.extend_vote_handlers.is_empty()
            && self.verify_vote_extension_handlers.is_empty()
            && self.prepare_proposal_handlers.is_empty()
            && self.process_proposal_handlers.is_empty()
            && self.skip_proposal_item_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::InsertTx(insert_tx_event) => self
                .insert_tx_handlers
                .iter()
                .for_each(|handler| handler(&insert_tx_event)),

            Event::PromoteTx(promote_tx_event) => self
                .promote_tx_handlers
                .iter()
                .for_each(|handler| handler(&promote_tx_event)),

            Event::RemoveTx(remove_tx_event) => self
                .remove_tx_handlers
                .iter()
                .for_each(|handler| handler(&remove_tx_event)),

            Event::ExtendVote(extend_vote_event) => self
                .extend_vote_handlers
                .iter()
                .for_each(|handler| handler(&extend_vote_event)),

            Event::VerifyVoteExtension(verify_vote_extension_event) => self
                .verify_vote_extension_handlers
                .iter()
                .for_each(|handler| handler(&verify_vote_extension_event)),

            Event::PrepareProposal(prepare_proposal_event) => self
                .prepare_proposal_handlers
                .iter()
                .for_each(|handler| handler(&prepare_proposal_event)),

            Event::ProcessProposal(process_proposal_event) => self
                .process_proposal_handlers
                .iter()
                .for_each(|handler| handler(&process_proposal_event)),

            Event::SkipProposalItem(skip_proposal_item_event) => self
                .skip_proposal_item_handlers
                .iter()
                .for_each(|handler| handler(&skip_proposal_item_event)),
        }
    }
}

fn handlers<T: Logger>(
    log_events: bool,
    user_handler: Option<HandlerPtr<T>>,
) -> Vec<HandlerPtr<T>> {
    let mut handlers = Vec::new();
    if log_events {
        handlers.push(T::get_logger());
    }
    if let Some(handler) = user_handler {
        handlers.push(handler);
    }
    handlers
}

/// Start the event bus thread, which fires `event_handlers` for every event received through
/// `event_subscriber` until a message is received on `shutdown_signal` (or the shutdown sender is
/// dropped), or until every publisher has been dropped.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                // Events published before shutdown are still handled.
                while let Ok(event) = event_subscriber.try_recv() {
                    event_handlers.fire_handlers(event)
                }
                return;
            }
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}
