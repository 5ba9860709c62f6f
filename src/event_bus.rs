use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::thread::JoinHandle;

use crate::events::*;
use crate::logging::Logger;

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

pub(crate) struct EventHandlers {
    pub(crate) append_block_handlers: Vec<HandlerPtr<AppendBlockEvent>>,
    pub(crate) propose_handlers: Vec<HandlerPtr<ProposeEvent>>,
    pub(crate) receive_proposal_handlers: Vec<HandlerPtr<ReceiveProposalEvent>>,
    pub(crate) duplicate_block_handlers: Vec<HandlerPtr<DuplicateBlockEvent>>,
    pub(crate) reject_block_handlers: Vec<HandlerPtr<RejectBlockEvent>>,
}

impl EventHandlers {
    // Collect the default event loggers (when log_events is set) and the user-registered handlers
    // into one registry. Loggers fire before user handlers.
    pub(crate) fn new(
        log_events: bool,
        on_append_block: Option<HandlerPtr<AppendBlockEvent>>,
        on_propose: Option<HandlerPtr<ProposeEvent>>,
        on_receive_proposal: Option<HandlerPtr<ReceiveProposalEvent>>,
        on_duplicate_block: Option<HandlerPtr<DuplicateBlockEvent>>,
        on_reject_block: Option<HandlerPtr<RejectBlockEvent>>,
    ) -> EventHandlers {
        fn collect<T: Logger>(
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

        EventHandlers {
            append_block_handlers: collect(log_events, on_append_block),
            propose_handlers: collect(log_events, on_propose),
            receive_proposal_handlers: collect(log_events, on_receive_proposal),
            duplicate_block_handlers: collect(log_events, on_duplicate_block),
            reject_block_handlers: collect(log_events, on_reject_block),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.append_block_handlers.is_empty()
            && self.propose_handlers.is_empty()
            && self.receive_proposal_handlers.is_empty()
            && self.duplicate_block_handlers.is_empty()
            && self.reject_block_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::AppendBlock(append_block_event) => self
                .append_block_handlers
                .iter()
                .for_each(|handler| handler(&append_block_event)),

            Event::Propose(propose_event) => self
                .propose_handlers
                .iter()
                .for_each(|handler| handler(&propose_event)),

            Event::ReceiveProposal(receive_proposal_event) => self
                .receive_proposal_handlers
                .iter()
                .for_each(|handler| handler(&receive_proposal_event)),

            Event::DuplicateBlock(duplicate_block_event) => self
                .duplicate_block_handlers
                .iter()
                .for_each(|handler| handler(&duplicate_block_event)),

            Event::RejectBlock(reject_block_event) => self
                .reject_block_handlers
                .iter()
                .for_each(|handler| handler(&reject_block_event)),
        }
    }
}

pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("event_bus thread disconnected from main thread")
            }
        }

        match event_subscriber.try_recv() {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(TryRecvError::Empty) => thread::yield_now(),
            // Publishers are dropping; the shutdown signal ends the loop.
            Err(TryRecvError::Disconnected) => thread::yield_now(),
        }
    })
}
