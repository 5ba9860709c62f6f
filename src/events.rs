//! Definitions of topichain events for event handling and logging
//! Note: an event for a given action indicates that the action has been completed

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::types::{Block, CryptoHash, Organization};
use crate::validation::Rejection;

pub enum Event {
    // Events that change persistent state.
    AppendBlock(AppendBlockEvent),
    // Events that involve publishing on the ordering topic.
    Propose(ProposeEvent),
    // Events that involve a delivered topic message.
    ReceiveProposal(ReceiveProposalEvent),
    DuplicateBlock(DuplicateBlockEvent),
    RejectBlock(RejectBlockEvent),
}

impl Event {
    pub(crate) fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            // The event bus may already be gone during teardown; losing an event then is benign.
            let _ = event_publisher.send(self);
        }
    }
}

pub struct AppendBlockEvent {
    pub timestamp: SystemTime,
    pub block: Block,
    pub height: u64,
}

pub struct ProposeEvent {
    pub timestamp: SystemTime,
    pub organization: Organization,
    pub block_hash: CryptoHash,
}

pub struct ReceiveProposalEvent {
    pub timestamp: SystemTime,
    pub organization: Organization,
    pub block_hash: CryptoHash,
}

/// Duplicate delivery of an already-appended block: a successful no-op, not a failure.
pub struct DuplicateBlockEvent {
    pub timestamp: SystemTime,
    pub block_hash: CryptoHash,
}

/// A delivered block was refused and dropped. `block_hash` is None when the message bytes did not
/// decode into a block at all.
pub struct RejectBlockEvent {
    pub timestamp: SystemTime,
    pub block_hash: Option<CryptoHash>,
    pub reason: Rejection,
}
