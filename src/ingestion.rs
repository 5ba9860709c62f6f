/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The ingestion thread: the driving force of a peer-role node.
//!
//! This module defines the thread that turns bytes delivered on the ordering topic into
//! validate-then-append operations on the local ledger. It exclusively owns the node's writing
//! [Ledger] handle, which makes the read-validate-append sequence atomic with respect to other
//! appends on the same node; ordering across nodes is delegated to the topic.
//!
//! Every delivered message runs to completion, accept or reject. Failures (undecodable bytes, a
//! rejected block, a storage error) are contained to the one message that caused them: they are
//! logged, the message is dropped (no retry, no requeue), and the thread moves on to the next one.
//! In particular, when two organizations race to propose against the same parent, the proposal
//! delivered second is rejected for its stale parent and silently dropped; resubmitting on a fresh
//! parent is deliberately left to the layer above.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use borsh::BorshDeserialize;

use crate::events::*;
use crate::ledger::{AppendResult, KVStore, Ledger};
use crate::logging::{first_seven_base64_chars, secs_since_unix_epoch, STORAGE_FAILURE};
use crate::messages::Message;
use crate::validation::{validate, Rejection};

pub(crate) fn start_ingestion<K: KVStore>(
    mut ledger: Ledger<K>,
    proposals: Receiver<Vec<u8>>,
    shutdown_signal: Receiver<()>,
    event_publisher: Option<Sender<Event>>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("Ingestion thread disconnected from main thread")
            }
        }

        match proposals.try_recv() {
            Ok(bytes) => on_deliver(&mut ledger, &bytes, &event_publisher),
            Err(TryRecvError::Empty) => thread::yield_now(),
            // Safety: the ingestion thread shuts down before the poller thread (the sender side of
            // this channel), so we will never be disconnected at this point.
            Err(TryRecvError::Disconnected) => panic!(),
        }
    })
}

// Process one delivered ordering-topic message: deserialize, validate against the current head,
// append. Runs to completion for every message; failures never escape this function.
fn on_deliver<K: KVStore>(
    ledger: &mut Ledger<K>,
    bytes: &[u8],
    event_publisher: &Option<Sender<Event>>,
) {
    let block = match Message::try_from_slice(bytes) {
        Ok(Message::Proposal(proposal)) => proposal.block,
        Err(_) => {
            Event::RejectBlock(RejectBlockEvent {
                timestamp: SystemTime::now(),
                block_hash: None,
                reason: Rejection::MalformedStructure,
            })
            .publish(event_publisher);
            return;
        }
    };

    Event::ReceiveProposal(ReceiveProposalEvent {
        timestamp: SystemTime::now(),
        organization: block.organization.clone(),
        block_hash: block.hash,
    })
    .publish(event_publisher);

    // A redelivered block cannot pass the chain continuity check once the head has moved past it,
    // so known hashes are absorbed here, before judgement. The transport is at-least-once; a
    // duplicate is a successful no-op, not a rejection.
    if ledger.contains(&block.hash) {
        Event::DuplicateBlock(DuplicateBlockEvent {
            timestamp: SystemTime::now(),
            block_hash: block.hash,
        })
        .publish(event_publisher);
        return;
    }

    if let Err(reason) = validate(&block, &ledger.head_hash()) {
        Event::RejectBlock(RejectBlockEvent {
            timestamp: SystemTime::now(),
            block_hash: Some(block.hash),
            reason,
        })
        .publish(event_publisher);
        return;
    }

    match ledger.append(&block, event_publisher) {
        // The AppendBlockEvent is published by the ledger, immediately after the write lands.
        Ok(AppendResult::Appended) => (),
        Ok(AppendResult::AlreadyPresent) => {
            Event::DuplicateBlock(DuplicateBlockEvent {
                timestamp: SystemTime::now(),
                block_hash: block.hash,
            })
            .publish(event_publisher);
        }
        // The block is not appended and the head did not move. The next delivered message is
        // processed normally; persistent storage failure is an operator concern.
        Err(err) => log::error!(
            "{}, {}, {}, {}",
            STORAGE_FAILURE,
            secs_since_unix_epoch(SystemTime::now()),
            first_seven_base64_chars(&block.hash),
            err
        ),
    }
}
