/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! [Trait definition](Network) for pluggable pub/sub transport, as well as the poller thread that
//! nodes use to interact with it.
//!
//! topichain consumes its transport through a deliberately narrow contract: publish bytes on a
//! named topic, and poll for delivered bytes. Connection management, subscription handshakes, and
//! delivery guarantees all live on the provider's side of the [Network] trait; this crate assumes
//! at-least-once delivery (duplicates are absorbed by ledger idempotence) and, for the ordering
//! topic specifically, one globally agreed delivery order.
//!
//! The [poller](start_polling) forwards the payloads of ordering-topic messages to the ingestion
//! path. A message on any other topic is an error at this boundary: it is logged and dropped, and
//! is never processed further.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use crate::logging;

/// A failure reported by the transport provider on publish.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

pub trait Network: Clone + Send {
    /// Publish a message on the named topic without blocking. Delivery to every subscribed node is
    /// at-least-once; duplicates are possible.
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Receive a delivered message from any subscribed topic. Returns immediately with a None if no
    /// message is available now.
    fn recv(&mut self) -> Option<(String, Vec<u8>)>;
}

/// Spawn the poller thread, which polls the Network for delivered messages and forwards the
/// payloads of those on the ordering topic into the returned receiver.
pub(crate) fn start_polling<N: Network + 'static>(
    mut network: N,
    ordering_topic: String,
    shutdown_signal: Receiver<()>,
) -> (JoinHandle<()>, Receiver<Vec<u8>>) {
    let (to_proposal_receiver, proposal_receiver) = mpsc::channel();

    let poller_thread = thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => return,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("Poller thread disconnected from main thread")
            }
        }

        if let Some((topic, payload)) = network.recv() {
            if topic == ordering_topic {
                // The send fails if the node runs without an ingestion thread (a role without
                // ledger-writing duties dropped the receiver); the message is then discarded
                // without effect, which is exactly what those roles are meant to do.
                let _ = to_proposal_receiver.send(payload);
            } else {
                log::warn!(
                    "{}, {}, {}",
                    logging::UNRECOGNIZED_TOPIC,
                    logging::secs_since_unix_epoch(SystemTime::now()),
                    topic
                );
            }
        } else {
            thread::yield_now()
        }
    });

    (poller_thread, proposal_receiver)
}
