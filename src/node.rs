/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and run a node.
//!
//! A topichain deployment is a set of processes that replicate one ledger. In our terminology,
//! these processes are called 'nodes'. Each node acts on behalf of exactly one organization, and
//! declares a [role](crate::config::Role) that decides its duties: peers consume the ordering topic
//! and write the ledger, while every other role participates propose-only.
//!
//! The key components of this module are:
//! - The builder-pattern interface to construct a [specification of the node](NodeSpec) with:
//!   1. `NodeSpec::builder` to construct a `NodeSpecBuilder`,
//!   2. The setters of the `NodeSpecBuilder`, and
//!   3. The `NodeSpecBuilder::build` method to construct a [NodeSpec],
//! - The function to [start](NodeSpec::start) a [Node] given its specification,
//! - [The type](Node) which keeps the node alive, accepts [proposals](Node::propose), and shuts
//!   everything down when dropped.
//!
//! A fresh KV store can be seeded before the first start with
//! [Ledger::initialize](crate::ledger::Ledger::initialize); an unseeded store also reads correctly
//! as an empty ledger.
//!
//! ## Starting a node
//!
//! Here is an example that demonstrates how to build and start running a node using the builder
//! pattern:
//!
//! ```ignore
//! let node =
//!     NodeSpec::builder()
//!     .configuration(configuration)
//!     .kv_store(kv_store)
//!     .network(network)
//!     .on_append_block(append_handler)
//!     .build()
//!     .start()
//! ```
//!
//! ### Required setters
//!
//! The required setters are for providing the configuration and the trait implementations required
//! to run a node:
//! - `.configuration(...)`
//! - `.kv_store(...)`
//! - `.network(...)`
//!
//! ### Optional setters
//!
//! The optional setters are for registering user-defined event handlers for events from
//! [crate::events]:
//! - `.on_append_block(...)`
//! - `.on_propose(...)`
//! - `.on_receive_proposal(...)`
//! - `.on_duplicate_block(...)`
//! - `.on_reject_block(...)`
//!
//! The node's [configuration](crate::config::Configuration) can also be defined using the builder
//! pattern, for example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .organization("orgA".to_string())
//!     .role(Role::Peer)
//!     .ordering_topic("blocks".to_string())
//!     .log_events(true)
//!     .build()
//! ```

use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;
use std::time::SystemTime;

use borsh::BorshSerialize;
use typed_builder::TypedBuilder;

use crate::config::Configuration;
use crate::event_bus::{start_event_bus, EventHandlers, HandlerPtr};
use crate::events::*;
use crate::ingestion::start_ingestion;
use crate::ledger::{KVStore, Ledger, LedgerCamera};
use crate::logging::{first_seven_base64_chars, secs_since_unix_epoch, PROPOSAL_FAILED};
use crate::messages::{Message, Proposal};
use crate::networking::{start_polling, Network, TransportError};
use crate::types::{Block, CryptoHash, InvalidArgument, Payload};

/// Stores all necessary parameters and trait implementations required to run a [Node].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [NodeSpec]. On the builder call the following methods to construct a valid [NodeSpec].

    Required:
    - `.configuration(...)`
    - `.kv_store(...)`
    - `.network(...)`

    Optional:
    - `.on_append_block(...)`
    - `.on_propose(...)`
    - `.on_receive_proposal(...)`
    - `.on_duplicate_block(...)`
    - `.on_reject_block(...)`
"))]
pub struct NodeSpec<K: KVStore, N: Network + 'static> {
    // Required parameters
    #[builder(setter(doc = "Set the [configuration](crate::config::Configuration), which contains the necessary parameters to run a node. Required."))]
    configuration: Configuration,
    #[builder(setter(doc = "Set the implementation of the node's Key-Value store. The argument must implement the [KVStore](crate::ledger::KVStore) trait. Required."))]
    kv_store: K,
    #[builder(setter(doc = "Set the implementation of pub/sub transport. The argument must implement the [Network](crate::networking::Network) trait. Required."))]
    network: N,
    // Optional parameters
    #[builder(default, setter(transform = |handler: impl Fn(&AppendBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<AppendBlockEvent>),
    doc = "Register a handler closure to be invoked after a block is appended to the node's [Ledger](crate::ledger::Ledger). Optional."))]
    on_append_block: Option<HandlerPtr<AppendBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ProposeEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ProposeEvent>),
    doc = "Register a handler closure to be invoked after the node publishes a block proposal on the ordering topic. Optional."))]
    on_propose: Option<HandlerPtr<ProposeEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveProposalEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveProposalEvent>),
    doc = "Register a handler closure to be invoked after the node receives a block proposal from the ordering topic. Optional."))]
    on_receive_proposal: Option<HandlerPtr<ReceiveProposalEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DuplicateBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DuplicateBlockEvent>),
    doc = "Register a handler closure to be invoked after the node absorbs a duplicate delivery of an already-appended block. Optional."))]
    on_duplicate_block: Option<HandlerPtr<DuplicateBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RejectBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RejectBlockEvent>),
    doc = "Register a handler closure to be invoked after the node rejects and drops a delivered block. Optional."))]
    on_reject_block: Option<HandlerPtr<RejectBlockEvent>>,
}

impl<K: KVStore, N: Network + 'static> NodeSpec<K, N> {
    /// Starts all threads and channels associated with running a node, and returns the handles to
    /// them in a [Node] struct.
    pub fn start(self) -> Node<K, N> {
        let ledger = Ledger::new(self.kv_store.clone());

        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_append_block,
            self.on_propose,
            self.on_receive_proposal,
            self.on_duplicate_block,
            self.on_reject_block,
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let (poller_shutdown, poller_shutdown_receiver) = mpsc::channel();
        let (poller, proposals) = start_polling(
            self.network.clone(),
            self.configuration.ordering_topic.clone(),
            poller_shutdown_receiver,
        );

        // Only nodes with ledger-writing duties run the ingestion thread. For every other role the
        // proposal receiver is dropped here, so delivered ledger-topic messages are discarded
        // without effect: a no-op, not an error.
        let (ingestion, ingestion_shutdown) = if self.configuration.role.writes_ledger() {
            let (ingestion_shutdown, ingestion_shutdown_receiver) = mpsc::channel();
            let ingestion = start_ingestion(
                ledger,
                proposals,
                ingestion_shutdown_receiver,
                event_publisher.clone(),
            );
            (Some(ingestion), Some(ingestion_shutdown))
        } else {
            (None, None)
        };

        let (event_bus, event_bus_shutdown) = if !event_handlers.is_empty() {
            let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
            let event_bus = start_event_bus(
                event_handlers,
                event_subscriber.unwrap(), // Safety: should be Some(...).
                event_bus_shutdown_receiver,
            );
            (Some(event_bus), Some(event_bus_shutdown))
        } else {
            (None, None)
        };

        Node {
            configuration: self.configuration,
            network: self.network,
            ledger_camera: LedgerCamera::new(self.kv_store),
            event_publisher,
            poller: Some(poller),
            poller_shutdown,
            ingestion,
            ingestion_shutdown,
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// Why a [propose](Node::propose) call failed. Never fatal to the node: the caller may retry with
/// the same payload.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("invalid proposal: {0}")]
    InvalidArgument(#[from] InvalidArgument),
    #[error("proposal publish failed: {0}")]
    Transport(#[from] TransportError),
}

/// A handle to the background threads of a running topichain node. When this value is dropped, all
/// background threads are shut down and joined, best-effort: releases that individually fail are
/// logged, and teardown always runs to the end.
pub struct Node<K: KVStore, N: Network> {
    configuration: Configuration,
    network: N,
    ledger_camera: LedgerCamera<K>,
    event_publisher: Option<Sender<Event>>,
    poller: Option<JoinHandle<()>>,
    poller_shutdown: Sender<()>,
    ingestion: Option<JoinHandle<()>>,
    ingestion_shutdown: Option<Sender<()>>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<K: KVStore, N: Network> Node<K, N> {
    /// Build a block wrapping `payload` on behalf of this node's organization, chained behind the
    /// ledger's current head, and publish it on the ordering topic.
    ///
    /// Returns the block's hash immediately: publication is fire-and-forget, and acceptance is
    /// asynchronous, observed only by peer-role nodes consuming the topic (including this node, if
    /// it is one). A publish failure is logged and surfaced as [ProposalError::Transport]; it does
    /// not crash the node.
    pub fn propose(&mut self, payload: Payload) -> Result<CryptoHash, ProposalError> {
        let previous_hash = self.ledger_camera.snapshot().head_hash();
        let block = Block::new(
            self.configuration.organization.clone(),
            payload,
            previous_hash,
        )?;
        let block_hash = block.hash;

        let message = Message::Proposal(Proposal { block });
        if let Err(err) = self.network.publish(
            &self.configuration.ordering_topic,
            message.try_to_vec().unwrap(),
        ) {
            log::warn!(
                "{}, {}, {}, {}",
                PROPOSAL_FAILED,
                secs_since_unix_epoch(SystemTime::now()),
                first_seven_base64_chars(&block_hash),
                err
            );
            return Err(ProposalError::Transport(err));
        }

        Event::Propose(ProposeEvent {
            timestamp: SystemTime::now(),
            organization: self.configuration.organization.clone(),
            block_hash,
        })
        .publish(&self.event_publisher);

        Ok(block_hash)
    }

    /// Returns a [LedgerCamera](crate::ledger::LedgerCamera) which can be used to peek into the
    /// node's [Ledger](crate::ledger::Ledger).
    pub fn ledger_camera(&self) -> &LedgerCamera<K> {
        &self.ledger_camera
    }
}

impl<K: KVStore, N: Network> Drop for Node<K, N> {
    fn drop(&mut self) {
        // The ingestion thread publishes to the event bus and receives from the poller, so the
        // shutdown order is: ingestion, then event bus, then poller. Failures are logged and
        // skipped; teardown always runs to the end.
        shutdown_thread("ingestion", &mut self.ingestion, self.ingestion_shutdown.as_ref());
        shutdown_thread("event_bus", &mut self.event_bus, self.event_bus_shutdown.as_ref());
        shutdown_thread("poller", &mut self.poller, Some(&self.poller_shutdown));
    }
}

fn shutdown_thread(name: &str, handle: &mut Option<JoinHandle<()>>, shutdown: Option<&Sender<()>>) {
    if let Some(shutdown) = shutdown {
        if shutdown.send(()).is_err() {
            log::warn!("shutdown signal for the {} thread was not deliverable", name);
        }
    }
    if let Some(handle) = handle.take() {
        if handle.join().is_err() {
            log::warn!("the {} thread panicked before shutdown", name);
        }
    }
}
