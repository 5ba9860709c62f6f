/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! topichain is a minimal replicated-ledger protocol. Application data is wrapped into hash-linked
//! [blocks](types::Block), broadcast through a single ordered pub/sub topic, and appended to a
//! local [ledger](ledger::Ledger) by every node holding the peer [role](config::Role) after
//! independent [validation](validation::validate).
//!
//! The crate is the block-proposal/validation/ledger-append pipeline and nothing more. It is not a
//! Byzantine-fault-tolerant consensus protocol: the ordering topic is assumed to deliver proposals
//! to all peers in one globally agreed order, and validation, not agreement, is a node's only
//! defense against bad blocks. When two organizations propose against the same parent, the
//! proposal delivered first wins and the other is rejected and dropped; there are no forks, no
//! reorganizations, and no retry of the losing proposal.
//!
//! The transport and the storage backend are pluggable: bring an implementation of
//! [networking::Network] for the pub/sub side and of [ledger::KVStore] for persistence, describe
//! the node with [config::Configuration], then build and start it through [node::NodeSpec].

pub mod config;

pub mod events;

pub mod ledger;

pub mod logging;

pub mod messages;

pub mod networking;

pub mod node;

pub mod types;

pub mod validation;

pub(crate) mod event_bus;

pub(crate) mod ingestion;
