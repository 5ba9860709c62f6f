/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The parameters that shape a running node: its organization identity, its role, the ordering
//! topic it participates in, and whether events are logged.
//!
//! Loading these values from files or the environment is the embedder's job; this crate only
//! consumes the resulting [Configuration].

use typed_builder::TypedBuilder;

use crate::types::Organization;

/// Stores the user-defined parameters required to start a node, that is:
/// 1. The identifier of the organization the node proposes on behalf of.
/// 2. The node's [Role], which decides whether the ingestion path is active.
/// 3. The name of the ordering topic.
/// 4. The "Log Events" flag, if set to "true" then logs should be printed.
///
/// ## Ordering topic
///
/// All nodes of one deployment must name the same ordering topic: it is the single channel assumed
/// to deliver every published proposal to every peer in one agreed order. Messages delivered on any
/// other topic are dropped at the transport boundary.
///
/// ## Log Events
///
/// topichain logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.organization(...)`
    - `.role(...)`
    - `.ordering_topic(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the identifier of the organization this node proposes on behalf of. Must be non-empty. Required."))]
    pub organization: Organization,
    #[builder(setter(doc = "Set the node's role, which decides whether the ingestion path is active. Required."))]
    pub role: Role,
    #[builder(setter(doc = "Set the name of the ordering topic that carries block proposals. Required."))]
    pub ordering_topic: String,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

/// The duty a node declares at startup.
///
/// Only peers hold a local copy of the ledger. Every other role participates propose-only, and
/// silently ignores blocks delivered on the ordering topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Validates and appends every block delivered on the ordering topic.
    Peer,
    /// Operates the ordering service. The ordering itself is external to this crate; an orderer
    /// process keeps no ledger.
    Orderer,
    /// A propose-only participant.
    Client,
}

impl Role {
    /// Whether the ingestion (validate-then-append) path is active for this role.
    pub fn writes_ledger(&self) -> bool {
        matches!(self, Role::Peer)
    }
}
