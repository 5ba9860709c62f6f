/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The acceptance judgement applied to every block delivered on the ordering topic.
//!
//! [validate] is the node's only defense against bad blocks: the ordering topic is trusted to
//! deliver proposals in one total order, but nothing about their contents. Validation never mutates
//! the ledger, and a rejection is never fatal to the node: the block is logged and discarded, and
//! the node continues with the next delivered message.

use crate::types::{Block, CryptoHash, GENESIS_HASH};

/// Why a delivered block was refused.
///
/// The variants correspond to the three checks in [validate], in the order they are applied. A
/// message whose bytes do not decode into a block at all is also [MalformedStructure](Rejection::MalformedStructure).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("malformed-structure")]
    MalformedStructure,
    #[error("hash-mismatch")]
    HashMismatch,
    #[error("stale-or-forked-parent")]
    StaleOrForkedParent,
}

/// Judge a candidate block against the caller's current ledger head.
///
/// Checks are applied in order, short-circuiting on the first failure:
/// 1. Structural completeness: the organization identifier is non-empty and the declared hash is
///    well-formed (in particular, not the genesis sentinel, which is reserved for the previous-hash
///    position).
/// 2. Hash integrity: recomputing the digest over the block's own fields equals the declared hash.
/// 3. Chain continuity: the block's previous hash equals `head`, the hash of the ledger's most
///    recently appended block, or [GENESIS_HASH] if the ledger is empty. Because the topic delivers
///    proposals in one total order, the loser of two competing proposals against the same parent
///    always fails this check.
pub fn validate(block: &Block, head: &CryptoHash) -> Result<(), Rejection> {
    if block.organization.is_empty() || block.hash == GENESIS_HASH {
        return Err(Rejection::MalformedStructure);
    }

    if !block.is_correct() {
        return Err(Rejection::HashMismatch);
    }

    if block.previous_hash != *head {
        return Err(Rejection::StaleOrForkedParent);
    }

    Ok(())
}
