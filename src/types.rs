/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for 'inert' types, i.e., those that are sent around and inspected, but have no active behavior.
//!
//! The central type here is [Block]: the unit that organizations wrap application data into before
//! broadcasting it on the ordering topic. A block's identity is its [hash](Block::hash), a SHA256
//! digest computed once, in [Block::new], over the borsh encodings of the block's other fields. It
//! is never recomputed after creation; peers that receive the block recompute the digest themselves
//! to judge it (see [crate::validation]).

use std::time::SystemTime;

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::Digest;

pub use sha2::Sha256 as CryptoHasher;

pub type CryptoHash = [u8; 32];
pub type Organization = String;
pub type Payload = Vec<u8>;
pub type Timestamp = u64;

/// The well-known placeholder previous-hash value carried by the first block appended to an empty
/// ledger.
pub const GENESIS_HASH: CryptoHash = [0u8; 32];

/// A hash-linked wrapper around opaque application data. Immutable once created: it travels
/// unmodified from its proposer, through the ordering topic, into the ledgers of the peers that
/// accept it.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub struct Block {
    /// Identifier of the proposing party. Non-empty.
    pub organization: Organization,
    /// Already-serialized application data. Opaque to this crate.
    pub payload: Payload,
    /// Hash of the block this one logically follows, or [GENESIS_HASH] for the first block.
    pub previous_hash: CryptoHash,
    /// Creation time in seconds since the Unix epoch. Not monotonic across organizations:
    /// proposals are concurrent.
    pub timestamp: Timestamp,
    /// The block's identity: a digest over every other field.
    pub hash: CryptoHash,
}

impl Block {
    /// Create a fully-populated block wrapping `payload` on behalf of `organization`, chained
    /// behind `previous_hash`. The timestamp is read from the wall clock.
    ///
    /// The only failure path is a precondition violation by the caller: an empty organization
    /// identifier. This is a local error and is never surfaced to the network.
    pub fn new(
        organization: Organization,
        payload: Payload,
        previous_hash: CryptoHash,
    ) -> Result<Block, InvalidArgument> {
        if organization.is_empty() {
            return Err(InvalidArgument::EmptyOrganization);
        }

        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("System clock is set before the Unix Epoch.")
            .as_secs();
        let hash = Block::compute_hash(&organization, &payload, &previous_hash, timestamp);

        Ok(Block {
            organization,
            payload,
            previous_hash,
            timestamp,
            hash,
        })
    }

    /// Compute a block's identity: the SHA256 digest over the borsh encodings of organization,
    /// payload, previous hash, and timestamp, in that order. Borsh length-prefixes the
    /// variable-length fields, so the concatenation fed into the hasher is injective.
    pub fn compute_hash(
        organization: &Organization,
        payload: &Payload,
        previous_hash: &CryptoHash,
        timestamp: Timestamp,
    ) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(&organization.try_to_vec().unwrap());
        hasher.update(&payload.try_to_vec().unwrap());
        hasher.update(&previous_hash.try_to_vec().unwrap());
        hasher.update(&timestamp.try_to_vec().unwrap());
        hasher.finalize().into()
    }

    /// Checks if the declared hash is cryptographically correct, i.e., recomputing the digest over
    /// the block's own fields produces the declared value.
    pub fn is_correct(&self) -> bool {
        self.hash
            == Block::compute_hash(
                &self.organization,
                &self.payload,
                &self.previous_hash,
                self.timestamp,
            )
    }
}

/// Precondition violation on [block creation](Block::new).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidArgument {
    #[error("organization identifier is empty")]
    EmptyOrganization,
}
