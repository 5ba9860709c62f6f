/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types and methods used to access and mutate the persistent, append-only sequence of accepted
//! blocks that a peer keeps.
//!
//! The ledger may be stored in a key-value store of the library user's own choosing, as long as
//! that KV store can provide a type that implements [KVStore]. The ledger is mutated through an
//! instance of [Ledger], and read through an instance of [LedgerSnapshot], which can be created
//! using [LedgerCamera].
//!
//! In normal operation, topichain code internally makes all writes to the ledger from the ingestion
//! thread, and users get a [LedgerCamera] using the node's
//! [ledger_camera](crate::node::Node::ledger_camera) method. The ingestion thread is the single
//! writer on a node: it performs its read-validate-append sequence with exclusive ownership of the
//! [Ledger] handle, so no two appends can both validate against the same head and both succeed.
//!
//! ## State variables
//!
//! The ledger is structured into separate conceptual 'variables' which are stored at a particular
//! key prefix in the library user's chosen KV store. These variables are:
//! - **Blocks** ([CryptoHash] -> [Block]).
//! - **Block at Height** (height -> [CryptoHash]): the appended order. Every block has exactly one
//!   height, because a block is only ever appended on top of the current head.
//! - **Head** ([CryptoHash]): the most recently appended block, or the genesis sentinel.
//! - **Length** (u64): the number of appended blocks.
//!
//! The location of each of these variables in a KV store is defined in [paths].
//!
//! ## Initial state
//!
//! [Ledger::initialize] seeds Head with [GENESIS_HASH] and Length with 0. The getters tolerate a
//! completely unseeded store by defaulting to the same values, so a snapshot taken before
//! initialization still reads as an empty ledger.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::events::{AppendBlockEvent, Event};
use crate::types::{Block, CryptoHash, GENESIS_HASH};

/// The outcome of a completed [append](Ledger::append).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    /// The block was durably persisted and is now the head.
    Appended,
    /// A block with the same hash already exists; nothing was written. Expected under
    /// at-least-once delivery, and treated by callers as a successful no-op.
    AlreadyPresent,
}

/// A persistence-layer failure (I/O, connectivity) reported by the underlying key-value store.
///
/// A block whose append fails with this error is not considered appended: no state variable is
/// advanced, and the caller must not advance any in-memory notion of the head either.
#[derive(Debug, Clone, thiserror::Error)]
#[error("ledger storage failure: {0}")]
pub struct StorageError(pub String);

/// A read and write handle into the ledger.
///
/// The ingestion thread holds its node's writing handle exclusively. Constructing a second writer
/// over the same store breaks the single-writer discipline that makes validate-then-append atomic
/// on a node; do so only for initialization, recovery, or tests.
pub struct Ledger<K: KVStore>(K);

impl<K: KVStore> Ledger<K> {
    pub fn new(kv_store: K) -> Self {
        Ledger(kv_store)
    }

    /* ↓↓↓ Initialize ↓↓↓ */

    /// Seed the state variables of an empty ledger.
    pub fn initialize(&mut self) -> Result<(), StorageError> {
        let mut wb = LedgerWriteBatch::new();
        wb.set_head(&GENESIS_HASH);
        wb.set_length(0);
        self.write(wb)
    }

    /* ↓↓↓ Appending ↓↓↓ */

    /// Append a block, making it the new head, and publish an [AppendBlockEvent] once the write
    /// batch has landed.
    ///
    /// If a block with the same hash is already in the ledger, this is a no-op returning
    /// [AppendResult::AlreadyPresent]: hashes are unique within a ledger, and redelivery must not
    /// produce a second copy.
    ///
    /// # Precondition
    /// [validate](crate::validation::validate) has passed against the current head.
    pub fn append(
        &mut self,
        block: &Block,
        event_publisher: &Option<Sender<Event>>,
    ) -> Result<AppendResult, StorageError> {
        if self.contains(&block.hash) {
            return Ok(AppendResult::AlreadyPresent);
        }

        let height = self.length();

        let mut wb = LedgerWriteBatch::new();
        wb.set_block(block);
        wb.set_block_at_height(height, &block.hash);
        wb.set_head(&block.hash);
        wb.set_length(height + 1);
        self.write(wb)?;

        Event::AppendBlock(AppendBlockEvent {
            timestamp: SystemTime::now(),
            block: block.clone(),
            height,
        })
        .publish(event_publisher);

        Ok(AppendResult::Appended)
    }

    /* ↓↓↓ WriteBatch commit ↓↓↓ */

    pub fn write(&mut self, write_batch: LedgerWriteBatch<K::WriteBatch>) -> Result<(), StorageError> {
        self.0.write(write_batch.0)
    }

    /* ↓↓↓ Snapshot ↓↓↓ */

    pub fn snapshot(&self) -> LedgerSnapshot<K::Snapshot<'_>> {
        LedgerSnapshot(self.0.snapshot())
    }
}

pub struct LedgerWriteBatch<W: WriteBatch>(W);

use paths::*;
impl<W: WriteBatch> LedgerWriteBatch<W> {
    pub fn new() -> LedgerWriteBatch<W> {
        LedgerWriteBatch(W::new())
    }

    /* ↓↓↓ Blocks ↓↓↓ */

    pub fn set_block(&mut self, block: &Block) {
        self.0.set(
            &combine(&BLOCKS, &block.hash),
            &block.try_to_vec().unwrap(),
        );
    }

    /* ↓↓↓ Block at Height ↓↓↓ */

    pub fn set_block_at_height(&mut self, height: u64, block: &CryptoHash) {
        self.0.set(
            &combine(&BLOCK_AT_HEIGHT, &height.try_to_vec().unwrap()),
            &block.try_to_vec().unwrap(),
        );
    }

    /* ↓↓↓ Head ↓↓↓ */

    pub fn set_head(&mut self, block: &CryptoHash) {
        self.0.set(&HEAD, &block.try_to_vec().unwrap());
    }

    /* ↓↓↓ Length ↓↓↓ */

    pub fn set_length(&mut self, length: u64) {
        self.0.set(&LENGTH, &length.try_to_vec().unwrap());
    }
}

/// A factory for [LedgerSnapshot]s, cheap to clone and safe to share outside the ingestion thread.
#[derive(Clone)]
pub struct LedgerCamera<K: KVStore>(K);

impl<K: KVStore> LedgerCamera<K> {
    pub fn new(kv_store: K) -> Self {
        LedgerCamera(kv_store)
    }

    pub fn snapshot(&self) -> LedgerSnapshot<K::Snapshot<'_>> {
        LedgerSnapshot(self.0.snapshot())
    }
}

/// A read view into the ledger that is guaranteed to stay unchanged, and consistent with the most
/// recent completed append at the time it was taken.
pub struct LedgerSnapshot<S: KVGet>(S);

pub trait KVStore: KVGet + Clone + Send + 'static {
    type WriteBatch: WriteBatch;
    type Snapshot<'a>: 'a + KVGet;

    /// Atomically apply a write batch. Must be durable on return; a persistence failure is reported
    /// as a [StorageError] and must leave the store as if the batch was never applied.
    fn write(&mut self, wb: Self::WriteBatch) -> Result<(), StorageError>;
    fn snapshot<'b>(&'b self) -> Self::Snapshot<'b>;
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
}

// Causes the getter methods defined by default for implementors of KVGet to also be public methods
// of Ledger and LedgerSnapshot.
macro_rules! re_export_getters_from_ledger_and_ledger_snapshot {
    ($self:ident, pub trait KVGet {
        fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

        $(fn $f_name:ident(&self$(,)? $($param_name:ident: $param_type:ty),*) -> $return_type:ty $body:block)*
    })
    => {
        pub trait KVGet {
            fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
            $(fn $f_name(&$self, $($param_name: $param_type),*) -> $return_type $body)*
        }

        impl<K: KVStore> Ledger<K> {
            $(pub fn $f_name(&self, $($param_name: $param_type),*) -> $return_type {
                self.0.$f_name($($param_name),*)
            })*
        }

        impl<S: KVGet> LedgerSnapshot<S> {
            $(pub fn $f_name(&self, $($param_name: $param_type),*) -> $return_type {
                self.0.$f_name($($param_name),*)
            })*
        }
    }
}

re_export_getters_from_ledger_and_ledger_snapshot!(
    self,
    pub trait KVGet {
        fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

        /* ↓↓↓ Blocks ↓↓↓ */

        fn block(&self, block: &CryptoHash) -> Option<Block> {
            let bs = self.get(&combine(&BLOCKS, block))?;
            Some(Block::deserialize(&mut bs.as_slice()).unwrap())
        }

        fn contains(&self, block: &CryptoHash) -> bool {
            self.get(&combine(&BLOCKS, block)).is_some()
        }

        /* ↓↓↓ Block at Height ↓↓↓ */

        fn block_at_height(&self, height: u64) -> Option<CryptoHash> {
            let bs = self.get(&combine(&BLOCK_AT_HEIGHT, &height.try_to_vec().unwrap()))?;
            Some(CryptoHash::deserialize(&mut bs.as_slice()).unwrap())
        }

        /* ↓↓↓ Head ↓↓↓ */

        fn head_hash(&self) -> CryptoHash {
            match self.get(&HEAD) {
                Some(bs) => CryptoHash::deserialize(&mut bs.as_slice()).unwrap(),
                None => GENESIS_HASH,
            }
        }

        fn head(&self) -> Option<Block> {
            let head_hash = self.head_hash();
            if head_hash == GENESIS_HASH {
                None
            } else {
                self.block(&head_hash)
            }
        }

        /* ↓↓↓ Length ↓↓↓ */

        fn length(&self) -> u64 {
            match self.get(&LENGTH) {
                Some(bs) => u64::deserialize(&mut bs.as_slice()).unwrap(),
                None => 0,
            }
        }
    }
);

mod paths {
    // State variables
    pub(super) const BLOCKS: [u8; 1] = [0];
    pub(super) const BLOCK_AT_HEIGHT: [u8; 1] = [1];
    pub(super) const HEAD: [u8; 1] = [2];
    pub(super) const LENGTH: [u8; 1] = [3];
}

/// Takes references to two byteslices and returns a vector containing the bytes of the first one, and then the bytes of the
/// second one.
fn combine(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}
