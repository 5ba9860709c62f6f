/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Tests for the ledger store: idempotent append, head/height bookkeeping, and containment of
//! storage failures. These drive a [Ledger] handle directly over the in-memory stores from
//! `common`; multi-node behavior is covered in `replication_test`.

mod common;

use common::mem_db::{FaultyDB, MemDB};
use topichain::ledger::{AppendResult, Ledger, LedgerCamera};
use topichain::types::{Block, GENESIS_HASH};

#[test]
fn an_empty_ledger_reads_as_genesis() {
    let mut ledger = Ledger::new(MemDB::new());
    ledger.initialize().unwrap();

    assert_eq!(ledger.head_hash(), GENESIS_HASH);
    assert!(ledger.head().is_none());
    assert_eq!(ledger.length(), 0);
}

#[test]
fn append_advances_the_head() {
    let mut ledger = Ledger::new(MemDB::new());
    ledger.initialize().unwrap();

    let block = Block::new("orgA".to_string(), b"P1".to_vec(), ledger.head_hash()).unwrap();
    let result = ledger.append(&block, &None).unwrap();

    assert_eq!(result, AppendResult::Appended);
    assert_eq!(ledger.head_hash(), block.hash);
    assert_eq!(ledger.length(), 1);
    assert_eq!(ledger.block_at_height(0), Some(block.hash));
    assert!(ledger.contains(&block.hash));

    let stored = ledger.block(&block.hash).unwrap();
    assert_eq!(stored.hash, block.hash);
    assert_eq!(stored.payload, b"P1");
}

#[test]
fn append_is_idempotent_under_redelivery() {
    let mut ledger = Ledger::new(MemDB::new());
    ledger.initialize().unwrap();

    let block = Block::new("orgA".to_string(), b"P1".to_vec(), ledger.head_hash()).unwrap();

    assert_eq!(ledger.append(&block, &None).unwrap(), AppendResult::Appended);
    assert_eq!(
        ledger.append(&block, &None).unwrap(),
        AppendResult::AlreadyPresent
    );

    // Exactly one copy.
    assert_eq!(ledger.length(), 1);
    assert_eq!(ledger.head_hash(), block.hash);
}

#[test]
fn appends_keep_the_chain_in_order() {
    let mut ledger = Ledger::new(MemDB::new());
    ledger.initialize().unwrap();

    let first = Block::new("orgA".to_string(), b"P1".to_vec(), ledger.head_hash()).unwrap();
    ledger.append(&first, &None).unwrap();
    let second = Block::new("orgB".to_string(), b"P2".to_vec(), ledger.head_hash()).unwrap();
    ledger.append(&second, &None).unwrap();

    assert_eq!(ledger.length(), 2);
    assert_eq!(ledger.block_at_height(0), Some(first.hash));
    assert_eq!(ledger.block_at_height(1), Some(second.hash));
    assert_eq!(ledger.head().unwrap().hash, second.hash);
    assert_eq!(ledger.block(&second.hash).unwrap().previous_hash, first.hash);
}

#[test]
fn a_storage_failure_leaves_the_ledger_untouched() {
    let kv_store = FaultyDB::new();
    let mut ledger = Ledger::new(kv_store.clone());
    ledger.initialize().unwrap();

    let block = Block::new("orgA".to_string(), b"P1".to_vec(), ledger.head_hash()).unwrap();

    kv_store.set_failing(true);
    assert!(ledger.append(&block, &None).is_err());
    assert_eq!(ledger.head_hash(), GENESIS_HASH);
    assert_eq!(ledger.length(), 0);
    assert!(!ledger.contains(&block.hash));

    // The store recovers; the same block appends cleanly.
    kv_store.set_failing(false);
    assert_eq!(ledger.append(&block, &None).unwrap(), AppendResult::Appended);
    assert_eq!(ledger.head_hash(), block.hash);
}

#[test]
fn snapshots_read_consistently_with_completed_appends() {
    let kv_store = MemDB::new();
    let mut ledger = Ledger::new(kv_store.clone());
    ledger.initialize().unwrap();

    let camera = LedgerCamera::new(kv_store);
    assert_eq!(camera.snapshot().head_hash(), GENESIS_HASH);

    let block = Block::new("orgA".to_string(), b"P1".to_vec(), ledger.head_hash()).unwrap();
    ledger.append(&block, &None).unwrap();

    let snapshot = camera.snapshot();
    assert_eq!(snapshot.head_hash(), block.hash);
    assert_eq!(snapshot.length(), 1);
}
