/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for structured messages that are published on the ordering topic.
//!
//! The wire format is borsh. The [Message] enum exists so that the topic can carry further message
//! kinds without breaking old decoders; today a block proposal is the only traffic.

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::Block;

#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub enum Message {
    Proposal(Proposal),
}

/// A block offered for appension, exactly as built by its proposer. Peers judge it independently;
/// the proposal itself carries no endorsement of any kind.
#[derive(Clone, BorshSerialize, BorshDeserialize)]
pub struct Proposal {
    pub block: Block,
}
