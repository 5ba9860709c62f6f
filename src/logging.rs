/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the node's
//! [config](crate::config::Configuration).
//!
//! topichain logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values
//! are always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an [AppendBlock](crate::events::AppendBlockEvent) is printed:
//!
//! ```text
//! AppendBlock, 1701329264, fNGCJyk, 3
//! ```
//!
//! In the snippet:
//! - The third value is the first seven characters of the Base64 encoding of the hash of the
//!   appended block.
//! - The fourth value is the height the block was appended at.
//!
//! Informational events are logged at `info`, rejections at `warn`.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const APPEND_BLOCK: &str = "AppendBlock";

pub const PROPOSE: &str = "Propose";
pub const PROPOSAL_FAILED: &str = "ProposalFailed";

pub const RECEIVE_PROPOSAL: &str = "ReceiveProposal";
pub const DUPLICATE_BLOCK: &str = "DuplicateBlock";
pub const REJECT_BLOCK: &str = "RejectBlock";

pub const STORAGE_FAILURE: &str = "StorageFailure";
pub const UNRECOGNIZED_TOPIC: &str = "UnrecognizedTopic";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for AppendBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |append_block_event: &AppendBlockEvent| {
            log::info!(
                "{}, {}, {}, {}",
                APPEND_BLOCK,
                secs_since_unix_epoch(append_block_event.timestamp),
                first_seven_base64_chars(&append_block_event.block.hash),
                append_block_event.height
            )
        };
        Box::new(logger)
    }
}

impl Logger for ProposeEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |propose_event: &ProposeEvent| {
            log::info!(
                "{}, {}, {}, {}",
                PROPOSE,
                secs_since_unix_epoch(propose_event.timestamp),
                propose_event.organization,
                first_seven_base64_chars(&propose_event.block_hash)
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveProposalEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_proposal_event: &ReceiveProposalEvent| {
            log::info!(
                "{}, {}, {}, {}",
                RECEIVE_PROPOSAL,
                secs_since_unix_epoch(receive_proposal_event.timestamp),
                receive_proposal_event.organization,
                first_seven_base64_chars(&receive_proposal_event.block_hash)
            )
        };
        Box::new(logger)
    }
}

impl Logger for DuplicateBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |duplicate_block_event: &DuplicateBlockEvent| {
            log::info!(
                "{}, {}, {}",
                DUPLICATE_BLOCK,
                secs_since_unix_epoch(duplicate_block_event.timestamp),
                first_seven_base64_chars(&duplicate_block_event.block_hash)
            )
        };
        Box::new(logger)
    }
}

impl Logger for RejectBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reject_block_event: &RejectBlockEvent| {
            let block_hash = match &reject_block_event.block_hash {
                Some(hash) => first_seven_base64_chars(hash),
                None => "-".to_string(),
            };
            log::warn!(
                "{}, {}, {}, {}",
                REJECT_BLOCK,
                secs_since_unix_epoch(reject_block_event.timestamp),
                block_hash,
                reject_block_event.reason
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

pub(crate) fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .expect("Event occured before the Unix Epoch.")
        .as_secs()
}
