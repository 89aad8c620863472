/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the application's
//! [config](crate::config::Configuration).
//!
//! Stampchain logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations), e.g.,
//! with [`setup_logger`].
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [FinalizeBlock](crate::events::FinalizeBlockEvent) is printed:
//!
//! ```text
//! FinalizeBlock, 1701329264, 12, fNGCJyk, 3, 0
//! ```
//!
//! In the snippet:
//! - The third value is the height of the block.
//! - The fourth value is the first seven characters of the Base64 encoding of the app hash.
//! - The fifth and sixth values are the number of executed and dropped transactions.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log::LevelFilter;

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const INIT_CHAIN: &str = "InitChain";
pub const COMMIT_BLOCK: &str = "CommitBlock";
pub const RESTORE_SNAPSHOT: &str = "RestoreSnapshot";

pub const EXECUTE_TX: &str = "ExecuteTx";
pub const DROP_TX: &str = "DropTx";
pub const DISTRIBUTE_REWARDS: &str = "DistributeRewards";
pub const SKIP_REWARDS: &str = "SkipRewards";
pub const UPDATE_VALIDATOR_SET: &str = "UpdateValidatorSet";
pub const FINALIZE_BLOCK: &str = "FinalizeBlock";

pub const CREATE_SNAPSHOT: &str = "CreateSnapshot";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for InitChainEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |init_chain_event: &InitChainEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                INIT_CHAIN,
                secs_since_unix_epoch(init_chain_event.timestamp),
                init_chain_event.chain_id,
                first_seven_base64_chars(&init_chain_event.app_hash.bytes()),
                init_chain_event.members
            )
        };
        Box::new(logger)
    }
}

impl Logger for CommitBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |commit_block_event: &CommitBlockEvent| {
            log::info!(
                "{}, {}, {}, {}",
                COMMIT_BLOCK,
                secs_since_unix_epoch(commit_block_event.timestamp),
                commit_block_event.height,
                first_seven_base64_chars(&commit_block_event.app_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for RestoreSnapshotEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |restore_snapshot_event: &RestoreSnapshotEvent| {
            log::info!(
                "{}, {}, {}, {}",
                RESTORE_SNAPSHOT,
                secs_since_unix_epoch(restore_snapshot_event.timestamp),
                restore_snapshot_event.height,
                first_seven_base64_chars(&restore_snapshot_event.app_hash.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for ExecuteTxEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |execute_tx_event: &ExecuteTxEvent| {
            log::debug!(
                "{}, {}, {}, {}, {}, {}",
                EXECUTE_TX,
                secs_since_unix_epoch(execute_tx_event.timestamp),
                execute_tx_event.height,
                first_seven_base64_chars(&execute_tx_event.transaction.bytes()),
                execute_tx_event.status,
                execute_tx_event.stamps_used
            )
        };
        Box::new(logger)
    }
}

impl Logger for DropTxEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |drop_tx_event: &DropTxEvent| {
            let transaction = match &drop_tx_event.transaction {
                Some(hash) => first_seven_base64_chars(&hash.bytes()),
                None => String::from("-"),
            };
            log::info!(
                "{}, {}, {}, {}, {}",
                DROP_TX,
                secs_since_unix_epoch(drop_tx_event.timestamp),
                drop_tx_event.height,
                transaction,
                drop_tx_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for DistributeRewardsEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |distribute_rewards_event: &DistributeRewardsEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                DISTRIBUTE_REWARDS,
                secs_since_unix_epoch(distribute_rewards_event.timestamp),
                distribute_rewards_event.height,
                distribute_rewards_event.pool,
                distribute_rewards_event.payouts.total_paid(),
                distribute_rewards_event.payouts.validators.len()
            )
        };
        Box::new(logger)
    }
}

impl Logger for SkipRewardsEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |skip_rewards_event: &SkipRewardsEvent| {
            log::info!(
                "{}, {}, {}, {}",
                SKIP_REWARDS,
                secs_since_unix_epoch(skip_rewards_event.timestamp),
                skip_rewards_event.height,
                skip_rewards_event.error
            )
        };
        Box::new(logger)
    }
}

impl Logger for UpdateValidatorSetEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |update_validator_set_event: &UpdateValidatorSetEvent| {
            let updates = &update_validator_set_event.validator_set_updates;
            let inserts: Vec<String> = updates
                .inserts()
                .map(|(account, power)| format!("{} {}", first_seven_hex_chars(account.as_str()), power.int()))
                .collect();
            let deletes: Vec<String> = updates
                .deletes()
                .map(|account| first_seven_hex_chars(account.as_str()))
                .collect();
            log::info!(
                "{}, {}, {}, [{}], [{}]",
                UPDATE_VALIDATOR_SET,
                secs_since_unix_epoch(update_validator_set_event.timestamp),
                update_validator_set_event.height,
                inserts.join(" "),
                deletes.join(" ")
            )
        };
        Box::new(logger)
    }
}

impl Logger for FinalizeBlockEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |finalize_block_event: &FinalizeBlockEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                FINALIZE_BLOCK,
                secs_since_unix_epoch(finalize_block_event.timestamp),
                finalize_block_event.height,
                first_seven_base64_chars(&finalize_block_event.app_hash.bytes()),
                finalize_block_event.executed,
                finalize_block_event.dropped
            )
        };
        Box::new(logger)
    }
}

impl Logger for CreateSnapshotEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |create_snapshot_event: &CreateSnapshotEvent| {
            log::info!(
                "{}, {}, {}, {}",
                CREATE_SNAPSHOT,
                secs_since_unix_epoch(create_snapshot_event.timestamp),
                create_snapshot_event.height,
                create_snapshot_event.chunks
            )
        };
        Box::new(logger)
    }
}

/// Install a [`fern`] dispatcher that prints every log record at or above `level` to stdout,
/// prefixed by its level and target. Fails if a global logger has already been set.
pub fn setup_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn first_seven_hex_chars(account: &str) -> String {
    account.chars().take(7).collect()
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
