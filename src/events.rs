/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of events emitted by the state machine, for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Events are published
//! into a channel and handled on a separate [event bus](crate::event_bus) thread, so handlers never
//! slow down block finalization.

use std::{
    fmt::{self, Display, Formatter},
    sync::mpsc::Sender,
    time::SystemTime,
};

use crate::{
    rewards::Payouts,
    types::{
        basic::{Amount, BlockHeight, ChainID, CryptoHash, Stamps},
        update_sets::ValidatorSetUpdates,
    },
};

pub enum Event {
    // Events that change persistent state.
    InitChain(InitChainEvent),
    CommitBlock(CommitBlockEvent),
    RestoreSnapshot(RestoreSnapshotEvent),
    // Block finalization events.
    ExecuteTx(ExecuteTxEvent),
    DropTx(DropTxEvent),
    DistributeRewards(DistributeRewardsEvent),
    SkipRewards(SkipRewardsEvent),
    UpdateValidatorSet(UpdateValidatorSetEvent),
    FinalizeBlock(FinalizeBlockEvent),
    // State sync events.
    CreateSnapshot(CreateSnapshotEvent),
}

impl Event {
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            // The event bus only stops when the application is dropped.
            let _ = event_publisher.send(event);
        }
    }
}

pub struct InitChainEvent {
    pub timestamp: SystemTime,
    pub chain_id: ChainID,
    pub app_hash: CryptoHash,
    pub members: usize,
}

pub struct CommitBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub app_hash: CryptoHash,
}

pub struct RestoreSnapshotEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub app_hash: CryptoHash,
}

pub struct ExecuteTxEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub transaction: CryptoHash,
    pub status: u32,
    pub stamps_used: Stamps,
}

pub struct DropTxEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    /// `None` if the transaction could not be decoded.
    pub transaction: Option<CryptoHash>,
    pub reason: DropReason,
}

pub struct DistributeRewardsEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub pool: Amount,
    pub payouts: Payouts,
}

pub struct SkipRewardsEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub error: String,
}

pub struct UpdateValidatorSetEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub validator_set_updates: ValidatorSetUpdates,
}

pub struct FinalizeBlockEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub app_hash: CryptoHash,
    pub executed: usize,
    pub dropped: usize,
}

pub struct CreateSnapshotEvent {
    pub timestamp: SystemTime,
    pub height: BlockHeight,
    pub chunks: u32,
}

/// Why a transaction was excluded from its block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    Undecodable,
    BadSignature,
    WrongChain,
    BadNonce,
    EngineFault(String),
    Rejected(String),
}

impl Display for DropReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Undecodable => write!(f, "undecodable"),
            DropReason::BadSignature => write!(f, "bad signature"),
            DropReason::WrongChain => write!(f, "wrong chain"),
            DropReason::BadNonce => write!(f, "bad nonce"),
            DropReason::EngineFault(reason) => write!(f, "engine fault: {}", reason),
            DropReason::Rejected(reason) => write!(f, "rejected: {}", reason),
        }
    }
}
