/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Thread that receives published [events](crate::events) and fires their handlers.

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{events::*, logging::Logger};

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// Handlers for every event type. Each handler vector is fired in order.
#[derive(Default)]
pub(crate) struct EventHandlers {
    pub(crate) init_chain_handlers: Vec<HandlerPtr<InitChainEvent>>,
    pub(crate) commit_block_handlers: Vec<HandlerPtr<CommitBlockEvent>>,
    pub(crate) restore_snapshot_handlers: Vec<HandlerPtr<RestoreSnapshotEvent>>,
    pub(crate) execute_tx_handlers: Vec<HandlerPtr<ExecuteTxEvent>>,
    pub(crate) drop_tx_handlers: Vec<HandlerPtr<DropTxEvent>>,
    pub(crate) distribute_rewards_handlers: Vec<HandlerPtr<DistributeRewardsEvent>>,
    pub(crate) skip_rewards_handlers: Vec<HandlerPtr<SkipRewardsEvent>>,
    pub(crate) update_validator_set_handlers: Vec<HandlerPtr<UpdateValidatorSetEvent>>,
    pub(crate) finalize_block_handlers: Vec<HandlerPtr<FinalizeBlockEvent>>,
    pub(crate) create_snapshot_handlers: Vec<HandlerPtr<CreateSnapshotEvent>>,
}

impl EventHandlers {
    /// Add the default [logger](crate::logging) of every event type in front of the handlers
    /// already registered.
    pub(crate) fn add_loggers(&mut self) {
        self.init_chain_handlers.insert(0, InitChainEvent::get_logger());
        self.commit_block_handlers.insert(0, CommitBlockEvent::get_logger());
        self.restore_snapshot_handlers.insert(0, RestoreSnapshotEvent::get_logger());
        self.execute_tx_handlers.insert(0, ExecuteTxEvent::get_logger());
        self.drop_tx_handlers.insert(0, DropTxEvent::get_logger());
        self.distribute_rewards_handlers.insert(0, DistributeRewardsEvent::get_logger());
        self.skip_rewards_handlers.insert(0, SkipRewardsEvent::get_logger());
        self.update_validator_set_handlers.insert(0, UpdateValidatorSetEvent::get_logger());
        self.finalize_block_handlers.insert(0, FinalizeBlockEvent::get_logger());
        self.create_snapshot_handlers.insert(0, CreateSnapshotEvent::get_logger());
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.init_chain_handlers.is_empty()
            && self.commit_block_handlers.is_empty()
            && self.restore_snapshot_handlers.is_empty()
            && self.execute_tx_handlers.is_empty()
            && self.drop_tx_handlers.is_empty()
            && self.distribute_rewards_handlers.is_empty()
            && self.skip_rewards_handlers.is_empty()
            && self.update_validator_set_handlers.is_empty()
            && self.finalize_block_handlers.is_empty()
            && self.create_snapshot_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::InitChain(init_chain_event) => self
                .init_chain_handlers
                .iter()
                .for_each(|handler| handler(&init_chain_event)),

            Event::CommitBlock(commit_block_event) => self
                .commit_block_handlers
                .iter()
                .for_each(|handler| handler(&commit_block_event)),

            Event::RestoreSnapshot(restore_snapshot_event) => self
                .restore_snapshot_handlers
                .iter()
                .for_each(|handler| handler(&restore_snapshot_event)),

            Event::ExecuteTx(execute_tx_event) => self
                .execute_tx_handlers
                .iter()
                .for_each(|handler| handler(&execute_tx_event)),

            Event::DropTx(drop_tx_event) => self
                .drop_tx_handlers
                .iter()
                .for_each(|handler| handler(&drop_tx_event)),

            Event::DistributeRewards(distribute_rewards_event) => self
                .distribute_rewards_handlers
                .iter()
                .for_each(|handler| handler(&distribute_rewards_event)),

            Event::SkipRewards(skip_rewards_event) => self
                .skip_rewards_handlers
                .iter()
                .for_each(|handler| handler(&skip_rewards_event)),

            Event::UpdateValidatorSet(update_validator_set_event) => self
                .update_validator_set_handlers
                .iter()
                .for_each(|handler| handler(&update_validator_set_event)),

            Event::FinalizeBlock(finalize_block_event) => self
                .finalize_block_handlers
                .iter()
                .for_each(|handler| handler(&finalize_block_event)),

            Event::CreateSnapshot(create_snapshot_event) => self
                .create_snapshot_handlers
                .iter()
                .for_each(|handler| handler(&create_snapshot_event)),
        }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Start the event bus thread. On a shutdown signal, it fires the handlers of every event already
/// published, then returns.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                event_subscriber
                    .try_iter()
                    .for_each(|event| event_handlers.fire_handlers(event));
                return;
            }
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            Err(RecvTimeoutError::Disconnected) => return,
        }
    })
}
