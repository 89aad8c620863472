/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::{sync::mpsc::Sender, time::SystemTime};

use borsh::BorshSerialize;

use crate::{
    config::Genesis,
    events::*,
    execution::Executor,
    pipeline::{BlockFinalizer, BlockInProgress, FinalizedBlock},
    state::{
        app_state::{BlockState, KVSet},
        pluggables::{KVGet, KVStore},
        variables::{LAST_APP_HASH, LAST_BLOCK_HEIGHT, REPORTED_VALIDATOR_SET},
    },
    state_sync::SnapshotStore,
    types::{
        basic::BlockHeight,
        update_sets::AppStateUpdates,
        validator_set::{ValidatorSet, MEMBER_POWER},
    },
};

use super::{messages::*, write_updates, ApplicationError};

/// The connection through which the consensus engine initializes the chain and finalizes and
/// commits blocks.
///
/// A block is either finalized in steps (`begin_block`, `deliver_tx` for every transaction,
/// `end_block`) or in one `finalize_block`, and is then written into the key-value store by
/// `commit`. Until `commit`, no request on any connection sees the block's writes.
pub struct ConsensusConnection<K: KVStore, E: Executor> {
    kv_store: K,
    finalizer: BlockFinalizer<E>,
    genesis: Genesis,
    snapshots: SnapshotStore,
    event_publisher: Option<Sender<Event>>,
    in_progress: Option<BlockInProgress>,
    finalized: Option<FinalizedBlock>,
}

impl<K: KVStore, E: Executor> ConsensusConnection<K, E> {
    pub(crate) fn new(
        kv_store: K,
        finalizer: BlockFinalizer<E>,
        genesis: Genesis,
        snapshots: SnapshotStore,
        event_publisher: Option<Sender<Event>>,
    ) -> ConsensusConnection<K, E> {
        ConsensusConnection {
            kv_store,
            finalizer,
            genesis,
            snapshots,
            event_publisher,
            in_progress: None,
            finalized: None,
        }
    }

    /// Write the genesis state and report the genesis members as the initial validators.
    pub fn init_chain(
        &mut self,
        request: RequestInitChain,
    ) -> Result<ResponseInitChain, ApplicationError> {
        if &request.chain_id != self.finalizer.chain_id() {
            return Err(ApplicationError::ChainIdMismatch {
                expected: self.finalizer.chain_id().clone(),
                got: request.chain_id,
            });
        }
        if self.kv_store.last_app_hash()?.is_some() {
            return Err(ApplicationError::AlreadyInitialized);
        }

        let app_hash = self.genesis.app_hash();
        let validators: ValidatorSet = self.genesis.members.iter().cloned().collect();
        let mut updates = AppStateUpdates::new();
        {
            let mut state = BlockState::new(&self.kv_store, &mut updates);
            self.genesis.apply(&mut state)?;
            state.set(&REPORTED_VALIDATOR_SET, validators.try_to_vec().unwrap());
            state.set(&LAST_APP_HASH, app_hash.try_to_vec().unwrap());
            if request.initial_height.int() > 0 {
                let last = BlockHeight::new(request.initial_height.int() - 1);
                state.set(&LAST_BLOCK_HEIGHT, last.try_to_vec().unwrap());
            }
        }
        write_updates(&mut self.kv_store, &updates);

        Event::publish(
            &self.event_publisher,
            Event::InitChain(InitChainEvent {
                timestamp: SystemTime::now(),
                chain_id: request.chain_id,
                app_hash,
                members: validators.len(),
            }),
        );

        Ok(ResponseInitChain {
            app_hash,
            validators: validators
                .validators()
                .map(|account| ValidatorUpdate {
                    account: account.clone(),
                    power: MEMBER_POWER,
                })
                .collect(),
        })
    }

    pub fn begin_block(&mut self, request: RequestBeginBlock) -> Result<(), ApplicationError> {
        if self.in_progress.is_some() || self.finalized.is_some() {
            return Err(ApplicationError::OutOfOrder {
                request: "begin_block",
            });
        }
        self.in_progress = Some(self.finalizer.begin_block(&request, &self.kv_store)?);
        Ok(())
    }

    pub fn deliver_tx(&mut self, tx: &[u8]) -> Result<ResponseDeliverTx, ApplicationError> {
        let block = self
            .in_progress
            .as_mut()
            .ok_or(ApplicationError::OutOfOrder {
                request: "deliver_tx",
            })?;
        let tx_result = self.finalizer.deliver_tx(block, &self.kv_store, tx)?;
        Ok(ResponseDeliverTx { tx_result })
    }

    pub fn end_block(&mut self) -> Result<ResponseEndBlock, ApplicationError> {
        let block = self
            .in_progress
            .take()
            .ok_or(ApplicationError::OutOfOrder {
                request: "end_block",
            })?;
        let finalized = self.finalizer.end_block(block, &self.kv_store)?;
        let validator_updates = finalized.response.validator_updates.clone();
        self.finalized = Some(finalized);
        Ok(ResponseEndBlock { validator_updates })
    }

    pub fn finalize_block(
        &mut self,
        request: RequestFinalizeBlock,
    ) -> Result<ResponseFinalizeBlock, ApplicationError> {
        if self.in_progress.is_some() || self.finalized.is_some() {
            return Err(ApplicationError::OutOfOrder {
                request: "finalize_block",
            });
        }
        let finalized = self.finalizer.finalize_block(&request, &self.kv_store)?;
        let response = finalized.response.clone();
        self.finalized = Some(finalized);
        Ok(response)
    }

    /// Get the block awaiting `commit`, if any.
    pub fn pending_block(&self) -> Option<&FinalizedBlock> {
        self.finalized.as_ref()
    }

    /// Write the finalized block into the key-value store, then create a snapshot if one is due.
    pub fn commit(&mut self) -> Result<ResponseCommit, ApplicationError> {
        let finalized = self
            .finalized
            .take()
            .ok_or(ApplicationError::OutOfOrder { request: "commit" })?;
        write_updates(&mut self.kv_store, &finalized.updates);

        let height = finalized.height;
        let app_hash = finalized.response.app_hash;
        Event::publish(
            &self.event_publisher,
            Event::CommitBlock(CommitBlockEvent {
                timestamp: SystemTime::now(),
                height,
                app_hash,
            }),
        );

        let snapshot_height = if self.snapshots.is_due(height) {
            let snapshot = self.snapshots.create(&self.kv_store, height, app_hash);
            Event::publish(
                &self.event_publisher,
                Event::CreateSnapshot(CreateSnapshotEvent {
                    timestamp: SystemTime::now(),
                    height,
                    chunks: snapshot.chunks,
                }),
            );
            Some(height)
        } else {
            None
        };

        Ok(ResponseCommit { snapshot_height })
    }
}
