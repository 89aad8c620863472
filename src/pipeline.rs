/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The block finalization pipeline.
//!
//! A block is finalized in three steps, which the [consensus connection](crate::app::ConsensusConnection)
//! drives either one by one (`begin_block`, `deliver_tx` per transaction, `end_block`) or all at once
//! (`finalize_block`):
//! 1. [`BlockFinalizer::begin_block`] checks the height and anchors the block's [`HashChain`] at the
//!    previous app hash.
//! 2. [`BlockFinalizer::deliver_tx`] runs one transaction, strictly in delivery order:
//!    1. Decode it, verify its signature, chain ID and nonce. A transaction failing any of these is
//!       dropped.
//!    2. Execute it in its own [`AppStateView`]. An [`ExecuteError`] drops the transaction.
//!       Unreadable state is fatal.
//!    3. Keep its writes only if it succeeded, record its nonce, and push its result hash.
//!    4. Build its [`ExecTxResult`], with a `StateChange` event if it succeeded and wrote anything.
//! 3. [`BlockFinalizer::end_block`] pays the static rewards, computes the validator set updates,
//!    pushes the reward hash then the validator hash, and folds the chain into the app hash.
//!
//! All writes go into the block's [`AppStateUpdates`]. Nothing is written into the
//! [`KVStore`](crate::state::pluggables::KVStore) until the block is committed.
//!
//! ## Fatal errors
//!
//! A [`FinalizeError`] means this node can no longer compute the same app hash as the others, e.g.,
//! because committed state could not be read. The block must not be committed and the node must
//! stop.

use std::{
    fmt::{self, Display, Formatter},
    sync::mpsc::Sender,
    time::SystemTime,
};

use borsh::BorshSerialize;

use crate::{
    app::messages::{
        AbciEvent, EventAttribute, ExecTxResult, RequestBeginBlock, RequestFinalizeBlock,
        ResponseFinalizeBlock, TxResultData, ValidatorUpdate,
    },
    events::*,
    execution::{DispatchError, Dispatcher, ExecuteError, Executor},
    ledger::LedgerError,
    governance::members::active_members,
    hash_chain::{
        hash_from_rewards, hash_from_validator_updates, validator_update_list, HashChain,
    },
    indexer::{Indexer, TxRecord},
    nonce::{assert_next_nonce, set_nonce, NonceError},
    rewards::{RewardDistributor, RewardError},
    state::{
        app_state::{AppStateView, BlockState, KVSet},
        pluggables::{KVGet, KVGetError, Key},
        variables::{LAST_APP_HASH, LAST_BLOCK_HEIGHT, REPORTED_VALIDATOR_SET},
    },
    types::{
        basic::{Amount, BlockHeight, ChainID, CryptoHash},
        block_meta::BlockMeta,
        crypto_primitives::sha256,
        execution::{ExecutionResult, StateWrite},
        transaction::Transaction,
        update_sets::AppStateUpdates,
        validator_set::ValidatorSet,
    },
};

/// Kind of the event that lists the state writes of a successful transaction.
pub const STATE_CHANGE_EVENT: &str = "StateChange";

/// A block between `begin_block` and `end_block`.
pub struct BlockInProgress {
    meta: BlockMeta,
    chain: HashChain,
    updates: AppStateUpdates,
    tx_results: Vec<ExecTxResult>,
    dropped: usize,
}

impl BlockInProgress {
    pub fn tx_results(&self) -> &[ExecTxResult] {
        &self.tx_results
    }
}

/// A block whose app hash has been computed but which has not been committed.
#[derive(Debug)]
pub struct FinalizedBlock {
    pub height: BlockHeight,
    pub response: ResponseFinalizeBlock,
    /// Every write of the block, including the new last block height and app hash.
    pub updates: AppStateUpdates,
    pub fingerprints: Vec<CryptoHash>,
}

pub struct BlockFinalizer<E: Executor> {
    chain_id: ChainID,
    dispatcher: Dispatcher<E>,
    distributor: RewardDistributor,
    static_rewards: Option<Amount>,
    event_publisher: Option<Sender<Event>>,
    indexer: Option<Indexer>,
}

impl<E: Executor> BlockFinalizer<E> {
    pub fn new(
        chain_id: ChainID,
        dispatcher: Dispatcher<E>,
        distributor: RewardDistributor,
        static_rewards: Option<Amount>,
        event_publisher: Option<Sender<Event>>,
        indexer: Option<Indexer>,
    ) -> BlockFinalizer<E> {
        BlockFinalizer {
            chain_id,
            dispatcher,
            distributor,
            static_rewards,
            event_publisher,
            indexer,
        }
    }

    pub fn chain_id(&self) -> &ChainID {
        &self.chain_id
    }

    /// Start finalizing the block described by `header` on top of `committed`.
    pub fn begin_block(
        &self,
        header: &RequestBeginBlock,
        committed: &dyn KVGet,
    ) -> Result<BlockInProgress, FinalizeError> {
        if let Some(last) = committed.last_block_height()? {
            let expected = last + 1;
            if header.height != expected {
                return Err(FinalizeError::UnexpectedHeight {
                    expected,
                    got: header.height,
                });
            }
        }
        let previous = committed
            .last_app_hash()?
            .ok_or(KVGetError::ValueExpectedButNotFound {
                key: Key::LastAppHash,
            })?;

        Ok(BlockInProgress {
            meta: BlockMeta::new(header.time, header.height, &header.hash, self.chain_id.clone()),
            chain: HashChain::anchored_at(previous),
            updates: AppStateUpdates::new(),
            tx_results: Vec::new(),
            dropped: 0,
        })
    }

    /// Run one transaction of `block`. Returns `None` if the transaction was dropped.
    pub fn deliver_tx(
        &mut self,
        block: &mut BlockInProgress,
        committed: &dyn KVGet,
        tx_bytes: &[u8],
    ) -> Result<Option<ExecTxResult>, FinalizeError> {
        let height = block.meta.height;

        let Ok(transaction) = Transaction::decode(tx_bytes) else {
            block.dropped += 1;
            self.drop_tx(height, None, DropReason::Undecodable);
            return Ok(None);
        };
        let tx_hash = transaction.hash();
        if !transaction.verify() {
            block.dropped += 1;
            self.drop_tx(height, Some(tx_hash), DropReason::BadSignature);
            return Ok(None);
        }
        if transaction.payload.chain_id != self.chain_id {
            block.dropped += 1;
            self.drop_tx(height, Some(tx_hash), DropReason::WrongChain);
            return Ok(None);
        }

        let mut block_state = BlockState::new(committed, &mut block.updates);
        match assert_next_nonce(&block_state, transaction.sender(), transaction.nonce()) {
            Ok(()) => (),
            Err(NonceError::KVGetError(err)) => return Err(err.into()),
            Err(err) => {
                log::debug!("{}", err);
                block.dropped += 1;
                self.drop_tx(height, Some(tx_hash), DropReason::BadNonce);
                return Ok(None);
            }
        }

        let outcome = {
            let mut view = AppStateView::new(&block_state);
            self.dispatcher
                .execute(&transaction, &block.meta, &mut view)
                .map(|result| (result, view.into_updates()))
        };
        let (result, updates) = match outcome {
            Ok(outcome) => outcome,
            Err(DispatchError::KVGetError(err)) => return Err(err.into()),
            Err(DispatchError::ExecuteError(err)) => {
                let reason = match err {
                    ExecuteError::EngineFault(reason) => DropReason::EngineFault(reason),
                    ExecuteError::Rejected(reason) => DropReason::Rejected(reason),
                };
                block.dropped += 1;
                self.drop_tx(height, Some(tx_hash), reason);
                return Ok(None);
            }
        };

        if result.is_success() {
            block_state.absorb(updates);
        }
        set_nonce(&mut block_state, transaction.sender(), transaction.nonce())?;
        block.chain.push(result.hash);

        let tx_result = exec_tx_result(&result);
        block.tx_results.push(tx_result.clone());

        Event::publish(
            &self.event_publisher,
            Event::ExecuteTx(ExecuteTxEvent {
                timestamp: SystemTime::now(),
                height,
                transaction: tx_hash,
                status: result.status,
                stamps_used: result.stamps_used,
            }),
        );

        if let Some(indexer) = &self.indexer {
            indexer.insert(TxRecord {
                height,
                block_time: block.meta.nanos,
                hash: sha256(tx_bytes).to_hex().to_uppercase(),
                transaction,
                result,
            });
        }

        Ok(Some(tx_result))
    }

    /// Finish `block`, computing its validator set updates and app hash.
    pub fn end_block(
        &mut self,
        mut block: BlockInProgress,
        committed: &dyn KVGet,
    ) -> Result<FinalizedBlock, FinalizeError> {
        let height = block.meta.height;
        let mut block_state = BlockState::new(committed, &mut block.updates);

        let reward_writes = match self.static_rewards {
            None => Vec::new(),
            Some(pool) => {
                let mut view = AppStateView::new(&block_state);
                match self.distributor.distribute(&mut view, pool) {
                    Ok(payouts) => {
                        let writes = view.take_writes();
                        let updates = view.into_updates();
                        block_state.absorb(updates);
                        Event::publish(
                            &self.event_publisher,
                            Event::DistributeRewards(DistributeRewardsEvent {
                                timestamp: SystemTime::now(),
                                height,
                                pool,
                                payouts,
                            }),
                        );
                        writes
                    }
                    Err(RewardError::KVGetError(err))
                    | Err(RewardError::LedgerError(LedgerError::KVGetError(err))) => {
                        return Err(err.into())
                    }
                    Err(err) => {
                        log::error!("Skipping rewards of block {}: {}", height, err);
                        Event::publish(
                            &self.event_publisher,
                            Event::SkipRewards(SkipRewardsEvent {
                                timestamp: SystemTime::now(),
                                height,
                                error: err.to_string(),
                            }),
                        );
                        Vec::<StateWrite>::new()
                    }
                }
            }
        };
        block.chain.push(hash_from_rewards(&reward_writes));

        let reported = block_state.reported_validator_set()?;
        let active: ValidatorSet = active_members(&block_state)?.into_iter().collect();
        let validator_set_updates = reported.diff(&active);
        if !validator_set_updates.is_empty() {
            block_state.set(&REPORTED_VALIDATOR_SET, active.try_to_vec().unwrap());
        }
        block.chain.push(hash_from_validator_updates(&validator_set_updates));

        let app_hash = block.chain.app_hash();
        block_state.set(&LAST_BLOCK_HEIGHT, height.try_to_vec().unwrap());
        block_state.set(&LAST_APP_HASH, app_hash.try_to_vec().unwrap());

        let validator_updates = validator_update_list(&validator_set_updates)
            .into_iter()
            .map(|(account, power)| ValidatorUpdate { account, power })
            .collect();

        if let Some(indexer) = &self.indexer {
            indexer.commit(height);
        }
        if !validator_set_updates.is_empty() {
            Event::publish(
                &self.event_publisher,
                Event::UpdateValidatorSet(UpdateValidatorSetEvent {
                    timestamp: SystemTime::now(),
                    height,
                    validator_set_updates,
                }),
            );
        }
        Event::publish(
            &self.event_publisher,
            Event::FinalizeBlock(FinalizeBlockEvent {
                timestamp: SystemTime::now(),
                height,
                app_hash,
                executed: block.tx_results.len(),
                dropped: block.dropped,
            }),
        );

        Ok(FinalizedBlock {
            height,
            response: ResponseFinalizeBlock {
                tx_results: block.tx_results,
                validator_updates,
                app_hash,
            },
            updates: block.updates,
            fingerprints: block.chain.into_fingerprints(),
        })
    }

    /// Run `begin_block`, `deliver_tx` for every transaction in order, then `end_block`.
    pub fn finalize_block(
        &mut self,
        request: &RequestFinalizeBlock,
        committed: &dyn KVGet,
    ) -> Result<FinalizedBlock, FinalizeError> {
        let mut block = self.begin_block(&request.header(), committed)?;
        for tx_bytes in &request.txs {
            self.deliver_tx(&mut block, committed, tx_bytes)?;
        }
        self.end_block(block, committed)
    }

    fn drop_tx(&self, height: BlockHeight, transaction: Option<CryptoHash>, reason: DropReason) {
        let tx = transaction.map_or_else(|| String::from("-"), |hash| hash.to_hex());
        match &reason {
            DropReason::EngineFault(_) => {
                log::error!("Dropping tx {} of block {}: {}", tx, height, reason)
            }
            DropReason::Rejected(_) => log::warn!("Dropping tx {} of block {}: {}", tx, height, reason),
            _ => log::debug!("Dropping tx {} of block {}: {}", tx, height, reason),
        }
        Event::publish(
            &self.event_publisher,
            Event::DropTx(DropTxEvent {
                timestamp: SystemTime::now(),
                height,
                transaction,
                reason,
            }),
        );
    }
}

/// Build the response entry of an executed transaction.
pub fn exec_tx_result(result: &ExecutionResult) -> ExecTxResult {
    let data = serde_json::to_vec(&TxResultData::from(result)).unwrap_or_default();
    let mut events = Vec::new();
    if result.is_success() && !result.state_writes.is_empty() {
        events.push(AbciEvent {
            kind: STATE_CHANGE_EVENT.to_string(),
            attributes: result
                .state_writes
                .iter()
                .map(|write| EventAttribute {
                    key: event_key(&write.key),
                    value: write
                        .value
                        .as_ref()
                        .map_or_else(|| String::from("null"), |value| value.render()),
                    index: true,
                })
                .collect(),
        });
    }
    ExecTxResult {
        code: result.status,
        data,
        gas_used: result.stamps_used,
        events,
    }
}

/// Encode a state key for use as an event attribute key: `.` becomes `_`, `:` becomes `__`.
pub fn event_key(key: &str) -> String {
    key.replace('.', "_").replace(':', "__")
}

#[derive(Debug)]
pub enum FinalizeError {
    KVGetError(KVGetError),
    NonceError(NonceError),
    UnexpectedHeight {
        expected: BlockHeight,
        got: BlockHeight,
    },
}

impl From<KVGetError> for FinalizeError {
    fn from(value: KVGetError) -> Self {
        FinalizeError::KVGetError(value)
    }
}

impl From<NonceError> for FinalizeError {
    fn from(value: NonceError) -> Self {
        FinalizeError::NonceError(value)
    }
}

impl Display for FinalizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FinalizeError::KVGetError(err) => write!(f, "{}", err),
            FinalizeError::NonceError(err) => write!(f, "{}", err),
            FinalizeError::UnexpectedHeight { expected, got } => {
                write!(f, "Expected block at height {}, got {}", expected, got)
            }
        }
    }
}
