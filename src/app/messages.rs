/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Requests and responses exchanged with the consensus engine over the four connections.
//!
//! These are transport-agnostic: a server that speaks the consensus engine's wire protocol
//! translates its messages from and into these types.

use serde::Serialize;

use crate::{
    state_sync::Snapshot,
    types::{
        basic::{AccountId, BlockHeight, ChainID, CryptoHash, Power, Stamps, Timestamp},
        execution::{ExecutionResult, StateWrite},
        value::Value,
    },
};

/// Response code of every successful request.
pub const CODE_OK: u32 = 0;

/// Response code of a `check_tx` for a transaction that can never be included in a block.
pub const CODE_REJECTED: u32 = 1;

/// Response code of a `query` that failed.
pub const CODE_QUERY_FAILED: u32 = 2;

/* ↓↓↓ Consensus connection ↓↓↓ */

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestInitChain {
    pub chain_id: ChainID,
    pub time: Timestamp,
    pub initial_height: BlockHeight,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseInitChain {
    pub app_hash: CryptoHash,
    pub validators: Vec<ValidatorUpdate>,
}

/// Header of the block about to be finalized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestBeginBlock {
    pub time: Timestamp,
    pub height: BlockHeight,
    pub hash: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestFinalizeBlock {
    pub time: Timestamp,
    pub height: BlockHeight,
    pub hash: Vec<u8>,
    pub txs: Vec<Vec<u8>>,
}

impl RequestFinalizeBlock {
    pub(crate) fn header(&self) -> RequestBeginBlock {
        RequestBeginBlock {
            time: self.time,
            height: self.height,
            hash: self.hash.clone(),
        }
    }
}

/// Outcome of one transaction that was included in a block. Dropped transactions have none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecTxResult {
    /// The execution status of the transaction.
    pub code: u32,
    /// JSON encoding of the execution result. See [`TxResultData`].
    pub data: Vec<u8>,
    pub gas_used: Stamps,
    pub events: Vec<AbciEvent>,
}

/// The JSON document carried in [`ExecTxResult::data`].
#[derive(Serialize)]
pub struct TxResultData<'a> {
    pub status: u32,
    pub result: &'a Value,
    pub state: &'a [StateWrite],
    pub stamps_used: Stamps,
    pub hash: String,
}

impl<'a> From<&'a ExecutionResult> for TxResultData<'a> {
    fn from(result: &'a ExecutionResult) -> Self {
        TxResultData {
            status: result.status,
            result: &result.result,
            state: &result.state_writes,
            stamps_used: result.stamps_used,
            hash: result.hash.to_hex(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbciEvent {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
    pub index: bool,
}

/// A change to the validator set. A power of 0 removes the validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorUpdate {
    pub account: AccountId,
    pub power: Power,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseDeliverTx {
    /// `None` if the transaction was dropped.
    pub tx_result: Option<ExecTxResult>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseEndBlock {
    pub validator_updates: Vec<ValidatorUpdate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseFinalizeBlock {
    pub tx_results: Vec<ExecTxResult>,
    pub validator_updates: Vec<ValidatorUpdate>,
    pub app_hash: CryptoHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseCommit {
    /// Height of the snapshot created by this commit, if any.
    pub snapshot_height: Option<BlockHeight>,
}

/* ↓↓↓ Mempool connection ↓↓↓ */

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseCheckTx {
    pub code: u32,
    pub log: String,
}

/* ↓↓↓ Info connection ↓↓↓ */

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseInfo {
    pub version: String,
    pub last_block_height: BlockHeight,
    /// Empty before `init_chain`.
    pub last_block_app_hash: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestQuery {
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseQuery {
    pub code: u32,
    /// JSON.
    pub value: Vec<u8>,
    pub log: String,
    pub height: BlockHeight,
}

/* ↓↓↓ State sync connection ↓↓↓ */

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseListSnapshots {
    pub snapshots: Vec<Snapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOfferSnapshot {
    pub snapshot: Snapshot,
    pub app_hash: CryptoHash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferSnapshotResult {
    Accept,
    Reject,
    RejectFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestLoadSnapshotChunk {
    pub height: BlockHeight,
    pub format: u32,
    pub chunk: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseLoadSnapshotChunk {
    /// Empty if the chunk does not exist.
    pub chunk: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestApplySnapshotChunk {
    pub index: u32,
    pub chunk: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplySnapshotChunkResult {
    Accept,
    /// Every staged chunk was discarded. The snapshot must be offered again.
    RejectSnapshot,
    RetryChunk,
}
