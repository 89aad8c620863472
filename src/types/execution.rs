/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The outcome of executing a single transaction.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;

use super::{
    basic::{CryptoHash, Stamps},
    crypto_primitives::{CryptoHasher, Digest},
    transaction::Transaction,
    value::Value,
};

/// Status code of a successfully executed transaction. Any other status means the transaction was
/// rejected and its state writes were rolled back.
pub const STATUS_SUCCESS: u32 = 0;

/// Status code of a transaction that was executed but failed.
pub const STATUS_FAILURE: u32 = 1;

/// A write into contract-scoped app state. A `value` of `None` is a deletion.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct StateWrite {
    pub key: String,
    pub value: Option<Value>,
}

/// Result of executing one transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ExecutionResult {
    pub status: u32,
    pub result: Value,
    pub state_writes: Vec<StateWrite>,
    pub stamps_used: Stamps,
    pub hash: CryptoHash,
}

impl ExecutionResult {
    /// Create an `ExecutionResult`, computing its `hash` with [`result_hash`](Self::result_hash).
    pub fn new(
        transaction: &Transaction,
        status: u32,
        result: Value,
        state_writes: Vec<StateWrite>,
        stamps_used: Stamps,
    ) -> ExecutionResult {
        let hash = Self::result_hash(transaction, status, &result, &state_writes, stamps_used);
        ExecutionResult {
            status,
            result,
            state_writes,
            stamps_used,
            hash,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Compute the hash committing to the outcome of `transaction`.
    pub fn result_hash(
        transaction: &Transaction,
        status: u32,
        result: &Value,
        state_writes: &[StateWrite],
        stamps_used: Stamps,
    ) -> CryptoHash {
        let mut hasher = CryptoHasher::new();
        hasher.update(&transaction.hash().bytes());
        hasher.update(&status.to_le_bytes());
        hasher.update(&result.try_to_vec().unwrap());
        hasher.update(&state_writes.try_to_vec().unwrap());
        hasher.update(&stamps_used.to_le_bytes());
        CryptoHash::new(hasher.finalize().into())
    }

    /// Recompute `hash` after `state_writes` or `stamps_used` were amended.
    pub(crate) fn rehash(&mut self, transaction: &Transaction) {
        self.hash = Self::result_hash(
            transaction,
            self.status,
            &self.result,
            &self.state_writes,
            self.stamps_used,
        );
    }
}
