/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Layered, writable views of the app state used while a block is being finalized.
//!
//! Nothing is written into the [`KVStore`](super::pluggables::KVStore) until commit. Until then:
//! 1. [`BlockState`] layers the [`AppStateUpdates`] of the block in progress over the committed state.
//! 2. [`AppStateView`] layers the updates of a single transaction (or of the block rewards) over a
//!    `BlockState`. Its updates are merged into the block only if the transaction succeeds, which is
//!    how a failed transaction's writes are rolled back.
//! 3. [`ContractState`] narrows an `AppStateView` to what an external executor may do: read
//!    anything, and write app state outside of the [protected contracts](super::variables::PROTECTED_CONTRACTS).

use std::fmt::{self, Display, Formatter};

use borsh::BorshSerialize;

use crate::types::{execution::StateWrite, update_sets::AppStateUpdates, value::Value};

use super::{
    pluggables::KVGet,
    variables::{app_state_key, is_protected},
};

/// Write access to a layered state.
pub trait KVSet: KVGet {
    fn set(&mut self, key: &[u8], value: Vec<u8>);
    fn delete(&mut self, key: &[u8]);

    /// Set (or with `None`, delete) the app state value at `key`.
    fn set_value(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(value) => self.set(&app_state_key(key), value.try_to_vec().unwrap()),
            None => self.delete(&app_state_key(key)),
        }
    }
}

fn layered_get(updates: &AppStateUpdates, base: &dyn KVGet, key: &[u8]) -> Option<Vec<u8>> {
    let key = key.to_vec();
    if updates.contains_delete(&key) {
        None
    } else if let Some(value) = updates.get_insert(&key) {
        Some(value.clone())
    } else {
        base.get(&key)
    }
}

/// Committed state with the pending updates of the block in progress applied on top.
pub struct BlockState<'a> {
    committed: &'a dyn KVGet,
    updates: &'a mut AppStateUpdates,
}

impl<'a> BlockState<'a> {
    pub fn new(committed: &'a dyn KVGet, updates: &'a mut AppStateUpdates) -> BlockState<'a> {
        BlockState { committed, updates }
    }

    /// Apply updates produced by an [`AppStateView`] over this block state.
    pub fn absorb(&mut self, updates: AppStateUpdates) {
        self.updates.merge(updates)
    }
}

impl KVGet for BlockState<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        layered_get(self.updates, self.committed, key)
    }
}

impl KVSet for BlockState<'_> {
    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.updates.insert(key.to_vec(), value)
    }

    fn delete(&mut self, key: &[u8]) {
        self.updates.delete(key.to_vec())
    }
}

/// Discardable layer of updates over another state, recording every app state write made through
/// [`set_value`](KVSet::set_value) in order.
pub struct AppStateView<'a> {
    base: &'a dyn KVGet,
    updates: AppStateUpdates,
    writes: Vec<StateWrite>,
}

impl<'a> AppStateView<'a> {
    pub fn new(base: &'a dyn KVGet) -> AppStateView<'a> {
        AppStateView {
            base,
            updates: AppStateUpdates::new(),
            writes: Vec::new(),
        }
    }

    /// Take the writes recorded since the last call to `take_writes`.
    pub fn take_writes(&mut self) -> Vec<StateWrite> {
        std::mem::take(&mut self.writes)
    }

    /// Consume the view, returning the updates to apply to its base.
    pub fn into_updates(self) -> AppStateUpdates {
        self.updates
    }
}

impl KVGet for AppStateView<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        layered_get(&self.updates, self.base, key)
    }
}

impl KVSet for AppStateView<'_> {
    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.updates.insert(key.to_vec(), value)
    }

    fn delete(&mut self, key: &[u8]) {
        self.updates.delete(key.to_vec())
    }

    fn set_value(&mut self, key: &str, value: Option<Value>) {
        let key_bytes = app_state_key(key);
        match &value {
            Some(value) => self.set(&key_bytes, value.try_to_vec().unwrap()),
            None => self.delete(&key_bytes),
        }
        self.writes.push(StateWrite {
            key: key.to_string(),
            value,
        });
    }
}

/// The state an [`Executor`](crate::execution::Executor) runs a transaction against.
pub struct ContractState<'v, 's> {
    view: &'v mut AppStateView<'s>,
}

impl<'v, 's> ContractState<'v, 's> {
    pub(crate) fn new(view: &'v mut AppStateView<'s>) -> ContractState<'v, 's> {
        ContractState { view }
    }

    /// Set (or with `None`, delete) the app state value at `key`.
    pub fn set_value(&mut self, key: &str, value: Option<Value>) -> Result<(), WriteDenied> {
        if is_protected(key) {
            return Err(WriteDenied {
                key: key.to_string(),
            });
        }
        self.view.set_value(key, value);
        Ok(())
    }

    /// Take the writes recorded since the last call to `take_writes`.
    pub fn take_writes(&mut self) -> Vec<StateWrite> {
        self.view.take_writes()
    }
}

impl KVGet for ContractState<'_, '_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.view.get(key)
    }
}

/// An executor tried to write app state that only governance may write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteDenied {
    pub key: String,
}

impl Display for WriteDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot write protected key {}", self.key)
    }
}
