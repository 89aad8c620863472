/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that store updates to the app state and to the validator set.

use std::collections::{btree_map, btree_set, BTreeMap, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};

use super::basic::{AccountId, Power};

/// Generic set of key-value updates that are committed together.
///
/// This generic type currently forms the basis of two concrete types: [`AppStateUpdates`] and
/// [`ValidatorSetUpdates`].
///
/// # Uniqueness of Key between `inserts` and `deletes`
///
/// A key is never scheduled for insertion and deletion at the same time: the most recent of
/// [`insert`](Self::insert) and [`delete`](Self::delete) wins.
///
/// # Ordering
///
/// Both `inserts` and `deletes` are iterated in ascending key order, so iterating an `UpdateSet`
/// gives the same sequence on every node.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UpdateSet<K: Ord, V> {
    inserts: BTreeMap<K, V>,
    deletes: BTreeSet<K>,
}

impl<K: Ord, V> Default for UpdateSet<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> UpdateSet<K, V> {
    /// Create a new `UpdateSet` with empty `inserts` and `deletes`.
    pub fn new() -> Self {
        Self {
            inserts: BTreeMap::new(),
            deletes: BTreeSet::new(),
        }
    }

    /// Schedule the insertion of a `key`-`value` pair.
    ///
    /// This cancels the deletion of `key`, if it has been scheduled using [`delete`](Self::delete).
    pub fn insert(&mut self, key: K, value: V) {
        self.deletes.remove(&key);
        self.inserts.insert(key, value);
    }

    /// Schedule the deletion of `key`.
    ///
    /// This cancels the insertion of `key`, if it has been scheduled using [`insert`](Self::insert).
    pub fn delete(&mut self, key: K) {
        self.inserts.remove(&key);
        self.deletes.insert(key);
    }

    /// Get whether the `UpdateSet` is scheduled to insert a value to `key`, and if so, returns a
    /// reference to that value.
    pub fn get_insert(&self, key: &K) -> Option<&V> {
        self.inserts.get(key)
    }

    /// Check whether the `UpdateSet` is scheduled to delete `key`.
    pub fn contains_delete(&self, key: &K) -> bool {
        self.deletes.contains(key)
    }

    /// Get an iterator over all of the key-value pairs that this `UpdateSet` will insert.
    pub fn inserts(&self) -> btree_map::Iter<K, V> {
        self.inserts.iter()
    }

    /// Get an iterator over all of the keys that this `UpdateSet` will delete.
    pub fn deletes(&self) -> btree_set::Iter<K> {
        self.deletes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }

    /// Apply all of the updates in `newer` on top of this `UpdateSet`, as if they were scheduled after
    /// every update already in it.
    pub fn merge(&mut self, newer: UpdateSet<K, V>) {
        for key in newer.deletes {
            self.inserts.remove(&key);
            self.deletes.insert(key);
        }
        for (key, value) in newer.inserts {
            self.deletes.remove(&key);
            self.inserts.insert(key, value);
        }
    }
}

/// Set of raw key-value updates to the key-value store, applied atomically when a block is committed.
pub type AppStateUpdates = UpdateSet<Vec<u8>, Vec<u8>>;

/// Set of updates to the validator set reported to the consensus engine.
pub type ValidatorSetUpdates = UpdateSet<AccountId, Power>;
