/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that store information about validator sets or updates to validator sets.

use std::collections::{btree_set, BTreeSet};

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    basic::{AccountId, Power},
    update_sets::ValidatorSetUpdates,
};

/// Voting power given to every active member. All members weigh the same.
pub const MEMBER_POWER: Power = Power::new(10);

/// Ordered set of the accounts of validators.
///
/// ## Ordering of validators
///
/// `ValidatorSet` maintains validators in ascending order of their `AccountId`s, so that
/// [`diff`](Self::diff) produces the same sequence of updates on every node.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ValidatorSet {
    validators: BTreeSet<AccountId>,
}

impl ValidatorSet {
    /// Create an empty validator set.
    pub fn new() -> ValidatorSet {
        Self {
            validators: BTreeSet::new(),
        }
    }

    /// Get an iterator through the validators in ascending order.
    pub fn validators(&self) -> btree_set::Iter<AccountId> {
        self.validators.iter()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Compute the updates that turn this validator set into `next`: every validator only in `next`
    /// is inserted with [`MEMBER_POWER`], every validator only in `self` is deleted.
    pub fn diff(&self, next: &ValidatorSet) -> ValidatorSetUpdates {
        let mut updates = ValidatorSetUpdates::new();
        for added in next.validators.difference(&self.validators) {
            updates.insert(added.clone(), MEMBER_POWER);
        }
        for removed in self.validators.difference(&next.validators) {
            updates.delete(removed.clone());
        }
        updates
    }
}

impl FromIterator<AccountId> for ValidatorSet {
    fn from_iter<I: IntoIterator<Item = AccountId>>(iter: I) -> Self {
        ValidatorSet {
            validators: iter.into_iter().collect(),
        }
    }
}
