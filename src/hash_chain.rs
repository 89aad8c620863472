/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Folding of a block's fingerprint list into its app hash.
//!
//! ## Fingerprint list
//!
//! The fingerprint list of a block is, in order:
//! 1. The app hash of the previous block (or the genesis app hash).
//! 2. The result hash of every transaction that was executed, in delivery order.
//! 3. The hash of the block's reward writes ([`hash_from_rewards`]).
//! 4. The hash of the block's validator set updates ([`hash_from_validator_updates`]).
//!
//! ## Folding
//!
//! [`fold`] feeds every item into one SHA256 hasher, each prefixed by its length as a little-endian
//! `u64`. The length prefix makes the fold injective over sequences: `[ab, c]` and `[a, bc]` fold
//! differently. The fold of an empty sequence is [`EMPTY_FOLD`], the SHA256 hash of no bytes.

use borsh::BorshSerialize;

use crate::types::{
    basic::{AccountId, CryptoHash, Power},
    crypto_primitives::{sha256, CryptoHasher, Digest},
    execution::StateWrite,
    update_sets::ValidatorSetUpdates,
};

/// SHA256 of the empty byte string.
pub const EMPTY_FOLD: CryptoHash = CryptoHash::new([
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
]);

/// Fold an ordered sequence of byte strings into one hash.
pub fn fold<I, B>(items: I) -> CryptoHash
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut items = items.into_iter().peekable();
    if items.peek().is_none() {
        return EMPTY_FOLD;
    }

    let mut hasher = CryptoHasher::new();
    for item in items {
        let item = item.as_ref();
        hasher.update((item.len() as u64).to_le_bytes());
        hasher.update(item);
    }
    CryptoHash::new(hasher.finalize().into())
}

/// Append-only fingerprint list of the block in progress.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HashChain {
    fingerprints: Vec<CryptoHash>,
}

impl HashChain {
    /// Start the fingerprint list of a block that extends the block whose app hash is `previous`.
    pub fn anchored_at(previous: CryptoHash) -> HashChain {
        HashChain {
            fingerprints: vec![previous],
        }
    }

    pub fn push(&mut self, fingerprint: CryptoHash) {
        self.fingerprints.push(fingerprint)
    }

    /// Fold the fingerprint list.
    pub fn app_hash(&self) -> CryptoHash {
        fold(&self.fingerprints)
    }

    pub fn into_fingerprints(self) -> Vec<CryptoHash> {
        self.fingerprints
    }
}

/// Commitment to the writes made by the reward distributor in a block. A block that pays no rewards
/// commits to the empty list of writes.
pub fn hash_from_rewards(writes: &[StateWrite]) -> CryptoHash {
    sha256(&writes.try_to_vec().unwrap())
}

/// Flatten `updates` into the list reported to the consensus engine: insertions in ascending order
/// of account, then deletions (power 0) in ascending order of account.
pub fn validator_update_list(updates: &ValidatorSetUpdates) -> Vec<(AccountId, Power)> {
    updates
        .inserts()
        .map(|(account, power)| (account.clone(), *power))
        .chain(
            updates
                .deletes()
                .map(|account| (account.clone(), Power::new(0))),
        )
        .collect()
}

/// Commitment to the validator set updates of a block.
pub fn hash_from_validator_updates(updates: &ValidatorSetUpdates) -> CryptoHash {
    sha256(&validator_update_list(updates).try_to_vec().unwrap())
}
