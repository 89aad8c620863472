/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes and string keys that specify where each state variable is stored in the
//! user-provided key-value store.
//!
//! # List of State Variables
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |App State|[`String`] -> [`Value`](crate::types::value::Value)|Contract-scoped state. Keys have the form `{contract}.{variable}` or `{contract}.{variable}:{key}`. Balances, governance records and chain parameters all live here.|
//! |Nonces|[`AccountId`](crate::types::basic::AccountId) -> [`u64`]|Nonce of the latest transaction of each account that was delivered through the consensus channel.|
//! |Last Block Height|[`BlockHeight`](crate::types::basic::BlockHeight)|Height of the latest committed block. Not set before the first commit.|
//! |Last App Hash|[`CryptoHash`](crate::types::basic::CryptoHash)|App hash of the latest committed block, or the genesis app hash.|
//! |Reported Validator Set|[`ValidatorSet`](crate::types::validator_set::ValidatorSet)|The validator set as last reported to the consensus engine.|
//!
//! # Persistence of state variables
//!
//! Single values are stored Borsh-serialized at one-byte, constant keys sharing the variable's name.
//!
//! Mappings are stored in multiple keys, each being the concatenation of the variable's one-byte
//! prefix and the UTF-8 bytes of the mapping's key. For example, the balance of account `alice` in
//! the native currency is stored at:
//!
//! ```
//! # use stampchain::state::variables::{APP_STATE, concat};
//! let key = concat(&APP_STATE, "currency.balances:alice".as_bytes());
//! ```

use crate::types::basic::{AccountId, ProposalId};

// State variables
pub const APP_STATE: [u8; 1] = [0];
pub const NONCES: [u8; 1] = [1];
pub const LAST_BLOCK_HEIGHT: [u8; 1] = [2];
pub const LAST_APP_HASH: [u8; 1] = [3];
pub const REPORTED_VALIDATOR_SET: [u8; 1] = [4];

// Chain parameters in app state
pub const STAMP_COST: &str = "stamp_cost.S:value";
pub const REWARD_SPLIT: &str = "rewards.S:value";
pub const REGISTRATION_FEE: &str = "members.registration_fee";
pub const VOTE_TYPES: &str = "members.types";

// Governance records in app state
pub const MEMBER_NODES: &str = "members.nodes";
pub const TOTAL_VOTES: &str = "members.total_votes";

/// Contracts whose app state only governance writes.
pub const PROTECTED_CONTRACTS: [&str; 3] = ["members", "stamp_cost", "rewards"];

/// Whether the app state `key` belongs to one of the [`PROTECTED_CONTRACTS`].
pub fn is_protected(key: &str) -> bool {
    let contract = key.split('.').next().unwrap_or(key);
    PROTECTED_CONTRACTS.contains(&contract)
}

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}

pub fn app_state_key(key: &str) -> Vec<u8> {
    concat(&APP_STATE, key.as_bytes())
}

pub fn nonce_key(account: &AccountId) -> Vec<u8> {
    concat(&NONCES, account.as_str().as_bytes())
}

/// App state key of `account`'s balance in the currency kept by `contract`.
pub fn balance_key(contract: &str, account: &AccountId) -> String {
    format!("{}.balances:{}", contract, account)
}

pub fn member_key(account: &AccountId) -> String {
    format!("members.member:{}", account)
}

pub fn proposal_key(proposal: ProposalId) -> String {
    format!("members.votes:{}", proposal)
}
