/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Chain-wide economic and governance parameters.
//!
//! Every parameter defined here is consensus-relevant and can only be changed by a finalized
//! governance proposal of the matching type.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

use super::{basic::Amount, value::Value};

/// Denominator of a [`Ratio`]: ratios are expressed in parts per million.
pub const RATIO_DENOMINATOR: u64 = 1_000_000;

/// Number of buckets in a [`RewardSplit`].
pub const REWARD_BUCKETS: usize = 4;

/// A fraction in `[0, 1]`, in parts per million. Fixed-point so that every node computes the exact
/// same payouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Ratio(u64);

impl Ratio {
    /// Create a `Ratio` of `parts_per_million` / 1,000,000.
    pub const fn from_ppm(parts_per_million: u64) -> Ratio {
        Ratio(parts_per_million)
    }

    pub const fn ppm(&self) -> u64 {
        self.0
    }

    /// Get `amount` scaled by this ratio, rounded down.
    pub fn of(&self, amount: Amount) -> Amount {
        (amount as u128 * self.0 as u128 / RATIO_DENOMINATOR as u128) as Amount
    }
}

/// How rewards and fees are split between the four reward buckets, in order: validators, foundation,
/// developers, burn.
///
/// ## Invariant
///
/// Exactly four ratios that sum to exactly 1 ([`RATIO_DENOMINATOR`] parts per million). This is
/// checked in every constructor, including when a `reward_change` proposal is created.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RewardSplit([Ratio; REWARD_BUCKETS]);

impl RewardSplit {
    /// Create a `RewardSplit` from four ratios in parts per million.
    pub fn new(ppm: [u64; REWARD_BUCKETS]) -> Result<RewardSplit, ParamsError> {
        let sum: u64 = ppm.iter().try_fold(0u64, |acc, r| acc.checked_add(*r)).ok_or(
            ParamsError::RewardSplitSum { sum: u64::MAX },
        )?;
        if sum != RATIO_DENOMINATOR {
            return Err(ParamsError::RewardSplitSum { sum });
        }
        Ok(RewardSplit(ppm.map(Ratio::from_ppm)))
    }

    /// Parse a `RewardSplit` from a `Value::List` of four integers in parts per million.
    pub fn from_value(value: &Value) -> Result<RewardSplit, ParamsError> {
        let list = value.as_list().ok_or(ParamsError::NotAList)?;
        if list.len() != REWARD_BUCKETS {
            return Err(ParamsError::RewardSplitLength { len: list.len() });
        }
        let mut ppm = [0u64; REWARD_BUCKETS];
        for (slot, ratio) in ppm.iter_mut().zip(list) {
            *slot = ratio.as_u64().ok_or(ParamsError::NotARatio)?;
        }
        RewardSplit::new(ppm)
    }

    pub fn to_value(&self) -> Value {
        Value::List(self.0.iter().map(|r| Value::from(r.ppm())).collect())
    }

    pub fn validators(&self) -> Ratio {
        self.0[0]
    }

    pub fn foundation(&self) -> Ratio {
        self.0[1]
    }

    pub fn developers(&self) -> Ratio {
        self.0[2]
    }
}

/// The vote-type catalog a fresh chain starts with.
pub fn default_vote_types() -> Vec<String> {
    [
        "add_member",
        "remove_member",
        "change_registration_fee",
        "reward_change",
        "dao_payout",
        "stamp_cost_change",
        "change_types",
        "create_stream",
        "change_close_time",
        "finalize_stream",
        "close_balance_finalize",
        "topic_vote",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Snapshot of all governed chain parameters.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ChainParameters {
    /// Fee locked by an account when it registers as a member candidate.
    pub registration_fee: Amount,
    /// Stamps bought by one unit of the native currency. Never zero.
    pub stamp_cost: u64,
    pub reward_split: RewardSplit,
    /// Catalog of `type_of_vote`s that proposals may use.
    pub vote_types: Vec<String>,
}

impl ChainParameters {
    pub fn to_value(&self) -> Value {
        Value::map()
            .with("registration_fee", self.registration_fee)
            .with("stamp_cost", self.stamp_cost)
            .with("reward_split", self.reward_split.to_value())
            .with("vote_types", self.vote_types.clone())
    }
}

/// Reasons why a value cannot be used as a chain parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    NotAList,
    NotARatio,
    RewardSplitLength { len: usize },
    RewardSplitSum { sum: u64 },
    ZeroStampCost,
    EmptyVoteTypes,
}

impl Display for ParamsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParamsError::NotAList => write!(f, "Expected a list"),
            ParamsError::NotARatio => write!(f, "Ratios must be non-negative integers (parts per million)"),
            ParamsError::RewardSplitLength { len } => {
                write!(f, "Reward split must have {} ratios, got {}", REWARD_BUCKETS, len)
            }
            ParamsError::RewardSplitSum { sum } => {
                write!(f, "Reward split must sum to {}, got {}", RATIO_DENOMINATOR, sum)
            }
            ParamsError::ZeroStampCost => write!(f, "Stamp cost must be positive"),
            ParamsError::EmptyVoteTypes => write!(f, "Vote type catalog must not be empty"),
        }
    }
}
