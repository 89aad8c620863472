/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Configuration of an [`Application`](crate::app::Application) and of the chain it starts.
//!
//! [`Configuration`] holds node-local settings: which chain to serve, whether to charge fees and
//! pay rewards, how often to cut snapshots. [`Genesis`] holds the initial chain state, and must be
//! identical on every node of a chain.

use std::time::Duration;

use borsh::BorshSerialize;
use typed_builder::TypedBuilder;

use crate::{
    governance::{members::seed_members, GovernanceConfig},
    hash_chain::fold,
    ledger::{Ledger, LedgerError},
    rewards::RewardRecipients,
    state::{app_state::KVSet, variables},
    types::{
        basic::{AccountId, Amount, ChainID, CryptoHash},
        params::{default_vote_types, ParamsError, RewardSplit},
        value::Value,
    },
};

const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Stores the user-defined parameters required to run an application.
///
/// ## Log events
///
/// If `log_events` is set, every [event](crate::events) is printed by its
/// [default logger](crate::logging). Logs are emitted through the [log](https://docs.rs/log) facade,
/// so an implementation such as [`setup_logger`](crate::logging::setup_logger) must be installed for
/// them to be visible.
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.chain_id(...)`
    - `.foundation(...)`
    - `.developers(...)`
    - `.log_events(...)`

    Optional:
    - `.enable_tx_fee(...)`
    - `.static_rewards(...)`
    - `.proposal_expiry(...)`
    - `.leave_cooldown(...)`
    - `.block_service_mode(...)`
    - `.snapshot_interval(...)`
    - `.snapshot_chunk_size(...)`
    - `.snapshot_keep_recent(...)`
    - `.snapshot_max_size(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the chain ID of the chain this application serves. Transactions for other chains are dropped. Required."))]
    pub chain_id: ChainID,
    #[builder(setter(doc = "Set the account that receives the foundation bucket of every reward pool. Required."))]
    pub foundation: AccountId,
    #[builder(setter(doc = "Set the account that receives the developer bucket of every reward pool. Required."))]
    pub developers: AccountId,
    #[builder(setter(doc = "Set whether the default logger of every event is enabled. Required."))]
    pub log_events: bool,
    #[builder(default = false, setter(doc = "Set whether successful transactions are charged fees in the native currency. Defaults to `false`."))]
    pub enable_tx_fee: bool,
    #[builder(default, setter(strip_option, doc = "Set the amount minted and distributed at the end of every block. Defaults to no static rewards."))]
    pub static_rewards: Option<Amount>,
    #[builder(default = WEEK, setter(doc = "Set how long a proposal accepts ballots. Defaults to 7 days."))]
    pub proposal_expiry: Duration,
    #[builder(default = WEEK, setter(doc = "Set how long a member must wait between announcing and completing its leave. Defaults to 7 days."))]
    pub leave_cooldown: Duration,
    #[builder(default = false, setter(doc = "Set whether executed transactions are sent to the block service. Defaults to `false`."))]
    pub block_service_mode: bool,
    #[builder(default, setter(strip_option, doc = "Set every how many committed heights a snapshot is created. Defaults to never."))]
    pub snapshot_interval: Option<u64>,
    #[builder(default = 1 << 16, setter(doc = "Set the maximum size in bytes of a snapshot chunk. Defaults to 64 KiB."))]
    pub snapshot_chunk_size: usize,
    #[builder(default = 2, setter(doc = "Set how many of the most recent snapshots are kept. Defaults to 2."))]
    pub snapshot_keep_recent: usize,
    #[builder(default = 1 << 30, setter(doc = "Set the maximum size in bytes of a snapshot this application restores. Larger offers are rejected. Defaults to 1 GiB."))]
    pub snapshot_max_size: u64,
}

impl Configuration {
    pub(crate) fn governance(&self) -> GovernanceConfig {
        GovernanceConfig {
            proposal_expiry: self.proposal_expiry,
            leave_cooldown: self.leave_cooldown,
        }
    }

    pub(crate) fn reward_recipients(&self) -> RewardRecipients {
        RewardRecipients {
            foundation: self.foundation.clone(),
            developers: self.developers.clone(),
        }
    }
}

/// Initial state of a chain, applied once by `init_chain`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Genesis].

    Required:
    - `.members(...)`
    - `.reward_split(...)`

    Optional:
    - `.registration_fee(...)`
    - `.stamp_cost(...)`
    - `.vote_types(...)`
    - `.balances(...)`
"))]
pub struct Genesis {
    #[builder(setter(doc = "Set the initial active members. Required."))]
    pub members: Vec<AccountId>,
    #[builder(setter(doc = "Set the initial reward split. Required."))]
    pub reward_split: RewardSplit,
    #[builder(default = 100_000, setter(doc = "Set the initial registration fee. Defaults to 100000."))]
    pub registration_fee: Amount,
    #[builder(default = 20, setter(doc = "Set the initial number of stamps per unit of native currency. Defaults to 20."))]
    pub stamp_cost: u64,
    #[builder(default = default_vote_types(), setter(doc = "Set the initial vote type catalog. Defaults to the built-in catalog."))]
    pub vote_types: Vec<String>,
    #[builder(default, setter(doc = "Set the initial native currency balances. Defaults to none."))]
    pub balances: Vec<(AccountId, Amount)>,
}

impl Genesis {
    /// Check the parameters that governance would also refuse.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.stamp_cost == 0 {
            return Err(ParamsError::ZeroStampCost);
        }
        if self.vote_types.is_empty() {
            return Err(ParamsError::EmptyVoteTypes);
        }
        Ok(())
    }

    /// Write the genesis state into `state`.
    pub(crate) fn apply<S: KVSet + ?Sized>(&self, state: &mut S) -> Result<(), GenesisError> {
        self.validate().map_err(GenesisError::InvalidParameter)?;

        seed_members(state, &self.members);
        state.set_value(
            variables::REGISTRATION_FEE,
            Some(Value::from(self.registration_fee)),
        );
        state.set_value(variables::STAMP_COST, Some(Value::from(self.stamp_cost)));
        state.set_value(variables::REWARD_SPLIT, Some(self.reward_split.to_value()));
        state.set_value(
            variables::VOTE_TYPES,
            Some(Value::from(self.vote_types.clone())),
        );

        let ledger = Ledger::native();
        for (account, amount) in &self.balances {
            ledger
                .credit(state, account, *amount)
                .map_err(GenesisError::LedgerError)?;
        }
        Ok(())
    }

    /// The app hash the chain starts from.
    pub fn app_hash(&self) -> CryptoHash {
        fold([self.try_to_vec().unwrap()])
    }
}

#[derive(Debug)]
pub enum GenesisError {
    InvalidParameter(ParamsError),
    LedgerError(LedgerError),
}

impl std::fmt::Display for GenesisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenesisError::InvalidParameter(err) => write!(f, "Invalid genesis parameter: {}", err),
            GenesisError::LedgerError(err) => write!(f, "Invalid genesis balance: {}", err),
        }
    }
}
