/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Distribution of block rewards and transaction fees.
//!
//! A reward pool is split by the current [`RewardSplit`] into four buckets:
//! 1. **Validators**: shared equally between the active members. Any remainder that does not divide
//!    evenly is not paid out.
//! 2. **Foundation**: credited to the foundation account.
//! 3. **Developers**: credited to the developer account.
//! 4. **Burn**: not paid out.
//!
//! Static block rewards are minted into the pool. Transaction fees are first debited from the sender,
//! then distributed the same way.

use std::fmt::{self, Display, Formatter};

use crate::{
    governance::members::active_members,
    ledger::{Ledger, LedgerError},
    state::{app_state::KVSet, pluggables::KVGetError},
    types::{
        basic::{AccountId, Amount, Stamps},
        params::RewardSplit,
    },
};

/// Accounts that receive the non-validator reward buckets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardRecipients {
    pub foundation: AccountId,
    pub developers: AccountId,
}

/// Amounts paid out of one reward pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payouts {
    pub validators: Vec<AccountId>,
    pub per_validator: Amount,
    pub foundation: Amount,
    pub developers: Amount,
    /// Burn bucket plus the validator remainder.
    pub unpaid: Amount,
}

impl Payouts {
    /// Split `pool` between `validators` and the other buckets.
    pub fn compute(pool: Amount, split: &RewardSplit, validators: Vec<AccountId>) -> Payouts {
        let validator_bucket = split.validators().of(pool);
        let per_validator = if validators.is_empty() {
            0
        } else {
            validator_bucket / validators.len() as Amount
        };
        let foundation = split.foundation().of(pool);
        let developers = split.developers().of(pool);
        let paid = per_validator * validators.len() as Amount + foundation + developers;
        Payouts {
            validators,
            per_validator,
            foundation,
            developers,
            unpaid: pool - paid,
        }
    }

    pub fn total_paid(&self) -> Amount {
        self.per_validator * self.validators.len() as Amount + self.foundation + self.developers
    }
}

/// Pays reward pools into the native currency ledger.
#[derive(Clone, Debug)]
pub struct RewardDistributor {
    recipients: RewardRecipients,
}

impl RewardDistributor {
    pub fn new(recipients: RewardRecipients) -> RewardDistributor {
        RewardDistributor { recipients }
    }

    /// Mint and distribute `pool` among the current reward buckets.
    pub fn distribute<S: KVSet + ?Sized>(
        &self,
        state: &mut S,
        pool: Amount,
    ) -> Result<Payouts, RewardError> {
        let split = state.reward_split()?;
        let validators = active_members(&*state)?;
        let payouts = Payouts::compute(pool, &split, validators);

        let ledger = Ledger::native();
        for validator in &payouts.validators {
            ledger.credit(state, validator, payouts.per_validator)?;
        }
        ledger.credit(state, &self.recipients.foundation, payouts.foundation)?;
        ledger.credit(state, &self.recipients.developers, payouts.developers)?;

        log::debug!(
            "Distributed reward pool of {}: {} to each of {} validators, {} unpaid",
            pool,
            payouts.per_validator,
            payouts.validators.len(),
            payouts.unpaid
        );
        Ok(payouts)
    }

    /// Charge `payer` the fee for `stamps_used` and distribute it. The fee is
    /// `ceil(stamps_used / stamp_cost)`, capped at `payer`'s balance. Returns the fee charged.
    pub fn charge_fee<S: KVSet + ?Sized>(
        &self,
        state: &mut S,
        payer: &AccountId,
        stamps_used: Stamps,
    ) -> Result<Amount, RewardError> {
        let stamp_cost = state.stamp_cost()?;
        let fee = stamps_used / stamp_cost + u64::from(stamps_used % stamp_cost != 0);

        let ledger = Ledger::native();
        let fee = fee.min(ledger.balance(&*state, payer)?);
        if fee == 0 {
            return Ok(0);
        }
        ledger.debit(state, payer, fee)?;
        self.distribute(state, fee)?;
        Ok(fee)
    }
}

#[derive(Debug)]
pub enum RewardError {
    KVGetError(KVGetError),
    LedgerError(LedgerError),
}

impl From<KVGetError> for RewardError {
    fn from(value: KVGetError) -> Self {
        RewardError::KVGetError(value)
    }
}

impl From<LedgerError> for RewardError {
    fn from(value: LedgerError) -> Self {
        RewardError::LedgerError(value)
    }
}

impl Display for RewardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RewardError::KVGetError(err) => write!(f, "{}", err),
            RewardError::LedgerError(err) => write!(f, "{}", err),
        }
    }
}
