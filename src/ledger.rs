/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Account balances kept in contract-scoped app state.
//!
//! A balance is a `Value::Int` stored at [`balance_key`]. An account without a stored balance has a
//! balance of zero. Every mutation of a balance goes through a [`Ledger`], so it is recorded as a
//! state write of the transaction (or block reward) that caused it.

use std::fmt::{self, Display, Formatter};

use crate::{
    state::{
        app_state::KVSet,
        pluggables::{KVGet, KVGetError, Key},
        variables::balance_key,
    },
    types::{
        basic::{AccountId, Amount},
        value::Value,
    },
};

/// Name of the contract that keeps the native currency.
pub const NATIVE_CURRENCY: &str = "currency";

/// Handle on the balances kept by one contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ledger<'c> {
    contract: &'c str,
}

impl<'c> Ledger<'c> {
    pub fn new(contract: &'c str) -> Ledger<'c> {
        Ledger { contract }
    }

    /// Ledger of the native currency.
    pub fn native() -> Ledger<'static> {
        Ledger {
            contract: NATIVE_CURRENCY,
        }
    }

    pub fn balance<S: KVGet + ?Sized>(
        &self,
        state: &S,
        account: &AccountId,
    ) -> Result<Amount, LedgerError> {
        let key = balance_key(self.contract, account);
        match state.value(&key)? {
            None => Ok(0),
            Some(value) => value.as_u64().ok_or(LedgerError::KVGetError(
                KVGetError::MalformedValue {
                    key: Key::AppState { key },
                },
            )),
        }
    }

    pub fn credit<S: KVSet + ?Sized>(
        &self,
        state: &mut S,
        account: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balance(&*state, account)?;
        let new_balance = balance.checked_add(amount).ok_or(LedgerError::Overflow {
            account: account.clone(),
        })?;
        state.set_value(
            &balance_key(self.contract, account),
            Some(Value::from(new_balance)),
        );
        Ok(())
    }

    pub fn debit<S: KVSet + ?Sized>(
        &self,
        state: &mut S,
        account: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balance(&*state, account)?;
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: account.clone(),
                balance,
                required: amount,
            });
        }
        state.set_value(
            &balance_key(self.contract, account),
            Some(Value::from(balance - amount)),
        );
        Ok(())
    }

    pub fn transfer<S: KVSet + ?Sized>(
        &self,
        state: &mut S,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.debit(state, from, amount)?;
        self.credit(state, to, amount)
    }
}

#[derive(Debug)]
pub enum LedgerError {
    InsufficientBalance {
        account: AccountId,
        balance: Amount,
        required: Amount,
    },
    Overflow {
        account: AccountId,
    },
    KVGetError(KVGetError),
}

impl From<KVGetError> for LedgerError {
    fn from(value: KVGetError) -> Self {
        LedgerError::KVGetError(value)
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::InsufficientBalance {
                account,
                balance,
                required,
            } => write!(
                f,
                "Insufficient balance: {} has {}, needs {}",
                account, balance, required
            ),
            LedgerError::Overflow { account } => write!(f, "Balance of {} overflows", account),
            LedgerError::KVGetError(err) => write!(f, "{}", err),
        }
    }
}
