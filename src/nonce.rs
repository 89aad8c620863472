/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Per-account nonces for replay protection.
//!
//! The nonce of an account is the nonce of its latest transaction that was delivered through the
//! consensus channel. Accounts that have never sent a transaction have no nonce, and their first
//! transaction must carry nonce 0. Every later transaction must carry exactly the recorded nonce
//! plus one.
//!
//! Only the block finalization pipeline writes nonces. The mempool channel reads them through
//! [`assert_nonce_at_least`], which never writes.

use std::fmt::{self, Display, Formatter};

use borsh::BorshSerialize;

use crate::{
    state::{
        app_state::KVSet,
        pluggables::{KVGet, KVGetError},
        variables::nonce_key,
    },
    types::basic::AccountId,
};

/// Get the recorded nonce of `account`, or `None` if it has never sent a transaction.
pub fn get_nonce<S: KVGet + ?Sized>(state: &S, account: &AccountId) -> Result<Option<u64>, NonceError> {
    Ok(state.nonce(account)?)
}

/// Get the nonce that the next transaction of `account` must carry.
pub fn next_nonce<S: KVGet + ?Sized>(state: &S, account: &AccountId) -> Result<u64, NonceError> {
    match get_nonce(state, account)? {
        None => Ok(0),
        Some(nonce) => nonce.checked_add(1).ok_or(NonceError::Exhausted {
            account: account.clone(),
        }),
    }
}

/// Strictly assert that `nonce` is the next nonce of `account`. Used during block finalization.
pub fn assert_next_nonce<S: KVGet + ?Sized>(
    state: &S,
    account: &AccountId,
    nonce: u64,
) -> Result<(), NonceError> {
    let expected = next_nonce(state, account)?;
    if nonce != expected {
        return Err(NonceError::Mismatch {
            account: account.clone(),
            expected,
            got: nonce,
        });
    }
    Ok(())
}

/// Relaxed assertion that allows any nonce greater than or equal to the next nonce of `account`,
/// so that the mempool can admit a sequence of transactions from the same account before the first
/// one is committed.
pub fn assert_nonce_at_least<S: KVGet + ?Sized>(
    state: &S,
    account: &AccountId,
    nonce: u64,
) -> Result<(), NonceError> {
    let expected = next_nonce(state, account)?;
    if nonce < expected {
        return Err(NonceError::Stale {
            account: account.clone(),
            expected,
            got: nonce,
        });
    }
    Ok(())
}

/// Record `nonce` as the latest nonce of `account`.
///
/// Fails if `nonce` is not strictly greater than the recorded nonce. Callers must treat any error
/// as fatal.
pub fn set_nonce<S: KVSet + ?Sized>(
    state: &mut S,
    account: &AccountId,
    nonce: u64,
) -> Result<(), NonceError> {
    if let Some(current) = get_nonce(&*state, account)? {
        if nonce <= current {
            return Err(NonceError::NotIncreasing {
                account: account.clone(),
                current,
                attempted: nonce,
            });
        }
    }
    state.set(&nonce_key(account), nonce.try_to_vec().unwrap());
    Ok(())
}

#[derive(Debug)]
pub enum NonceError {
    Mismatch {
        account: AccountId,
        expected: u64,
        got: u64,
    },
    Stale {
        account: AccountId,
        expected: u64,
        got: u64,
    },
    NotIncreasing {
        account: AccountId,
        current: u64,
        attempted: u64,
    },
    Exhausted {
        account: AccountId,
    },
    KVGetError(KVGetError),
}

impl From<KVGetError> for NonceError {
    fn from(value: KVGetError) -> Self {
        NonceError::KVGetError(value)
    }
}

impl Display for NonceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NonceError::Mismatch {
                account,
                expected,
                got,
            } => write!(f, "Invalid nonce for {}: expected {}, got {}", account, expected, got),
            NonceError::Stale {
                account,
                expected,
                got,
            } => write!(f, "Stale nonce for {}: expected at least {}, got {}", account, expected, got),
            NonceError::NotIncreasing {
                account,
                current,
                attempted,
            } => write!(
                f,
                "Nonce of {} must increase: current {}, attempted {}",
                account, current, attempted
            ),
            NonceError::Exhausted { account } => write!(f, "Nonces of {} are exhausted", account),
            NonceError::KVGetError(err) => write!(f, "{}", err),
        }
    }
}
