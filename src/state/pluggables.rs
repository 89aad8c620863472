/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable state persistence.

use std::fmt::Display;

use borsh::BorshDeserialize;

use crate::types::{
    basic::{AccountId, Amount, BlockHeight, CryptoHash},
    params::{ChainParameters, ParamsError, RewardSplit},
    validator_set::ValidatorSet,
    value::Value,
};

use super::variables::{self, app_state_key, nonce_key};

pub trait KVStore: KVGet + Clone + Send + 'static {
    type WriteBatch: WriteBatch;
    type Snapshot<'a>: 'a + KVGet;

    fn write(&mut self, wb: Self::WriteBatch);
    fn snapshot<'b>(&'b self) -> Self::Snapshot<'_>;

    /// Get every key-value pair in the store, in ascending order of key.
    fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)>;
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /* ↓↓↓ App state ↓↓↓ */

    fn app_state(&self, key: &str) -> Option<Vec<u8>> {
        self.get(&app_state_key(key))
    }

    fn value(&self, key: &str) -> Result<Option<Value>, KVGetError> {
        match self.app_state(key) {
            None => Ok(None),
            Some(bytes) => Value::deserialize(&mut bytes.as_slice())
                .map(Some)
                .map_err(|err| KVGetError::DeserializeValueError {
                    key: Key::AppState {
                        key: key.to_string(),
                    },
                    source: err,
                }),
        }
    }

    /* ↓↓↓ Nonces ↓↓↓ */

    fn nonce(&self, account: &AccountId) -> Result<Option<u64>, KVGetError> {
        match self.get(&nonce_key(account)) {
            None => Ok(None),
            Some(bytes) => u64::deserialize(&mut bytes.as_slice()).map(Some).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::Nonce {
                        account: account.clone(),
                    },
                    source: err,
                }
            }),
        }
    }

    /* ↓↓↓ Last Block Height ↓↓↓ */

    fn last_block_height(&self) -> Result<Option<BlockHeight>, KVGetError> {
        if let Some(bytes) = self.get(&variables::LAST_BLOCK_HEIGHT) {
            let height = BlockHeight::deserialize(&mut bytes.as_slice()).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::LastBlockHeight,
                    source: err,
                }
            })?;
            Ok(Some(height))
        } else {
            Ok(None)
        }
    }

    /* ↓↓↓ Last App Hash ↓↓↓ */

    fn last_app_hash(&self) -> Result<Option<CryptoHash>, KVGetError> {
        if let Some(bytes) = self.get(&variables::LAST_APP_HASH) {
            let hash = CryptoHash::deserialize(&mut bytes.as_slice()).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::LastAppHash,
                    source: err,
                }
            })?;
            Ok(Some(hash))
        } else {
            Ok(None)
        }
    }

    /* ↓↓↓ Reported Validator Set ↓↓↓ */

    fn reported_validator_set(&self) -> Result<ValidatorSet, KVGetError> {
        match self.get(&variables::REPORTED_VALIDATOR_SET) {
            None => Ok(ValidatorSet::new()),
            Some(bytes) => ValidatorSet::deserialize(&mut bytes.as_slice()).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::ReportedValidatorSet,
                    source: err,
                }
            }),
        }
    }

    /* ↓↓↓ Chain Parameters ↓↓↓ */

    fn registration_fee(&self) -> Result<Amount, KVGetError> {
        expect_u64(self, variables::REGISTRATION_FEE)
    }

    fn stamp_cost(&self) -> Result<u64, KVGetError> {
        let stamp_cost = expect_u64(self, variables::STAMP_COST)?;
        if stamp_cost == 0 {
            return Err(KVGetError::InvalidParameter {
                key: Key::AppState {
                    key: variables::STAMP_COST.to_string(),
                },
                source: ParamsError::ZeroStampCost,
            });
        }
        Ok(stamp_cost)
    }

    fn reward_split(&self) -> Result<RewardSplit, KVGetError> {
        let value = expect_value(self, variables::REWARD_SPLIT)?;
        RewardSplit::from_value(&value).map_err(|err| KVGetError::InvalidParameter {
            key: Key::AppState {
                key: variables::REWARD_SPLIT.to_string(),
            },
            source: err,
        })
    }

    fn vote_types(&self) -> Result<Vec<String>, KVGetError> {
        let key = || Key::AppState {
            key: variables::VOTE_TYPES.to_string(),
        };
        let value = expect_value(self, variables::VOTE_TYPES)?;
        let list = value.as_list().ok_or(KVGetError::InvalidParameter {
            key: key(),
            source: ParamsError::NotAList,
        })?;
        list.iter()
            .map(|vote_type| {
                vote_type
                    .as_str()
                    .map(String::from)
                    .ok_or(KVGetError::InvalidParameter {
                        key: key(),
                        source: ParamsError::NotAList,
                    })
            })
            .collect()
    }

    fn chain_parameters(&self) -> Result<ChainParameters, KVGetError> {
        Ok(ChainParameters {
            registration_fee: self.registration_fee()?,
            stamp_cost: self.stamp_cost()?,
            reward_split: self.reward_split()?,
            vote_types: self.vote_types()?,
        })
    }
}

fn expect_value<S: KVGet + ?Sized>(state: &S, key: &str) -> Result<Value, KVGetError> {
    state
        .value(key)?
        .ok_or(KVGetError::ValueExpectedButNotFound {
            key: Key::AppState {
                key: key.to_string(),
            },
        })
}

fn expect_u64<S: KVGet + ?Sized>(state: &S, key: &str) -> Result<u64, KVGetError> {
    expect_value(state, key)?
        .as_u64()
        .ok_or(KVGetError::MalformedValue {
            key: Key::AppState {
                key: key.to_string(),
            },
        })
}

#[derive(Debug)]
pub enum KVGetError {
    DeserializeValueError { key: Key, source: std::io::Error },
    ValueExpectedButNotFound { key: Key },
    MalformedValue { key: Key },
    InvalidParameter { key: Key, source: ParamsError },
}

impl Display for KVGetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KVGetError::DeserializeValueError { key, source } => {
                write!(f, "Failed to deserialize {}: {}", key, source)
            }
            KVGetError::ValueExpectedButNotFound { key } => {
                write!(f, "Expected a value for {} but found none", key)
            }
            KVGetError::MalformedValue { key } => write!(f, "Malformed value for {}", key),
            KVGetError::InvalidParameter { key, source } => {
                write!(f, "Invalid parameter at {}: {}", key, source)
            }
        }
    }
}

#[derive(Debug)]
pub enum Key {
    AppState { key: String },
    Nonce { account: AccountId },
    LastBlockHeight,
    LastAppHash,
    ReportedValidatorSet,
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            &Key::AppState { key } => write!(f, "App State for key {}", key),
            &Key::Nonce { account } => write!(f, "Nonce for account {}", account),
            &Key::LastBlockHeight => write!(f, "Last Block Height"),
            &Key::LastAppHash => write!(f, "Last App Hash"),
            &Key::ReportedValidatorSet => write!(f, "Reported Validator Set"),
        }
    }
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}
