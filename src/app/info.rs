/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Queries against committed state.
//!
//! |Path|Result|
//! |---|---|
//! |`/get/<key>`|The app state value at `<key>`, or `null`.|
//! |`/nonce/<account>`|The nonce of `<account>`, or `null` if it never sent a transaction.|
//! |`/balance/<account>`|The native currency balance of `<account>`.|
//! |`/params`|The [chain parameters](crate::types::params::ChainParameters).|
//! |`/members`|The active members.|
//! |`/proposal/<id>`|The proposal numbered `<id>`, or `null`.|
//!
//! Every result is JSON.

use std::fmt::{self, Display, Formatter};

use crate::{
    governance::{members::active_members, proposals::proposal},
    ledger::{Ledger, LedgerError},
    state::pluggables::{KVGet, KVGetError, KVStore},
    types::{
        basic::{AccountId, ProposalId},
        value::Value,
    },
};

use super::messages::{RequestQuery, ResponseInfo, ResponseQuery, CODE_OK, CODE_QUERY_FAILED};

/// The connection through which the consensus engine and clients read committed state.
pub struct InfoConnection<K: KVStore> {
    kv_store: K,
}

impl<K: KVStore> InfoConnection<K> {
    pub(crate) fn new(kv_store: K) -> InfoConnection<K> {
        InfoConnection { kv_store }
    }

    /// Get the last committed height and app hash, from which the consensus engine decides which
    /// blocks to replay.
    pub fn info(&self) -> Result<ResponseInfo, KVGetError> {
        let snapshot = self.kv_store.snapshot();
        Ok(ResponseInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            last_block_height: snapshot.last_block_height()?.unwrap_or_default(),
            last_block_app_hash: snapshot
                .last_app_hash()?
                .map(|hash| hash.bytes().to_vec())
                .unwrap_or_default(),
        })
    }

    pub fn query(&self, request: &RequestQuery) -> ResponseQuery {
        let snapshot = self.kv_store.snapshot();
        let height = snapshot
            .last_block_height()
            .ok()
            .flatten()
            .unwrap_or_default();

        match answer(&snapshot, &request.path).and_then(|value| {
            serde_json::to_vec(&value).map_err(|err| QueryError::Serialize(err.to_string()))
        }) {
            Ok(value) => ResponseQuery {
                code: CODE_OK,
                value,
                log: String::new(),
                height,
            },
            Err(err) => ResponseQuery {
                code: CODE_QUERY_FAILED,
                value: Vec::new(),
                log: err.to_string(),
                height,
            },
        }
    }
}

fn answer<S: KVGet + ?Sized>(state: &S, path: &str) -> Result<Value, QueryError> {
    let mut segments = path.trim_start_matches('/').splitn(2, '/');
    let route = segments.next().unwrap_or_default();
    let argument = segments.next();

    match (route, argument) {
        ("get", Some(key)) => Ok(state.value(key)?.unwrap_or(Value::Null)),
        ("nonce", Some(account)) => Ok(Value::from(state.nonce(&AccountId::new(account))?)),
        ("balance", Some(account)) => Ok(Value::from(
            Ledger::native().balance(state, &AccountId::new(account))?,
        )),
        ("params", None) => Ok(state.chain_parameters()?.to_value()),
        ("members", None) => Ok(Value::from(
            active_members(state)?
                .iter()
                .map(|member| member.as_str())
                .collect::<Vec<&str>>(),
        )),
        ("proposal", Some(id)) => {
            let id = id
                .parse::<u64>()
                .map_err(|_| QueryError::InvalidArgument(id.to_string()))?;
            Ok(proposal(state, ProposalId::new(id))?
                .map(|proposal| proposal.to_value())
                .unwrap_or(Value::Null))
        }
        _ => Err(QueryError::UnknownPath(path.to_string())),
    }
}

#[derive(Debug)]
pub enum QueryError {
    UnknownPath(String),
    InvalidArgument(String),
    KVGetError(KVGetError),
    LedgerError(LedgerError),
    Serialize(String),
}

impl From<KVGetError> for QueryError {
    fn from(value: KVGetError) -> Self {
        QueryError::KVGetError(value)
    }
}

impl From<LedgerError> for QueryError {
    fn from(value: LedgerError) -> Self {
        QueryError::LedgerError(value)
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::UnknownPath(path) => write!(f, "Unknown query path {}", path),
            QueryError::InvalidArgument(argument) => write!(f, "Invalid query argument {}", argument),
            QueryError::KVGetError(err) => write!(f, "{}", err),
            QueryError::LedgerError(err) => write!(f, "{}", err),
            QueryError::Serialize(err) => write!(f, "Failed to serialize result: {}", err),
        }
    }
}
