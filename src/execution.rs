/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Execution of a single transaction.
//!
//! Contract logic is opaque to this crate: library users supply it by implementing [`Executor`].
//! The [`Dispatcher`] sits in front of the executor, handles calls to the built-in
//! [governance contract](crate::governance::GOVERNANCE_CONTRACT) itself, and charges transaction fees
//! after successful executions.
//!
//! # Executor contract
//!
//! An executor must:
//! 1. Be deterministic: given the same transaction, block meta and state, it returns the same result
//!    on every node.
//! 2. Read and write app state only through the [`ContractState`] it is given. Writes to the
//!    variables of governance and of the chain parameters are refused.
//! 3. Return an `ExecutionResult` with a non-zero status, rather than an `Err`, for transactions that
//!    fail in an expected way (e.g., a contract assertion). Writes of a transaction with a non-zero
//!    status are discarded.
//!
//! An `Err` drops the transaction from the block entirely.
//!
//! State the dispatcher itself cannot read (e.g., a missing chain parameter) is not the
//! transaction's fault: it fails with [`DispatchError::KVGetError`], which is fatal to the block.

use std::fmt::{self, Display, Formatter};

use crate::{
    governance::{Governance, GovernanceConfig, GovernanceError, GOVERNANCE_CONTRACT},
    ledger::LedgerError,
    rewards::{RewardDistributor, RewardError},
    state::{
        app_state::{AppStateView, ContractState},
        pluggables::KVGetError,
    },
    types::{
        basic::Stamps,
        block_meta::BlockMeta,
        execution::{ExecutionResult, STATUS_FAILURE, STATUS_SUCCESS},
        transaction::Transaction,
        value::Value,
    },
};

/// Stamps consumed by every call to the governance contract.
pub const GOVERNANCE_CALL_STAMPS: Stamps = 100;

/// Request to execute one transaction.
pub struct ExecuteRequest<'r, 's> {
    pub transaction: &'r Transaction,
    pub block_meta: &'r BlockMeta,
    pub state: ContractState<'r, 's>,
}

/// The external execution engine.
pub trait Executor: Send + 'static {
    fn execute(&mut self, request: ExecuteRequest<'_, '_>) -> Result<ExecutionResult, ExecuteError>;
}

/// Reasons why an executor could not produce a result. Both variants drop the transaction; they
/// differ only in how the drop is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    /// A bug in the execution engine or in application logic, or corrupted state.
    EngineFault(String),
    /// A transaction that could never execute, e.g., a call to a contract that does not exist.
    Rejected(String),
}

impl Display for ExecuteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExecuteError::EngineFault(reason) => write!(f, "engine fault: {}", reason),
            ExecuteError::Rejected(reason) => write!(f, "rejected: {}", reason),
        }
    }
}

/// Why a transaction produced no result.
#[derive(Debug)]
pub enum DispatchError {
    /// The executor could not run the transaction. The transaction is dropped.
    ExecuteError(ExecuteError),
    /// State needed to run any transaction could not be read.
    KVGetError(KVGetError),
}

impl From<ExecuteError> for DispatchError {
    fn from(value: ExecuteError) -> Self {
        DispatchError::ExecuteError(value)
    }
}

impl From<KVGetError> for DispatchError {
    fn from(value: KVGetError) -> Self {
        DispatchError::KVGetError(value)
    }
}

/// Routes transactions to governance or to the external executor, and charges fees.
pub struct Dispatcher<E: Executor> {
    executor: E,
    governance: GovernanceConfig,
    fees: Option<RewardDistributor>,
}

impl<E: Executor> Dispatcher<E> {
    /// Create a dispatcher. If `fees` is `Some`, successful transactions are charged fees, which are
    /// distributed by it.
    pub fn new(
        executor: E,
        governance: GovernanceConfig,
        fees: Option<RewardDistributor>,
    ) -> Dispatcher<E> {
        Dispatcher {
            executor,
            governance,
            fees,
        }
    }

    pub fn execute(
        &mut self,
        transaction: &Transaction,
        block_meta: &BlockMeta,
        state: &mut AppStateView<'_>,
    ) -> Result<ExecutionResult, DispatchError> {
        let mut result = if transaction.payload.contract == GOVERNANCE_CONTRACT {
            self.execute_governance(transaction, block_meta, state)?
        } else {
            self.executor.execute(ExecuteRequest {
                transaction,
                block_meta,
                state: ContractState::new(state),
            })?
        };

        if let (true, Some(fees)) = (result.is_success(), &self.fees) {
            state.take_writes();
            match fees.charge_fee(state, transaction.sender(), result.stamps_used) {
                Ok(_) => (),
                Err(RewardError::KVGetError(err))
                | Err(RewardError::LedgerError(LedgerError::KVGetError(err))) => {
                    return Err(DispatchError::KVGetError(err))
                }
                Err(err) => {
                    return Err(ExecuteError::EngineFault(format!("charging fee: {}", err)).into())
                }
            }
            result.state_writes.extend(state.take_writes());
            result.rehash(transaction);
        }

        Ok(result)
    }

    fn execute_governance(
        &self,
        transaction: &Transaction,
        block_meta: &BlockMeta,
        state: &mut AppStateView<'_>,
    ) -> Result<ExecutionResult, DispatchError> {
        let payload = &transaction.payload;
        if payload.stamps_supplied < GOVERNANCE_CALL_STAMPS {
            return Ok(ExecutionResult::new(
                transaction,
                STATUS_FAILURE,
                Value::from("Insufficient stamps supplied"),
                Vec::new(),
                payload.stamps_supplied,
            ));
        }

        let outcome = Governance::new(state, &self.governance).call(
            &payload.sender,
            &payload.function,
            &payload.kwargs,
            block_meta.nanos,
        );
        match outcome {
            Ok(result) => Ok(ExecutionResult::new(
                transaction,
                STATUS_SUCCESS,
                result,
                state.take_writes(),
                GOVERNANCE_CALL_STAMPS,
            )),
            Err(GovernanceError::KVGetError(err))
            | Err(GovernanceError::LedgerError(LedgerError::KVGetError(err))) => {
                Err(DispatchError::KVGetError(err))
            }
            Err(err) => {
                state.take_writes();
                Ok(ExecutionResult::new(
                    transaction,
                    STATUS_FAILURE,
                    Value::from(err.to_string()),
                    Vec::new(),
                    GOVERNANCE_CALL_STAMPS,
                ))
            }
        }
    }
}
