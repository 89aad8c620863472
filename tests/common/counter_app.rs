//! A trivial execution engine that keeps a counter, used to drive the application in tests.
//!
//! Functions of the `con_counter` contract:
//! - `increment`: add 1 to `con_counter.value` and return the new value.
//! - `set`: write kwarg `value` under `con_counter.<kwarg key>`.
//! - `fail`: write `con_counter.value`, then report failure.
//! - `overwrite`: write kwarg `value` under kwarg `key`, taken as a full app state key.
//! - `fault`: report an engine fault.
//! - `reject`: report that the transaction cannot be executed.

use stampchain::{
    execution::{ExecuteError, ExecuteRequest, Executor},
    state::{app_state::WriteDenied, pluggables::KVGet},
    types::{
        execution::{ExecutionResult, STATUS_FAILURE, STATUS_SUCCESS},
        value::Value,
    },
};

pub(crate) const COUNTER_CONTRACT: &str = "con_counter";
pub(crate) const COUNTER_KEY: &str = "con_counter.value";
pub(crate) const INCREMENT_STAMPS: u64 = 50;

pub(crate) struct CounterApp;

impl Executor for CounterApp {
    fn execute(&mut self, request: ExecuteRequest<'_, '_>) -> Result<ExecutionResult, ExecuteError> {
        let transaction = request.transaction;
        let payload = &transaction.payload;
        let mut state = request.state;
        if payload.contract != COUNTER_CONTRACT {
            return Err(ExecuteError::Rejected(format!("unknown contract {}", payload.contract)));
        }

        match payload.function.as_str() {
            "increment" => {
                let current = state
                    .value(COUNTER_KEY)
                    .map_err(|err| ExecuteError::EngineFault(err.to_string()))?
                    .and_then(|value| value.as_int())
                    .unwrap_or(0);
                state
                    .set_value(COUNTER_KEY, Some(Value::Int(current + 1)))
                    .map_err(denied)?;
                Ok(ExecutionResult::new(
                    transaction,
                    STATUS_SUCCESS,
                    Value::Int(current + 1),
                    state.take_writes(),
                    INCREMENT_STAMPS,
                ))
            }
            "set" => {
                let key = payload.kwargs.get("key").and_then(Value::as_str).unwrap_or("value");
                let value = payload.kwargs.get("value").cloned();
                state
                    .set_value(&format!("{}.{}", COUNTER_CONTRACT, key), value)
                    .map_err(denied)?;
                Ok(ExecutionResult::new(
                    transaction,
                    STATUS_SUCCESS,
                    Value::Null,
                    state.take_writes(),
                    INCREMENT_STAMPS,
                ))
            }
            "overwrite" => {
                let key = payload.kwargs.get("key").and_then(Value::as_str).unwrap_or_default();
                let value = payload.kwargs.get("value").cloned();
                state.set_value(key, value).map_err(denied)?;
                Ok(ExecutionResult::new(
                    transaction,
                    STATUS_SUCCESS,
                    Value::Null,
                    state.take_writes(),
                    INCREMENT_STAMPS,
                ))
            }
            "fail" => {
                state
                    .set_value(COUNTER_KEY, Some(Value::Int(999)))
                    .map_err(denied)?;
                state.take_writes();
                Ok(ExecutionResult::new(
                    transaction,
                    STATUS_FAILURE,
                    Value::from("counter refused"),
                    Vec::new(),
                    INCREMENT_STAMPS,
                ))
            }
            "fault" => Err(ExecuteError::EngineFault(String::from("out of memory"))),
            "reject" => Err(ExecuteError::Rejected(String::from("not today"))),
            other => Err(ExecuteError::Rejected(format!("unknown function {}", other))),
        }
    }
}

fn denied(err: WriteDenied) -> ExecuteError {
    ExecuteError::Rejected(err.to_string())
}
