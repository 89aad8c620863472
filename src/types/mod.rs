/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types and traits that are used across multiple components of the state machine.
//!
//! Types specific to a single component, e.g., governance proposals, can be found in the "types"
//! submodules of their components, e.g., [`crate::governance::types`].

pub mod basic;

pub mod block_meta;

pub mod crypto_primitives;

pub mod execution;

pub mod params;

pub mod transaction;

pub mod update_sets;

pub mod validator_set;

pub mod value;
