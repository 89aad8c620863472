/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A deterministic application state machine for an ABCI consensus engine.
//!
//! The consensus engine orders transactions into blocks. This crate executes them, in order, and
//! commits to the outcome of every block with a single app hash that every honest node computes
//! identically. Around an opaque [execution engine](execution::Executor) it provides:
//! - The [block finalization pipeline](pipeline), which verifies, executes and fingerprints
//!   transactions.
//! - [Nonce](nonce)-based replay protection.
//! - The [hash chain](hash_chain) that folds a block's fingerprints into its app hash.
//! - [Reward](rewards) and fee distribution.
//! - On-chain [governance](governance) of the validator set and of the chain parameters.
//! - The four [connections](app) through which the consensus engine drives all of the above.

pub mod app;

pub mod config;

pub mod events;

pub(crate) mod event_bus;

pub mod execution;

pub mod governance;

pub mod hash_chain;

pub mod indexer;

pub mod ledger;

pub mod logging;

pub mod nonce;

pub mod pipeline;

pub mod rewards;

pub mod state;

pub mod state_sync;

pub mod types;
