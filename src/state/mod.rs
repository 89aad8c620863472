/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The persistent state of a node.
//!
//! # Pluggable persistence
//!
//! State is kept in a key-value store chosen by the library user. This crate only requires that it
//! implements the abstract functionality of a key-value store with atomic, batched writes, as
//! specified by the traits in [`pluggables`]. The layout of every state variable inside the store is
//! documented in [`variables`].
//!
//! While a block is being finalized, reads and writes go through the layered views defined in
//! [`app_state`]. The store itself is only written to on commit, or when a state sync snapshot is
//! restored.

pub mod app_state;

pub mod pluggables;

pub mod variables;
