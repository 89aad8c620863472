/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Block-scoped execution context.

use borsh::{BorshDeserialize, BorshSerialize};

use super::basic::{BlockHeight, ChainID, Timestamp};

/// Information about the block whose transactions are being executed.
///
/// Built once per block by the [block finalizer](crate::pipeline::BlockFinalizer) and lent
/// read-only to the execution of every transaction in the block. It is never persisted on its own.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockMeta {
    /// Block time.
    pub nanos: Timestamp,
    pub height: BlockHeight,
    /// Lowercase hex encoding of the block hash.
    pub hash: String,
    pub chain_id: ChainID,
}

impl BlockMeta {
    pub fn new(nanos: Timestamp, height: BlockHeight, hash: &[u8], chain_id: ChainID) -> BlockMeta {
        BlockMeta {
            nanos,
            height,
            hash: hex::encode(hash),
            chain_id,
        }
    }
}
