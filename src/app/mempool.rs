/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use crate::{
    nonce::assert_nonce_at_least,
    state::pluggables::KVStore,
    types::{basic::ChainID, transaction::Transaction},
};

use super::messages::{ResponseCheckTx, CODE_OK, CODE_REJECTED};

/// The connection through which the consensus engine asks whether a transaction may enter its
/// mempool. Never writes.
pub struct MempoolConnection<K: KVStore> {
    kv_store: K,
    chain_id: ChainID,
}

impl<K: KVStore> MempoolConnection<K> {
    pub(crate) fn new(kv_store: K, chain_id: ChainID) -> MempoolConnection<K> {
        MempoolConnection { kv_store, chain_id }
    }

    /// Check that `tx` decodes, is signed by its sender, targets this chain, and carries a nonce
    /// that is not below the sender's next nonce in committed state.
    pub fn check_tx(&self, tx: &[u8]) -> ResponseCheckTx {
        let transaction = match Transaction::decode(tx) {
            Ok(transaction) => transaction,
            Err(_) => return rejected("Transaction could not be decoded"),
        };
        if !transaction.verify() {
            return rejected("Invalid signature");
        }
        if transaction.payload.chain_id != self.chain_id {
            return rejected("Wrong chain ID");
        }

        let snapshot = self.kv_store.snapshot();
        match assert_nonce_at_least(&snapshot, transaction.sender(), transaction.nonce()) {
            Ok(()) => ResponseCheckTx {
                code: CODE_OK,
                log: String::new(),
            },
            Err(err) => rejected(&err.to_string()),
        }
    }
}

fn rejected(log: &str) -> ResponseCheckTx {
    ResponseCheckTx {
        code: CODE_REJECTED,
        log: log.to_string(),
    }
}
