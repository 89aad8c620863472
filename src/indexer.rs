/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Best-effort persistence of executed transactions into an external block service.
//!
//! The [`Indexer`] owns a background thread that receives [`TxRecord`]s over a channel and hands
//! them to a user-supplied [`BlockService`]. Sending never blocks, and failures of the block service
//! are only logged. Nothing the block service does can affect the app hash.

use std::{
    fmt::Display,
    sync::mpsc::{self, Sender},
    thread::{self, JoinHandle},
};

use crate::types::{
    basic::{BlockHeight, Timestamp},
    execution::ExecutionResult,
    transaction::Transaction,
};

/// Sink for the full records of executed transactions, e.g., a database backing a block explorer.
pub trait BlockService: Send + 'static {
    type Error: Display;

    /// Stage the record of one executed transaction.
    fn insert_full_data(&mut self, record: &TxRecord) -> Result<(), Self::Error>;

    /// Persist every record staged for the block at `height`.
    fn commit_batch(&mut self, height: BlockHeight) -> Result<(), Self::Error>;
}

/// Everything known about an executed transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct TxRecord {
    pub height: BlockHeight,
    pub block_time: Timestamp,
    /// Uppercase hex of the SHA256 hash of the transaction's wire encoding, the way the consensus
    /// engine names transactions.
    pub hash: String,
    pub transaction: Transaction,
    pub result: ExecutionResult,
}

enum IndexerMessage {
    Insert(Box<TxRecord>),
    Commit(BlockHeight),
}

/// Handle to the block service thread. Dropping it waits for every record sent so far to be handed
/// to the block service.
pub struct Indexer {
    sender: Option<Sender<IndexerMessage>>,
    worker: Option<JoinHandle<()>>,
}

impl Indexer {
    pub fn start<B: BlockService>(mut block_service: B) -> Indexer {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::spawn(move || {
            for message in receiver {
                match message {
                    IndexerMessage::Insert(record) => {
                        if let Err(err) = block_service.insert_full_data(&record) {
                            log::warn!("Block service failed to insert tx {}: {}", record.hash, err);
                        }
                    }
                    IndexerMessage::Commit(height) => {
                        if let Err(err) = block_service.commit_batch(height) {
                            log::warn!("Block service failed to commit block {}: {}", height, err);
                        }
                    }
                }
            }
        });

        Indexer {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    pub(crate) fn insert(&self, record: TxRecord) {
        self.send(IndexerMessage::Insert(Box::new(record)))
    }

    pub(crate) fn commit(&self, height: BlockHeight) {
        self.send(IndexerMessage::Commit(height))
    }

    fn send(&self, message: IndexerMessage) {
        if let Some(sender) = &self.sender {
            if sender.send(message).is_err() {
                log::warn!("Block service thread has stopped, record discarded");
            }
        }
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        // Closing the channel ends the worker's loop.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Block service thread panicked");
            }
        }
    }
}
