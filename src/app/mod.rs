/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and run an application, and the four connections the consensus engine drives it
//! through.
//!
//! The consensus engine opens four connections to the application. Calls on one connection are
//! linearized by the engine, but calls on different connections may be concurrent:
//!
//! |Connection|Requests|
//! |---|---|
//! |[Consensus](ConsensusConnection)|`init_chain`, `begin_block`, `deliver_tx`, `end_block`, `finalize_block`, `commit`|
//! |[Mempool](MempoolConnection)|`check_tx`|
//! |[Info](InfoConnection)|`info`, `query`|
//! |[State sync](StateSyncConnection)|`list_snapshots`, `offer_snapshot`, `load_snapshot_chunk`, `apply_snapshot_chunk`|
//!
//! Each connection holds its own clone of the [`KVStore`]. Only the consensus connection (on
//! `init_chain` and `commit`) and the state sync connection (on the last chunk of a snapshot) write
//! into it, and each write is a single write batch.
//!
//! ## Starting an application
//!
//! ```ignore
//! let mut application =
//!     ApplicationSpec::builder()
//!     .executor(executor)
//!     .kv_store(kv_store)
//!     .configuration(configuration)
//!     .genesis(genesis)
//!     .on_commit_block(commit_handler)
//!     .build()
//!     .start();
//!
//! let connections = application.connections();
//! ```
//!
//! ### Required setters
//! - `.executor(...)`
//! - `.kv_store(...)`
//! - `.configuration(...)`
//! - `.genesis(...)`
//!
//! ### Optional setters
//! - `.indexer(...)`, used only if the configuration enables `block_service_mode`.
//! - One `.on_...(...)` setter per [event](crate::events) type, to register an event handler.

pub mod messages;

mod consensus;
pub use consensus::ConsensusConnection;

mod info;
pub use info::{InfoConnection, QueryError};

mod mempool;
pub use mempool::MempoolConnection;

mod sync;
pub use sync::StateSyncConnection;

use std::{
    fmt::{self, Display, Formatter},
    sync::mpsc::{self, Sender},
    thread::JoinHandle,
};

use typed_builder::TypedBuilder;

use crate::{
    config::{Configuration, Genesis, GenesisError},
    event_bus::{start_event_bus, EventHandlers, HandlerPtr},
    events::*,
    execution::{Dispatcher, Executor},
    indexer::Indexer,
    pipeline::{BlockFinalizer, FinalizeError},
    rewards::RewardDistributor,
    state::pluggables::{KVGetError, KVStore, WriteBatch},
    state_sync::SnapshotStore,
    types::{basic::ChainID, update_sets::AppStateUpdates},
};

#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building an [ApplicationSpec]. On the builder call the following methods to construct a valid [ApplicationSpec].

    Required:
    - `.executor(...)`
    - `.kv_store(...)`
    - `.configuration(...)`
    - `.genesis(...)`
"))]
pub struct ApplicationSpec<K: KVStore, E: Executor> {
    // Required parameters
    #[builder(setter(doc = "Set the execution engine that runs every transaction not addressed to the governance contract. The argument must implement the [Executor](crate::execution::Executor) trait. Required."))]
    executor: E,
    #[builder(setter(doc = "Set the implementation of the application's Key-Value store. The argument must implement the [KVStore](crate::state::pluggables::KVStore) trait. Required."))]
    kv_store: K,
    #[builder(setter(doc = "Set the [configuration](Configuration), which contains the node-local parameters of the application. Required."))]
    configuration: Configuration,
    #[builder(setter(doc = "Set the [genesis](Genesis) state applied by `init_chain`. Required."))]
    genesis: Genesis,
    // Optional parameters
    #[builder(default, setter(strip_option, doc = "Set the [indexer](crate::indexer::Indexer) that executed transactions are sent to if `block_service_mode` is enabled. Optional."))]
    indexer: Option<Indexer>,
    #[builder(default, setter(transform = |handler: impl Fn(&InitChainEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<InitChainEvent>),
    doc = "Register a handler closure to be invoked after the genesis state is written. Optional."))]
    on_init_chain: Option<HandlerPtr<InitChainEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CommitBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CommitBlockEvent>),
    doc = "Register a handler closure to be invoked after a block is committed. Optional."))]
    on_commit_block: Option<HandlerPtr<CommitBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RestoreSnapshotEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RestoreSnapshotEvent>),
    doc = "Register a handler closure to be invoked after a snapshot is restored. Optional."))]
    on_restore_snapshot: Option<HandlerPtr<RestoreSnapshotEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ExecuteTxEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ExecuteTxEvent>),
    doc = "Register a handler closure to be invoked after a transaction is executed. Optional."))]
    on_execute_tx: Option<HandlerPtr<ExecuteTxEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DropTxEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DropTxEvent>),
    doc = "Register a handler closure to be invoked after a transaction is dropped from its block. Optional."))]
    on_drop_tx: Option<HandlerPtr<DropTxEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DistributeRewardsEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DistributeRewardsEvent>),
    doc = "Register a handler closure to be invoked after the static rewards of a block are distributed. Optional."))]
    on_distribute_rewards: Option<HandlerPtr<DistributeRewardsEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SkipRewardsEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SkipRewardsEvent>),
    doc = "Register a handler closure to be invoked after the static rewards of a block fail to be distributed. Optional."))]
    on_skip_rewards: Option<HandlerPtr<SkipRewardsEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UpdateValidatorSetEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<UpdateValidatorSetEvent>),
    doc = "Register a handler closure to be invoked after a block changes the validator set. Optional."))]
    on_update_validator_set: Option<HandlerPtr<UpdateValidatorSetEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&FinalizeBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<FinalizeBlockEvent>),
    doc = "Register a handler closure to be invoked after the app hash of a block is computed. Optional."))]
    on_finalize_block: Option<HandlerPtr<FinalizeBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CreateSnapshotEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CreateSnapshotEvent>),
    doc = "Register a handler closure to be invoked after a snapshot is created. Optional."))]
    on_create_snapshot: Option<HandlerPtr<CreateSnapshotEvent>>,
}

impl<K: KVStore, E: Executor> ApplicationSpec<K, E> {
    /// Starts the threads associated with running an application, and returns its connections in an
    /// [Application].
    pub fn start(self) -> Application<K, E> {
        let configuration = self.configuration;

        let mut event_handlers = EventHandlers::default();
        event_handlers.init_chain_handlers.extend(self.on_init_chain);
        event_handlers.commit_block_handlers.extend(self.on_commit_block);
        event_handlers.restore_snapshot_handlers.extend(self.on_restore_snapshot);
        event_handlers.execute_tx_handlers.extend(self.on_execute_tx);
        event_handlers.drop_tx_handlers.extend(self.on_drop_tx);
        event_handlers.distribute_rewards_handlers.extend(self.on_distribute_rewards);
        event_handlers.skip_rewards_handlers.extend(self.on_skip_rewards);
        event_handlers.update_validator_set_handlers.extend(self.on_update_validator_set);
        event_handlers.finalize_block_handlers.extend(self.on_finalize_block);
        event_handlers.create_snapshot_handlers.extend(self.on_create_snapshot);
        if configuration.log_events {
            event_handlers.add_loggers();
        }

        let (event_publisher, event_bus, event_bus_shutdown) = if !event_handlers.is_empty() {
            let (event_publisher, event_subscriber) = mpsc::channel();
            let (event_bus_shutdown, shutdown_receiver) = mpsc::channel();
            let event_bus = start_event_bus(event_handlers, event_subscriber, shutdown_receiver);
            (Some(event_publisher), Some(event_bus), Some(event_bus_shutdown))
        } else {
            (None, None, None)
        };

        let indexer = match (configuration.block_service_mode, self.indexer) {
            (true, None) => {
                log::warn!("Block service mode is enabled but no indexer was set");
                None
            }
            (true, indexer) => indexer,
            (false, _) => None,
        };

        let fees = configuration
            .enable_tx_fee
            .then(|| RewardDistributor::new(configuration.reward_recipients()));
        let dispatcher = Dispatcher::new(self.executor, configuration.governance(), fees);
        let finalizer = BlockFinalizer::new(
            configuration.chain_id.clone(),
            dispatcher,
            RewardDistributor::new(configuration.reward_recipients()),
            configuration.static_rewards,
            event_publisher.clone(),
            indexer,
        );

        let snapshots = SnapshotStore::new(
            configuration.snapshot_interval,
            configuration.snapshot_chunk_size,
            configuration.snapshot_keep_recent,
            configuration.snapshot_max_size,
        );

        Application {
            consensus: ConsensusConnection::new(
                self.kv_store.clone(),
                finalizer,
                self.genesis,
                snapshots.clone(),
                event_publisher.clone(),
            ),
            mempool: MempoolConnection::new(self.kv_store.clone(), configuration.chain_id.clone()),
            info: InfoConnection::new(self.kv_store.clone()),
            state_sync: StateSyncConnection::new(self.kv_store, snapshots, event_publisher),
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// A running application. When this value is dropped, the handlers of every event published so far
/// are fired, and the background threads are shut down.
pub struct Application<K: KVStore, E: Executor> {
    consensus: ConsensusConnection<K, E>,
    mempool: MempoolConnection<K>,
    info: InfoConnection<K>,
    state_sync: StateSyncConnection<K>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

/// Borrows of the four connections of an [Application], which can be handed to different threads.
pub struct Connections<'a, K: KVStore, E: Executor> {
    pub consensus: &'a mut ConsensusConnection<K, E>,
    pub mempool: &'a MempoolConnection<K>,
    pub info: &'a InfoConnection<K>,
    pub state_sync: &'a mut StateSyncConnection<K>,
}

impl<K: KVStore, E: Executor> Application<K, E> {
    pub fn consensus(&mut self) -> &mut ConsensusConnection<K, E> {
        &mut self.consensus
    }

    pub fn mempool(&self) -> &MempoolConnection<K> {
        &self.mempool
    }

    pub fn info(&self) -> &InfoConnection<K> {
        &self.info
    }

    pub fn state_sync(&mut self) -> &mut StateSyncConnection<K> {
        &mut self.state_sync
    }

    pub fn connections(&mut self) -> Connections<'_, K, E> {
        Connections {
            consensus: &mut self.consensus,
            mempool: &self.mempool,
            info: &self.info,
            state_sync: &mut self.state_sync,
        }
    }
}

impl<K: KVStore, E: Executor> Drop for Application<K, E> {
    fn drop(&mut self) {
        if let Some(shutdown) = self.event_bus_shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            if event_bus.join().is_err() {
                log::error!("Event bus thread panicked");
            }
        }
    }
}

/// Write every update of a block into `kv_store` in one write batch.
pub(crate) fn write_updates<K: KVStore>(kv_store: &mut K, updates: &AppStateUpdates) {
    let mut wb = K::WriteBatch::new();
    for (key, value) in updates.inserts() {
        wb.set(key, value);
    }
    for key in updates.deletes() {
        wb.delete(key);
    }
    kv_store.write(wb);
}

/// Errors the consensus engine must treat as fatal: the node has to stop rather than risk committing
/// a state that differs from the other nodes'.
#[derive(Debug)]
pub enum ApplicationError {
    FinalizeError(FinalizeError),
    KVGetError(KVGetError),
    GenesisError(GenesisError),
    ChainIdMismatch { expected: ChainID, got: ChainID },
    AlreadyInitialized,
    /// A consensus request arrived in an order the protocol does not allow, e.g., `deliver_tx`
    /// before `begin_block`.
    OutOfOrder { request: &'static str },
}

impl From<FinalizeError> for ApplicationError {
    fn from(value: FinalizeError) -> Self {
        ApplicationError::FinalizeError(value)
    }
}

impl From<KVGetError> for ApplicationError {
    fn from(value: KVGetError) -> Self {
        ApplicationError::KVGetError(value)
    }
}

impl From<GenesisError> for ApplicationError {
    fn from(value: GenesisError) -> Self {
        ApplicationError::GenesisError(value)
    }
}

impl Display for ApplicationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::FinalizeError(err) => write!(f, "{}", err),
            ApplicationError::KVGetError(err) => write!(f, "{}", err),
            ApplicationError::GenesisError(err) => write!(f, "{}", err),
            ApplicationError::ChainIdMismatch { expected, got } => {
                write!(f, "Configured for chain {}, asked to start chain {}", expected, got)
            }
            ApplicationError::AlreadyInitialized => write!(f, "Chain is already initialized"),
            ApplicationError::OutOfOrder { request } => {
                write!(f, "Unexpected {} request", request)
            }
        }
    }
}
