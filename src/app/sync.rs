/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::{sync::mpsc::Sender, time::SystemTime};

use crate::{
    events::*,
    state::pluggables::{KVGet, KVStore},
    state_sync::{install, Restore, SnapshotError, SnapshotStore},
};

use super::messages::*;

/// The connection through which the consensus engine serves this node's snapshots to other nodes,
/// and restores a snapshot offered by other nodes.
pub struct StateSyncConnection<K: KVStore> {
    kv_store: K,
    snapshots: SnapshotStore,
    restore: Option<Restore>,
    event_publisher: Option<Sender<Event>>,
}

impl<K: KVStore> StateSyncConnection<K> {
    pub(crate) fn new(
        kv_store: K,
        snapshots: SnapshotStore,
        event_publisher: Option<Sender<Event>>,
    ) -> StateSyncConnection<K> {
        StateSyncConnection {
            kv_store,
            snapshots,
            restore: None,
            event_publisher,
        }
    }

    pub fn list_snapshots(&self) -> ResponseListSnapshots {
        ResponseListSnapshots {
            snapshots: self.snapshots.list(),
        }
    }

    pub fn load_snapshot_chunk(&self, request: &RequestLoadSnapshotChunk) -> ResponseLoadSnapshotChunk {
        ResponseLoadSnapshotChunk {
            chunk: self
                .snapshots
                .load_chunk(request.height, request.format, request.chunk)
                .unwrap_or_default(),
        }
    }

    /// Decide whether to restore the offered snapshot. Accepting a snapshot discards any restore
    /// in progress.
    pub fn offer_snapshot(&mut self, request: RequestOfferSnapshot) -> OfferSnapshotResult {
        let local_height = match self.kv_store.last_block_height() {
            Ok(height) => height.unwrap_or_default(),
            Err(err) => {
                log::error!("Cannot read local height, rejecting snapshot: {}", err);
                return OfferSnapshotResult::Reject;
            }
        };

        let limits = self.snapshots.restore_limits();
        match Restore::offer(request.snapshot, request.app_hash, local_height, limits) {
            Ok(restore) => {
                self.restore = Some(restore);
                OfferSnapshotResult::Accept
            }
            Err(SnapshotError::UnsupportedFormat { format }) => {
                log::info!("Rejecting snapshot of format {}", format);
                OfferSnapshotResult::RejectFormat
            }
            Err(err) => {
                log::info!("Rejecting snapshot: {}", err);
                OfferSnapshotResult::Reject
            }
        }
    }

    /// Stage a chunk of the accepted snapshot. The chunk that completes it writes the whole snapshot
    /// into the key-value store.
    pub fn apply_snapshot_chunk(
        &mut self,
        request: RequestApplySnapshotChunk,
    ) -> ApplySnapshotChunkResult {
        let Some(restore) = self.restore.as_mut() else {
            log::warn!("{}", SnapshotError::NoRestoreInProgress);
            return ApplySnapshotChunkResult::RejectSnapshot;
        };

        match restore.apply_chunk(request.index, request.chunk) {
            Ok(None) => ApplySnapshotChunkResult::Accept,
            Ok(Some(payload)) => {
                install(&mut self.kv_store, &payload);
                self.restore = None;
                Event::publish(
                    &self.event_publisher,
                    Event::RestoreSnapshot(RestoreSnapshotEvent {
                        timestamp: SystemTime::now(),
                        height: payload.height,
                        app_hash: payload.app_hash,
                    }),
                );
                ApplySnapshotChunkResult::Accept
            }
            Err(err) => {
                log::warn!(
                    "Discarding snapshot at height {}: {}",
                    restore.snapshot().height,
                    err
                );
                self.restore = None;
                ApplySnapshotChunkResult::RejectSnapshot
            }
        }
    }
}
