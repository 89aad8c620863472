/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Snapshots of the committed state, for nodes that catch up without replaying every block.
//!
//! ## Snapshot format 1
//!
//! A snapshot is the Borsh serialization of a [`SnapshotPayload`]: the height and app hash it was
//! taken at, and every key-value pair of the store in ascending order of key. The serialization is
//! cut into chunks of at most `snapshot_chunk_size` bytes. The [`Snapshot::hash`] is the SHA256 hash
//! of the whole serialization.
//!
//! ## Restoring
//!
//! A [`Restore`] stages chunks in memory, up to a configured maximum snapshot size. Offers that
//! announce more chunks than that size allows are rejected before anything is staged. Nothing is written until the last missing chunk arrives and
//! the reassembled payload matches the snapshot's hash, height and app hash. The payload is then
//! written as a single write batch that replaces the whole store, so a half-restored state is never
//! visible.

use std::{
    fmt::{self, Display, Formatter},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    state::pluggables::{KVStore, WriteBatch},
    types::{
        basic::{BlockHeight, CryptoHash},
        crypto_primitives::sha256,
    },
};

/// The only snapshot format this crate creates and accepts.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Description of a snapshot, as advertised to other nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub height: BlockHeight,
    pub format: u32,
    pub chunks: u32,
    pub hash: CryptoHash,
    /// App hash at `height`.
    pub metadata: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SnapshotPayload {
    pub height: BlockHeight,
    pub app_hash: CryptoHash,
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
}

struct StoredSnapshot {
    snapshot: Snapshot,
    chunks: Vec<Vec<u8>>,
}

/// Snapshots created by this node, most recent last. Cloning shares the store.
#[derive(Clone)]
pub struct SnapshotStore {
    snapshots: Arc<Mutex<Vec<StoredSnapshot>>>,
    interval: Option<u64>,
    chunk_size: usize,
    keep_recent: usize,
    max_size: u64,
}

impl SnapshotStore {
    pub fn new(
        interval: Option<u64>,
        chunk_size: usize,
        keep_recent: usize,
        max_size: u64,
    ) -> SnapshotStore {
        SnapshotStore {
            snapshots: Arc::new(Mutex::new(Vec::new())),
            interval,
            chunk_size: chunk_size.max(1),
            keep_recent,
            max_size,
        }
    }

    /// Limits on snapshots offered by other nodes, assuming they are cut into chunks of the same
    /// size as this node's.
    pub fn restore_limits(&self) -> RestoreLimits {
        let max_chunks = self.max_size.div_ceil(self.chunk_size as u64).max(1);
        RestoreLimits {
            max_chunks: u32::try_from(max_chunks).unwrap_or(u32::MAX),
            max_size: self.max_size,
        }
    }

    /// Whether a snapshot should be created after committing `height`.
    pub fn is_due(&self, height: BlockHeight) -> bool {
        match self.interval {
            Some(interval) if interval > 0 => height.int() % interval == 0,
            _ => false,
        }
    }

    /// Cut a snapshot of the committed `kv_store` at `height`, then prune all but the most recent
    /// `keep_recent` snapshots.
    pub fn create<K: KVStore>(
        &self,
        kv_store: &K,
        height: BlockHeight,
        app_hash: CryptoHash,
    ) -> Snapshot {
        let payload = SnapshotPayload {
            height,
            app_hash,
            entries: kv_store.entries(),
        };
        let bytes = payload.try_to_vec().unwrap();
        let chunks: Vec<Vec<u8>> = bytes.chunks(self.chunk_size).map(<[u8]>::to_vec).collect();
        let snapshot = Snapshot {
            height,
            format: SNAPSHOT_FORMAT,
            chunks: chunks.len() as u32,
            hash: sha256(&bytes),
            metadata: app_hash.bytes().to_vec(),
        };

        let mut snapshots = self.lock();
        snapshots.retain(|stored| stored.snapshot.height != height);
        snapshots.push(StoredSnapshot {
            snapshot: snapshot.clone(),
            chunks,
        });
        let excess = snapshots.len().saturating_sub(self.keep_recent.max(1));
        snapshots.drain(..excess);

        snapshot
    }

    pub fn list(&self) -> Vec<Snapshot> {
        self.lock()
            .iter()
            .map(|stored| stored.snapshot.clone())
            .collect()
    }

    /// Get chunk number `chunk` of the snapshot at `height`, if it is still kept.
    pub fn load_chunk(&self, height: BlockHeight, format: u32, chunk: u32) -> Option<Vec<u8>> {
        if format != SNAPSHOT_FORMAT {
            return None;
        }
        self.lock()
            .iter()
            .find(|stored| stored.snapshot.height == height)
            .and_then(|stored| stored.chunks.get(chunk as usize).cloned())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredSnapshot>> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestoreLimits {
    pub max_chunks: u32,
    pub max_size: u64,
}

/// A snapshot being restored from chunks sent by other nodes.
pub struct Restore {
    snapshot: Snapshot,
    app_hash: CryptoHash,
    chunks: Vec<Option<Vec<u8>>>,
    staged: u64,
    limits: RestoreLimits,
}

impl Restore {
    /// Accept `snapshot` for restoring if this node can use it: it must be in a supported format,
    /// have at least one chunk but no more than `limits` allow, and be taken above `local_height`.
    pub fn offer(
        snapshot: Snapshot,
        app_hash: CryptoHash,
        local_height: BlockHeight,
        limits: RestoreLimits,
    ) -> Result<Restore, SnapshotError> {
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(SnapshotError::UnsupportedFormat {
                format: snapshot.format,
            });
        }
        if snapshot.height <= local_height {
            return Err(SnapshotError::NotAhead {
                snapshot: snapshot.height,
                local: local_height,
            });
        }
        if snapshot.chunks == 0 {
            return Err(SnapshotError::Empty);
        }
        if snapshot.chunks > limits.max_chunks {
            return Err(SnapshotError::TooLarge {
                chunks: snapshot.chunks,
                max_chunks: limits.max_chunks,
            });
        }
        let chunks = vec![None; snapshot.chunks as usize];
        Ok(Restore {
            snapshot,
            app_hash,
            chunks,
            staged: 0,
            limits,
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Stage chunk number `index`. Returns the verified payload once every chunk has been staged.
    pub fn apply_chunk(
        &mut self,
        index: u32,
        chunk: Vec<u8>,
    ) -> Result<Option<SnapshotPayload>, SnapshotError> {
        let slot = self
            .chunks
            .get_mut(index as usize)
            .ok_or(SnapshotError::ChunkOutOfRange {
                index,
                chunks: self.snapshot.chunks,
            })?;
        let replaced = slot.as_ref().map_or(0, |staged| staged.len() as u64);
        let staged = self.staged - replaced + chunk.len() as u64;
        if staged > self.limits.max_size {
            return Err(SnapshotError::ExceedsMaxSize {
                max_size: self.limits.max_size,
            });
        }
        self.staged = staged;
        *slot = Some(chunk);

        if self.chunks.iter().any(Option::is_none) {
            return Ok(None);
        }

        let bytes: Vec<u8> = self.chunks.iter().flatten().flatten().copied().collect();
        if sha256(&bytes) != self.snapshot.hash {
            return Err(SnapshotError::HashMismatch);
        }
        let payload =
            SnapshotPayload::try_from_slice(&bytes).map_err(SnapshotError::DeserializeError)?;
        if payload.height != self.snapshot.height || payload.app_hash != self.app_hash {
            return Err(SnapshotError::HeaderMismatch);
        }
        Ok(Some(payload))
    }
}

/// Replace the whole content of `kv_store` with the entries of `payload`, in one write batch.
pub(crate) fn install<K: KVStore>(kv_store: &mut K, payload: &SnapshotPayload) {
    let mut wb = K::WriteBatch::new();
    for (key, _) in kv_store.entries() {
        wb.delete(&key);
    }
    for (key, value) in &payload.entries {
        wb.set(key, value);
    }
    kv_store.write(wb);
}

#[derive(Debug)]
pub enum SnapshotError {
    UnsupportedFormat { format: u32 },
    NotAhead { snapshot: BlockHeight, local: BlockHeight },
    Empty,
    TooLarge { chunks: u32, max_chunks: u32 },
    ExceedsMaxSize { max_size: u64 },
    NoRestoreInProgress,
    ChunkOutOfRange { index: u32, chunks: u32 },
    HashMismatch,
    HeaderMismatch,
    DeserializeError(std::io::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::UnsupportedFormat { format } => {
                write!(f, "Unsupported snapshot format {}", format)
            }
            SnapshotError::NotAhead { snapshot, local } => write!(
                f,
                "Snapshot at height {} is not ahead of local height {}",
                snapshot, local
            ),
            SnapshotError::Empty => write!(f, "Snapshot has no chunks"),
            SnapshotError::TooLarge { chunks, max_chunks } => write!(
                f,
                "Snapshot has {} chunks, more than the maximum of {}",
                chunks, max_chunks
            ),
            SnapshotError::ExceedsMaxSize { max_size } => {
                write!(f, "Snapshot content exceeds the maximum of {} bytes", max_size)
            }
            SnapshotError::NoRestoreInProgress => write!(f, "No snapshot has been accepted"),
            SnapshotError::ChunkOutOfRange { index, chunks } => {
                write!(f, "Chunk {} out of range of {} chunks", index, chunks)
            }
            SnapshotError::HashMismatch => write!(f, "Snapshot content does not match its hash"),
            SnapshotError::HeaderMismatch => {
                write!(f, "Snapshot content does not match its height or app hash")
            }
            SnapshotError::DeserializeError(err) => {
                write!(f, "Failed to deserialize snapshot: {}", err)
            }
        }
    }
}
