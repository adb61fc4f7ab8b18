//! Single authoritative holder of the latest snapshot.
//!
//! Writes are totally ordered by sequence number. A write whose sequence is
//! not newer than the current state is dropped, never merged; this is what
//! resolves the race between a straggling poll response and a newer push
//! message. Ingestion paths reserve their sequence number when a request is
//! issued, so a late response loses to anything that landed meanwhile.

use log::{debug, trace};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::types::Snapshot;

const FANOUT_DEPTH: usize = 64;

pub struct SnapshotStore {
    current: Mutex<Arc<Snapshot>>,
    next_seq: AtomicU64,
    fanout: broadcast::Sender<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (fanout, _) = broadcast::channel(FANOUT_DEPTH);
        Self {
            current: Mutex::new(Arc::new(Snapshot::default())),
            next_seq: AtomicU64::new(0),
            fanout,
        }
    }

    /// Hand out the next ingestion sequence number. Called by the active
    /// ingestion path when it issues a request or accepts a push frame.
    pub fn reserve_sequence(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the current snapshot if `snapshot.sequence` is newer.
    /// Returns whether the write was accepted; a stale write is a silent
    /// no-op, not an error.
    pub fn write(&self, snapshot: Snapshot) -> bool {
        let snapshot = Arc::new(snapshot);
        {
            let mut current = self.current.lock().unwrap();
            if snapshot.sequence <= current.sequence {
                debug!(
                    "[store] dropping stale write seq={} (current seq={})",
                    snapshot.sequence, current.sequence
                );
                return false;
            }
            *current = Arc::clone(&snapshot);
        }
        trace!(
            "[store] applied seq={} ({} processes)",
            snapshot.sequence,
            snapshot.processes.len()
        );
        // No subscribers is fine; the store does not care who listens.
        let _ = self.fanout.send(snapshot);
        true
    }

    /// Current snapshot, synchronously.
    pub fn read(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.lock().unwrap())
    }

    /// Every accepted write, in acceptance order.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.fanout.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
