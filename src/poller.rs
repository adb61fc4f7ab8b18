//! Polling fallback, active only while the push channel is down.
//!
//! The controller is a single task that awaits its own fetches, so at most
//! one request is ever in flight: a tick that comes due mid-fetch is skipped
//! outright (`MissedTickBehavior::Skip`), never queued. Sequence numbers are
//! reserved when a fetch is issued, which lets the store reject the response
//! if a reconnected push channel delivered newer data in the meantime.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::ApiClient;
use crate::store::SnapshotStore;
use crate::transport::TransportState;
use crate::types::{Notice, Snapshot};
use crate::view::SortField;

/// Handle for requesting an out-of-cycle poll. The kick channel holds a
/// single slot; kicks landing while a fetch is outstanding coalesce instead
/// of stacking up.
#[derive(Clone)]
pub struct PollerHandle {
    kick: mpsc::Sender<()>,
}

impl PollerHandle {
    pub fn kick(&self) {
        let _ = self.kick.try_send(());
    }
}

pub struct PollerConfig {
    pub interval: Duration,
    /// `top` forwarded to the pull endpoint; 0 asks for everything.
    pub top: usize,
    pub sort_by: SortField,
}

pub fn spawn(
    api: ApiClient,
    store: Arc<SnapshotStore>,
    transport_state: watch::Receiver<TransportState>,
    config: PollerConfig,
    notices: mpsc::Sender<Notice>,
) -> (PollerHandle, JoinHandle<()>) {
    let (kick_tx, kick_rx) = mpsc::channel(1);
    let handle = PollerHandle { kick: kick_tx };
    let task = tokio::spawn(run(api, store, transport_state, config, kick_rx, notices));
    (handle, task)
}

async fn run(
    api: ApiClient,
    store: Arc<SnapshotStore>,
    mut transport_state: watch::Receiver<TransportState>,
    config: PollerConfig,
    mut kick_rx: mpsc::Receiver<()>,
    notices: mpsc::Sender<Notice>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let active = *transport_state.borrow_and_update() != TransportState::Connected;

        tokio::select! {
            changed = transport_state.changed() => {
                if changed.is_err() {
                    break;
                }
                let now_active = *transport_state.borrow() != TransportState::Connected;
                if now_active && !active {
                    info!("[poller] push channel down, taking over ingestion");
                    // immediate fetch, then resume the fixed cadence
                    ticker.reset();
                    fetch_once(&api, &store, &config, &notices).await;
                } else if !now_active && active {
                    info!("[poller] push channel up, standing down");
                }
            }
            _ = ticker.tick(), if active => {
                fetch_once(&api, &store, &config, &notices).await;
            }
            Some(()) = kick_rx.recv(), if active => {
                debug!("[poller] out-of-cycle poll requested");
                fetch_once(&api, &store, &config, &notices).await;
            }
        }
    }
}

/// One pull request. The sequence is reserved before the request goes out;
/// a response that resolves after newer data landed is dropped by the store.
async fn fetch_once(
    api: &ApiClient,
    store: &SnapshotStore,
    config: &PollerConfig,
    notices: &mpsc::Sender<Notice>,
) {
    let sequence = store.reserve_sequence();
    match api.fetch_snapshot(config.top, config.sort_by).await {
        Ok(payload) => {
            store.write(Snapshot::from_payload(sequence, payload));
        }
        Err(err) => {
            warn!("[poller] fetch failed: {err}");
            let _ = notices.try_send(Notice::warning(format!("poll failed: {err}")));
        }
    }
}
