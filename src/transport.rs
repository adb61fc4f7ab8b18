//! Push-channel connection lifecycle.
//!
//! The manager owns the WebSocket and runs a fixed cycle:
//! `Idle → Connecting → Connected ⇄ Disconnected → Connecting …`, retrying
//! forever with a fixed backoff. While Connected it is the single ingestion
//! writer; the polling fallback watches the published state and takes over
//! the instant the channel drops.

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::store::SnapshotStore;
use crate::types::{self, Notice, WireMessage, REFRESH_CONTROL_FRAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

/// Cheap handle other components keep to observe the channel and request
/// refreshes.
#[derive(Clone)]
pub struct TransportHandle {
    state: watch::Receiver<TransportState>,
    refresh: mpsc::Sender<()>,
}

impl TransportHandle {
    pub fn state(&self) -> TransportState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == TransportState::Connected
    }

    /// Subscribe to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<TransportState> {
        self.state.clone()
    }

    /// Fire-and-forget refresh control message. A no-op unless Connected;
    /// when disconnected the fallback's own interval covers refreshing.
    pub fn request_refresh(&self) {
        if self.is_connected() {
            let _ = self.refresh.try_send(());
        }
    }

    #[cfg(test)]
    pub(crate) fn for_test(
        state: watch::Receiver<TransportState>,
        refresh: mpsc::Sender<()>,
    ) -> Self {
        Self { state, refresh }
    }
}

/// Spawn the connection manager task.
pub fn spawn(
    ws_url: String,
    store: Arc<SnapshotStore>,
    backoff: Duration,
    notices: mpsc::Sender<Notice>,
) -> (TransportHandle, JoinHandle<()>) {
    let (state_tx, state_rx) = watch::channel(TransportState::Idle);
    let (refresh_tx, refresh_rx) = mpsc::channel(8);
    let handle = TransportHandle {
        state: state_rx,
        refresh: refresh_tx,
    };
    let task = tokio::spawn(run(ws_url, store, backoff, state_tx, refresh_rx, notices));
    (handle, task)
}

async fn run(
    ws_url: String,
    store: Arc<SnapshotStore>,
    backoff: Duration,
    state_tx: watch::Sender<TransportState>,
    mut refresh_rx: mpsc::Receiver<()>,
    notices: mpsc::Sender<Notice>,
) {
    loop {
        state_tx.send_replace(TransportState::Connecting);
        match connect_async(ws_url.as_str()).await {
            Ok((socket, _)) => {
                info!("[transport] connected to {ws_url}");
                state_tx.send_replace(TransportState::Connected);
                let (mut sink, mut stream) = socket.split();

                loop {
                    tokio::select! {
                        Some(()) = refresh_rx.recv() => {
                            debug!("[transport] sending refresh control message");
                            if sink.send(Message::Text(REFRESH_CONTROL_FRAME.into())).await.is_err() {
                                break;
                            }
                        }
                        inbound = stream.next() => match inbound {
                            Some(Ok(Message::Text(text))) => handle_frame(&text, &store),
                            Some(Ok(Message::Close(_))) | None => {
                                info!("[transport] channel closed by peer");
                                break;
                            }
                            Some(Ok(_)) => {} // ping/pong/binary
                            Some(Err(err)) => {
                                warn!("[transport] channel error: {err}");
                                let _ = notices
                                    .try_send(Notice::warning(format!("push channel error: {err}")));
                                break;
                            }
                        }
                    }
                }
            }
            Err(err) => {
                debug!("[transport] connect to {ws_url} failed: {err}");
            }
        }

        state_tx.send_replace(TransportState::Disconnected);
        sleep(backoff).await;
    }
}

/// Decode one inbound frame and offer any snapshot payload to the store.
/// Malformed frames are discarded without touching the store.
pub(crate) fn handle_frame(text: &str, store: &SnapshotStore) {
    match types::decode_frame(text) {
        Ok(WireMessage::Snapshot(payload)) => {
            let sequence = store.reserve_sequence();
            store.write(crate::types::Snapshot::from_payload(sequence, payload));
        }
        Ok(WireMessage::Ack { action }) => {
            debug!("[transport] ack for action '{action}'");
        }
        Err(err) => {
            warn!("[transport] discarding malformed frame: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: &str = r#"{
        "processes": [{"pid": 1, "name": "init", "memory_rss_mb": 4.0,
                       "memory_percent": 0.1, "cpu_percent": 0.0}],
        "system_memory": {"total": 1000, "available": 500, "percent": 50.0}
    }"#;

    #[test]
    fn snapshot_frame_is_written_to_store() {
        let store = SnapshotStore::new();
        handle_frame(FRAME, &store);

        let current = store.read();
        assert_eq!(current.sequence, 1);
        assert_eq!(current.processes[0].name, "init");
    }

    #[test]
    fn malformed_frame_leaves_store_untouched() {
        let store = SnapshotStore::new();
        handle_frame("{\"garbage\": true}", &store);
        handle_frame("not json at all", &store);
        assert_eq!(store.read().sequence, 0);
    }

    #[test]
    fn ack_frame_is_ignored() {
        let store = SnapshotStore::new();
        handle_frame(r#"{"action":"refresh"}"#, &store);
        assert_eq!(store.read().sequence, 0);
    }

    #[tokio::test]
    async fn refresh_is_noop_unless_connected() {
        let (state_tx, state_rx) = watch::channel(TransportState::Disconnected);
        let (refresh_tx, mut refresh_rx) = mpsc::channel(8);
        let handle = TransportHandle::for_test(state_rx, refresh_tx);

        handle.request_refresh();
        assert!(refresh_rx.try_recv().is_err());

        state_tx.send_replace(TransportState::Connected);
        handle.request_refresh();
        assert!(refresh_rx.try_recv().is_ok());
    }
}
