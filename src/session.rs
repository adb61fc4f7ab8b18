//! Selected-process identity and its fetched history series.
//!
//! Every `select` bumps a generation counter and tags its history fetch with
//! it. A response is applied only if its generation is still current, which
//! soft-cancels requests overtaken by a newer selection without aborting
//! anything at the transport level.

use log::debug;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::error::MonitorError;
use crate::types::{HistoryPoint, Notice};

#[derive(Debug, Default)]
struct SelectionState {
    selected: Option<u32>,
    generation: u64,
    history: Vec<HistoryPoint>,
}

#[derive(Clone)]
pub struct DetailSession {
    state: Arc<Mutex<SelectionState>>,
    api: ApiClient,
    notices: mpsc::Sender<Notice>,
}

impl DetailSession {
    pub fn new(api: ApiClient, notices: mpsc::Sender<Notice>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SelectionState::default())),
            api,
            notices,
        }
    }

    /// Select a process and start fetching its history. A previous in-flight
    /// fetch is left alone; its result will be discarded as stale.
    pub fn select(&self, pid: u32) -> JoinHandle<()> {
        let generation = {
            let mut state = self.state.lock().unwrap();
            state.generation += 1;
            state.selected = Some(pid);
            state.history.clear();
            state.generation
        };

        let session = self.clone();
        tokio::spawn(async move {
            let result = session.api.fetch_history(pid).await;
            session.apply_history(generation, result);
        })
    }

    /// Clear the selection and series. Does not touch the generation
    /// counter, so responses for earlier selections stay cancelled.
    pub fn deselect(&self) {
        let mut state = self.state.lock().unwrap();
        state.selected = None;
        state.history.clear();
    }

    pub fn selected(&self) -> Option<u32> {
        self.state.lock().unwrap().selected
    }

    pub fn history(&self) -> Vec<HistoryPoint> {
        self.state.lock().unwrap().history.clone()
    }

    /// Reconcile a resolved history fetch against the current generation.
    fn apply_history(&self, generation: u64, result: Result<Vec<HistoryPoint>, MonitorError>) {
        let mut state = self.state.lock().unwrap();
        if generation != state.generation {
            debug!(
                "[session] discarding stale history response (generation {generation}, current {})",
                state.generation
            );
            return;
        }

        match result {
            Ok(mut series) => {
                series.sort_by_key(|point| point.timestamp);
                state.history = series;
            }
            // Backend does not collect history: success with an empty series
            Err(MonitorError::HistoryNotAvailable) => state.history.clear(),
            Err(err) => {
                state.history.clear();
                let _ = self
                    .notices
                    .try_send(Notice::error(format!("could not fetch process history: {err}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session() -> (DetailSession, mpsc::Receiver<Notice>) {
        let api = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let (tx, rx) = mpsc::channel(8);
        (DetailSession::new(api, tx), rx)
    }

    fn point(timestamp: i64) -> HistoryPoint {
        HistoryPoint {
            timestamp,
            memory_percent: 1.0,
            cpu_percent: 1.0,
        }
    }

    fn bump_generation(session: &DetailSession, pid: u32) -> u64 {
        let mut state = session.state.lock().unwrap();
        state.generation += 1;
        state.selected = Some(pid);
        state.history.clear();
        state.generation
    }

    #[tokio::test]
    async fn applies_current_generation_sorted() {
        let (session, _rx) = session();
        let generation = bump_generation(&session, 42);

        session.apply_history(generation, Ok(vec![point(30), point(10), point(20)]));

        let timestamps: Vec<i64> = session.history().iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn discards_stale_generation_silently() {
        let (session, mut rx) = session();
        let old = bump_generation(&session, 42);
        let _new = bump_generation(&session, 43);

        session.apply_history(old, Ok(vec![point(1)]));

        assert!(session.history().is_empty());
        assert_eq!(session.selected(), Some(43));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn not_collected_is_empty_series_without_notice() {
        let (session, mut rx) = session();
        let generation = bump_generation(&session, 42);

        session.apply_history(generation, Err(MonitorError::HistoryNotAvailable));

        assert!(session.history().is_empty());
        assert_eq!(session.selected(), Some(42));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_failures_surface_a_notice() {
        let (session, mut rx) = session();
        let generation = bump_generation(&session, 42);

        session.apply_history(generation, Err(MonitorError::Fetch("boom".to_string())));

        assert!(session.history().is_empty());
        let notice = rx.try_recv().unwrap();
        assert!(notice.message.contains("boom"));
    }

    #[tokio::test]
    async fn deselect_clears_pid_and_series_keeps_generation() {
        let (session, _rx) = session();
        let generation = bump_generation(&session, 42);
        session.apply_history(generation, Ok(vec![point(1)]));

        session.deselect();
        assert_eq!(session.selected(), None);
        assert!(session.history().is_empty());

        // a response for the pre-deselect generation is still applied only
        // against its own generation; deselect did not reset the counter
        assert_eq!(session.state.lock().unwrap().generation, generation);
    }
}
