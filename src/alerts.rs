//! Threshold alerting with per-pid debounce.
//!
//! Each accepted snapshot yields at most one alert: the single representative
//! process standing in for every threshold violation in that cycle, which
//! avoids notification storms when many processes exceed the threshold at
//! once.

use log::warn;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::AlertConfig;
use crate::store::SnapshotStore;
use crate::types::{AlertEvent, Snapshot};

pub struct AlertEvaluator {
    config: AlertConfig,
    // pid -> time of the last emitted alert
    last_alert: HashMap<u32, Instant>,
}

impl AlertEvaluator {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            last_alert: HashMap::new(),
        }
    }

    /// Evaluate one accepted snapshot. With alerts disabled this mutates
    /// nothing, not even the debounce map.
    pub fn evaluate(&mut self, snapshot: &Snapshot, now: Instant) -> Option<AlertEvent> {
        if !self.config.enable_alerts {
            return None;
        }

        let event = self.representative(snapshot).and_then(|sample| {
            let debounce = Duration::from_secs(self.config.alert_debounce_secs);
            let suppressed = self
                .last_alert
                .get(&sample.pid)
                .is_some_and(|last| now - *last < debounce);
            if suppressed {
                return None;
            }
            self.last_alert.insert(sample.pid, now);
            Some(AlertEvent {
                pid: sample.pid,
                name: sample.name.clone(),
                memory_percent: sample.memory_percent,
            })
        });

        self.prune(snapshot);
        event
    }

    /// Highest memory_percent above threshold, ties by ascending pid.
    fn representative<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a crate::types::ProcessSample> {
        snapshot
            .processes
            .iter()
            .filter(|p| p.memory_percent > self.config.memory_threshold)
            .max_by(|a, b| {
                a.memory_percent
                    .partial_cmp(&b.memory_percent)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.pid.cmp(&a.pid))
            })
    }

    /// Drop debounce entries for pids no longer present, so a later,
    /// unrelated process reusing a pid is not blocked by stale state.
    fn prune(&mut self, snapshot: &Snapshot) {
        if self.last_alert.is_empty() {
            return;
        }
        self.last_alert
            .retain(|pid, _| snapshot.processes.iter().any(|p| p.pid == *pid));
    }
}

/// Subscribe to the store and forward alert events to the notification sink.
pub fn spawn(
    store: &SnapshotStore,
    config: AlertConfig,
    events: mpsc::Sender<AlertEvent>,
) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        let mut evaluator = AlertEvaluator::new(config);
        loop {
            match rx.recv().await {
                Ok(snapshot) => {
                    if let Some(event) = evaluator.evaluate(&snapshot, Instant::now())
                        && events.send(event).await.is_err()
                    {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("[alerts] lagged behind store fanout, skipped {missed} snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
