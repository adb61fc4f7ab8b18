//! Engine lifecycle: one context object owning every component and task.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::alerts;
use crate::api::ApiClient;
use crate::commands::CommandDispatcher;
use crate::config::Config;
use crate::poller::{self, PollerConfig, PollerHandle};
use crate::session::DetailSession;
use crate::store::SnapshotStore;
use crate::transport::{self, TransportHandle};
use crate::types::{AlertEvent, Notice};
use crate::view::ViewParams;

const EVENT_DEPTH: usize = 64;

/// The running engine. Create with [`Monitor::start`], tear down with
/// [`Monitor::shutdown`] (also run on drop). All state lives here; there are
/// no module-level globals.
pub struct Monitor {
    pub store: Arc<SnapshotStore>,
    pub transport: TransportHandle,
    pub poller: PollerHandle,
    pub session: DetailSession,
    pub commands: CommandDispatcher,
    /// Alert events for the notification sink.
    pub alerts: mpsc::Receiver<AlertEvent>,
    /// Dismissible user-visible conditions.
    pub notices: mpsc::Receiver<Notice>,
    tasks: Vec<JoinHandle<()>>,
}

impl Monitor {
    pub fn start(config: Config, view: &ViewParams) -> Result<Monitor> {
        let api = ApiClient::new(&config.connection.base_url, config.request_timeout())?;
        let store = Arc::new(SnapshotStore::new());

        let (notice_tx, notice_rx) = mpsc::channel(EVENT_DEPTH);
        let (alert_tx, alert_rx) = mpsc::channel(EVENT_DEPTH);

        let (transport, transport_task) = transport::spawn(
            config.ws_url(),
            Arc::clone(&store),
            config.reconnect_backoff(),
            notice_tx.clone(),
        );

        let (poller, poller_task) = poller::spawn(
            api.clone(),
            Arc::clone(&store),
            transport.watch_state(),
            PollerConfig {
                interval: config.poll_interval(),
                top: view.top_n,
                sort_by: view.sort_field,
            },
            notice_tx.clone(),
        );

        let alert_task = alerts::spawn(&store, config.alerts.clone(), alert_tx);

        let session = DetailSession::new(api.clone(), notice_tx);
        let commands =
            CommandDispatcher::new(api, session.clone(), transport.clone(), poller.clone());

        Ok(Monitor {
            store,
            transport,
            poller,
            session,
            commands,
            alerts: alert_rx,
            notices: notice_rx,
            tasks: vec![transport_task, poller_task, alert_task],
        })
    }

    /// Stop every background task. Timers die with their tasks; in-flight
    /// history fetches are soft-cancelled by the selection generation.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
