//! User-initiated mutation and refresh commands.

use log::info;

use crate::api::ApiClient;
use crate::error::MonitorError;
use crate::poller::PollerHandle;
use crate::session::DetailSession;
use crate::transport::TransportHandle;

/// Issues backend commands and reconciles the results into selection state.
/// Never writes the snapshot store directly: a terminated process disappears
/// on the next ingestion cycle.
#[derive(Clone)]
pub struct CommandDispatcher {
    api: ApiClient,
    session: DetailSession,
    transport: TransportHandle,
    poller: PollerHandle,
}

impl CommandDispatcher {
    pub fn new(
        api: ApiClient,
        session: DetailSession,
        transport: TransportHandle,
        poller: PollerHandle,
    ) -> Self {
        Self {
            api,
            session,
            transport,
            poller,
        }
    }

    /// Send a termination request. The caller is responsible for having
    /// confirmed the action with the user first. On success the backend's
    /// message is returned; on failure its text is surfaced verbatim and
    /// nothing is retried.
    pub async fn terminate(&self, pid: u32) -> Result<String, MonitorError> {
        let response = self.api.kill_process(pid).await?;
        if !response.success {
            return Err(MonitorError::Command(response.message));
        }

        info!("[commands] terminated pid {pid}: {}", response.message);
        if self.session.selected() == Some(pid) {
            self.session.deselect();
        }
        Ok(response.message)
    }

    /// Ask for fresh data now. Connected: a refresh control frame on the
    /// push channel. Otherwise: an out-of-cycle poll, bounded by the
    /// poller's one-in-flight rule.
    pub fn refresh_now(&self) {
        if self.transport.is_connected() {
            self.transport.request_refresh();
        } else {
            self.poller.kick();
        }
    }
}
