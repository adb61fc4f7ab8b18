//! HTTP client for the backend's pull, history, and command endpoints.

use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::error::MonitorError;
use crate::types::{HistoryPoint, KillResponse, SnapshotPayload};
use crate::view::SortField;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET /api/processes?top=..&sort_by=..` — same body shape as a push frame.
    pub async fn fetch_snapshot(
        &self,
        top: usize,
        sort_by: SortField,
    ) -> Result<SnapshotPayload, MonitorError> {
        let url = format!(
            "{}/api/processes?top={}&sort_by={}",
            self.base_url,
            top,
            sort_by.as_str()
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MonitorError::Fetch(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(MonitorError::Fetch(format!(
                "poll returned status {}",
                resp.status()
            )));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| MonitorError::Fetch(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `GET /api/processes/{pid}/history`. A 404 is the backend's distinct
    /// "history not collected" signal, not a generic failure.
    pub async fn fetch_history(&self, pid: u32) -> Result<Vec<HistoryPoint>, MonitorError> {
        let url = format!("{}/api/processes/{}/history", self.base_url, pid);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| MonitorError::Fetch(e.to_string()))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(MonitorError::HistoryNotAvailable);
        }
        if !resp.status().is_success() {
            return Err(MonitorError::Fetch(format!(
                "history returned status {}",
                resp.status()
            )));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| MonitorError::Fetch(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /api/processes/kill` with `{pid}`. A reachable backend answers
    /// 200 with `{success, message}` even for refused kills; transport-level
    /// failures become command errors with our own text.
    pub async fn kill_process(&self, pid: u32) -> Result<KillResponse, MonitorError> {
        let url = format!("{}/api/processes/kill", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "pid": pid }))
            .send()
            .await
            .map_err(|e| MonitorError::Command(format!("failed to reach backend: {e}")))?;
        if !resp.status().is_success() {
            return Err(MonitorError::Command(format!(
                "kill returned status {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| MonitorError::Command(format!("malformed kill response: {e}")))
    }
}
