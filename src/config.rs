use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Session-scoped engine configuration. Values outside the supported ranges
/// are clamped, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub polling: PollingConfig,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Base HTTP URL of the monitor backend.
    pub base_url: String,
    /// Fixed delay between push-channel reconnect attempts, in seconds.
    pub reconnect_backoff_secs: u64,
    /// Request timeout for pull/history/command calls, in seconds.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Fallback poll interval in milliseconds. Clamped to 500..=10000.
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertConfig {
    pub enable_alerts: bool,
    /// Memory usage percentage above which a process alerts. Clamped to 1..=50.
    pub memory_threshold: f32,
    /// CPU percentage used for view highlighting. Clamped to 1..=100.
    pub cpu_threshold: f32,
    /// Minimum seconds between repeated alerts for the same pid. Clamped to 5..=60.
    pub alert_debounce_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            reconnect_backoff_secs: 5,
            request_timeout_secs: 10,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enable_alerts: true,
            memory_threshold: 10.0,
            cpu_threshold: 50.0,
            alert_debounce_secs: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            polling: PollingConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.as_ref().display()))?;
        config.clamp();
        Ok(config)
    }

    /// Force every tunable into its supported range.
    pub fn clamp(&mut self) {
        self.polling.interval_ms = self.polling.interval_ms.clamp(500, 10_000);
        self.alerts.memory_threshold = self.alerts.memory_threshold.clamp(1.0, 50.0);
        self.alerts.cpu_threshold = self.alerts.cpu_threshold.clamp(1.0, 100.0);
        self.alerts.alert_debounce_secs = self.alerts.alert_debounce_secs.clamp(5, 60);
        self.connection.reconnect_backoff_secs = self.connection.reconnect_backoff_secs.max(1);
        self.connection.request_timeout_secs = self.connection.request_timeout_secs.max(1);
    }

    /// Push-channel URL derived from the HTTP base URL.
    pub fn ws_url(&self) -> String {
        let base = self.connection.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{base}")
        };
        format!("{ws_base}/ws/processes")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.connection.reconnect_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.request_timeout_secs)
    }
}
