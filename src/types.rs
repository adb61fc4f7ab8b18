//! Wire and domain types shared across the engine.
//!
//! Inbound payloads are decoded at the boundary into explicit variants;
//! anything non-conforming is rejected as a parse error instead of being
//! trusted shape-wise.

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// One process as reported by the backend. `pid` is the stable identity key
/// and is unique within a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub memory_rss_mb: f64,
    #[serde(default)]
    pub memory_percent: f32,
    #[serde(default)]
    pub cpu_percent: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemMemorySample {
    pub total: u64,
    pub available: u64,
    percent: Option<f32>,
}

impl SystemMemorySample {
    pub fn new(total: u64, available: u64, percent: Option<f32>) -> Self {
        Self {
            total,
            available,
            percent,
        }
    }

    /// Used-memory percentage, derived from total/available when the backend
    /// elides it.
    pub fn percent(&self) -> f32 {
        match self.percent {
            Some(p) => p,
            None if self.total > 0 => {
                ((self.total - self.available) as f64 / self.total as f64 * 100.0) as f32
            }
            None => 0.0,
        }
    }
}

/// Atomic replacement unit for the whole observed state. Immutable once
/// created; the store swaps whole snapshots and never merges fields across
/// them.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub sequence: u64,
    pub processes: Vec<ProcessSample>,
    pub system_memory: SystemMemorySample,
}

impl Snapshot {
    pub fn from_payload(sequence: u64, payload: SnapshotPayload) -> Self {
        Self {
            sequence,
            processes: payload.processes,
            system_memory: payload.system_memory,
        }
    }
}

/// Body shared by the push channel and the pull endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotPayload {
    pub processes: Vec<ProcessSample>,
    pub system_memory: SystemMemorySample,
}

/// Inbound frames on the push channel. The server mostly sends snapshot
/// payloads; acks for control messages are tolerated and ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireMessage {
    Snapshot(SnapshotPayload),
    Ack { action: String },
}

/// Decode one text frame from the push channel.
pub fn decode_frame(text: &str) -> Result<WireMessage, MonitorError> {
    Ok(serde_json::from_str(text)?)
}

/// Control frame asking the backend for an out-of-cycle snapshot.
pub const REFRESH_CONTROL_FRAME: &str = r#"{"action":"refresh"}"#;

/// One point of a process's fetched history series.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HistoryPoint {
    /// Epoch seconds.
    pub timestamp: i64,
    pub memory_percent: f32,
    pub cpu_percent: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KillResponse {
    pub success: bool,
    pub message: String,
}

/// Threshold-violation event handed to the notification sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub pid: u32,
    pub name: String,
    pub memory_percent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Dismissible, user-visible condition. Prefers backend-supplied text when
/// present.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_snapshot_frame() {
        let text = r#"{
            "processes": [
                {"pid": 100, "name": "chrome.exe", "username": "alice",
                 "status": "running", "start_time": "2025-01-01 10:00:00",
                 "memory_rss_mb": 512.5, "memory_percent": 12.5, "cpu_percent": 3.0}
            ],
            "system_memory": {"total": 1000, "available": 400, "percent": 60.0},
            "timestamp": 1735700000.0,
            "total_processes": 1
        }"#;

        match decode_frame(text).unwrap() {
            WireMessage::Snapshot(payload) => {
                assert_eq!(payload.processes.len(), 1);
                assert_eq!(payload.processes[0].pid, 100);
                assert_eq!(payload.system_memory.percent(), 60.0);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn decodes_ack_frame() {
        match decode_frame(r#"{"action":"refresh"}"#).unwrap() {
            WireMessage::Ack { action } => assert_eq!(action, "refresh"),
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn rejects_nonconforming_frame() {
        assert!(decode_frame("not json").is_err());
        assert!(decode_frame(r#"{"foo": 1}"#).is_err());
    }

    #[test]
    fn derives_memory_percent_when_absent() {
        let mem = SystemMemorySample::new(1000, 250, None);
        assert_eq!(mem.percent(), 75.0);

        let empty = SystemMemorySample::new(0, 0, None);
        assert_eq!(empty.percent(), 0.0);
    }
}
