use thiserror::Error;

/// Failure classes for the sync engine. All of these are locally recoverable:
/// none of them terminate the session.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Push channel closed or errored. Drives reconnect backoff.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success response or network failure on a poll or history request.
    /// Retried implicitly on the next scheduled cycle.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The backend does not collect per-process history. Not an error from the
    /// user's point of view; resolves to an empty series.
    #[error("process history not collected")]
    HistoryNotAvailable,

    /// A control command (termination) failed. The message is the backend's
    /// verbatim text where available. Never retried automatically.
    #[error("{0}")]
    Command(String),

    /// Malformed inbound payload. The message is discarded without touching
    /// the snapshot store.
    #[error("malformed payload: {0}")]
    Parse(#[from] serde_json::Error),
}
