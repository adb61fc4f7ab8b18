pub mod alerts;
pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod monitor;
pub mod poller;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;
pub mod view;

pub use config::Config;
pub use error::MonitorError;
pub use monitor::Monitor;
pub use store::SnapshotStore;
pub use transport::TransportState;
pub use types::{AlertEvent, Notice, ProcessSample, Snapshot, SystemMemorySample};
pub use view::{SortDirection, SortField, ViewParams};
