//! Raw event collection.
//!
//! Collectors own the device nodes and the read loop. They hand each
//! record, tagged with its source index, to the dispatch loop in
//! [`crate::adaptor`] over a bounded channel.

pub mod discovery;
pub mod replay;
pub mod types;

#[cfg(target_os = "linux")]
pub mod evdev;

#[cfg(not(target_os = "linux"))]
pub mod noop;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub use discovery::{discover_devices, list_input_devices, InputDeviceInfo};
pub use replay::{load_capture, parse_capture, save_capture, write_capture, ReplayError};
pub use types::{EventClass, RawEvent, SourcedEvent};

#[cfg(target_os = "linux")]
pub use evdev::EvdevCollector;

/// Platform-agnostic collector type alias
#[cfg(target_os = "linux")]
pub type Collector = EvdevCollector;

#[cfg(not(target_os = "linux"))]
pub use noop::NoopCollector;

/// Platform-agnostic collector type alias
#[cfg(not(target_os = "linux"))]
pub type Collector = NoopCollector;

/// Which device nodes to read and how.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Device nodes; the position in this list is the source index
    pub device_paths: Vec<PathBuf>,
    /// Capacity of the channel to the dispatch loop
    pub channel_capacity: usize,
    /// Sleep between reads when a node has nothing pending
    pub poll_interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            device_paths: Vec::new(),
            channel_capacity: 10_000,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl CollectorConfig {
    pub fn for_devices(device_paths: Vec<PathBuf>) -> Self {
        Self {
            device_paths,
            ..Self::default()
        }
    }
}

/// Errors that can occur while starting collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("collector is already running")]
    AlreadyRunning,
    #[error("no input devices to read")]
    NoDevices,
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
