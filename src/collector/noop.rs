//! Non-Linux (noop) implementation of event collection.
//!
//! This exists so the crate (and binary) can compile on targets without
//! evdev. Replay still works everywhere.

use crate::collector::types::SourcedEvent;
use crate::collector::{CollectorConfig, CollectorError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A noop collector that never emits events.
pub struct NoopCollector {
    config: CollectorConfig,
    _sender: Sender<SourcedEvent>,
    receiver: Receiver<SourcedEvent>,
    running: Arc<AtomicBool>,
}

impl NoopCollector {
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(config.channel_capacity);
        Self {
            config,
            _sender: sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the collector as running.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        if self.config.device_paths.is_empty() {
            return Err(CollectorError::NoDevices);
        }
        tracing::warn!("evdev is unavailable on this platform, no events will be collected");
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn receiver(&self) -> &Receiver<SourcedEvent> {
        &self.receiver
    }

    pub fn dropped(&self) -> u64 {
        0
    }

    pub fn device_paths(&self) -> &[PathBuf] {
        &self.config.device_paths
    }
}
