//! Linux evdev implementation of event collection.
//!
//! Each device node gets its own reader thread. Records are decoded from
//! the kernel's `struct input_event` layout and forwarded, tagged with the
//! node's source index, over a bounded channel. Per-node ordering is
//! preserved; records from different nodes may interleave.

use crate::collector::types::{RawEvent, SourcedEvent};
use crate::collector::{CollectorConfig, CollectorError};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::mem::size_of;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Size of the timestamp at the head of each record.
const TIMEVAL_SIZE: usize = size_of::<libc::timeval>();

/// Size of one `struct input_event`.
pub const EVENT_SIZE: usize = size_of::<libc::input_event>();

/// Records read per syscall.
const READ_BATCH: usize = 64;

/// Decode one `struct input_event`. Returns `None` if `record` is short.
pub fn decode_record(record: &[u8]) -> Option<RawEvent> {
    if record.len() < EVENT_SIZE {
        return None;
    }
    let body = &record[TIMEVAL_SIZE..EVENT_SIZE];
    let type_ = u16::from_ne_bytes([body[0], body[1]]);
    let code = u16::from_ne_bytes([body[2], body[3]]);
    let value = i32::from_ne_bytes([body[4], body[5], body[6], body[7]]);
    Some(RawEvent::from_kernel(type_, code, value))
}

/// The evdev collector.
///
/// Only the reader threads hold senders once started, so the receiver
/// disconnects when the last reader exits.
pub struct EvdevCollector {
    config: CollectorConfig,
    /// Held until `start` hands clones to the readers
    sender: Option<Sender<SourcedEvent>>,
    receiver: Receiver<SourcedEvent>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    thread_handles: Vec<JoinHandle<()>>,
}

impl EvdevCollector {
    /// Create a collector for the configured device nodes.
    pub fn new(config: CollectorConfig) -> Self {
        let (sender, receiver) = bounded(config.channel_capacity);

        Self {
            config,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            thread_handles: Vec::new(),
        }
    }

    /// Open every device node and start one reader thread per node.
    ///
    /// Nothing is started unless all nodes open successfully.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CollectorError::AlreadyRunning);
        }
        if self.config.device_paths.is_empty() {
            return Err(CollectorError::NoDevices);
        }

        let mut files = Vec::with_capacity(self.config.device_paths.len());
        for path in &self.config.device_paths {
            let file = OpenOptions::new()
                .read(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(path)
                .map_err(|source| CollectorError::Open {
                    path: path.clone(),
                    source,
                })?;
            files.push((path.clone(), file));
        }

        // A restart after every reader exited needs a fresh channel.
        let sender = match self.sender.take() {
            Some(sender) => sender,
            None => {
                let (sender, receiver) = bounded(self.config.channel_capacity);
                self.receiver = receiver;
                sender
            }
        };

        self.running.store(true, Ordering::SeqCst);

        for (src, (path, file)) in files.into_iter().enumerate() {
            tracing::info!(src, path = %path.display(), "Opened input device");

            let reader = NodeReader {
                src,
                path,
                file,
                sender: sender.clone(),
                running: self.running.clone(),
                dropped: self.dropped.clone(),
                poll_interval: self.config.poll_interval,
            };
            self.thread_handles.push(thread::spawn(move || reader.run()));
        }

        Ok(())
    }

    /// Stop all reader threads.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for handle in self.thread_handles.drain(..) {
            let _ = handle.join();
        }
    }

    /// Check if the collector is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the receiver for raw events.
    pub fn receiver(&self) -> &Receiver<SourcedEvent> {
        &self.receiver
    }

    /// Records discarded because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Device nodes in source-index order.
    pub fn device_paths(&self) -> &[PathBuf] {
        &self.config.device_paths
    }
}

impl Drop for EvdevCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

struct NodeReader {
    src: usize,
    path: PathBuf,
    file: File,
    sender: Sender<SourcedEvent>,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    poll_interval: std::time::Duration,
}

impl NodeReader {
    fn run(mut self) {
        let mut buf = vec![0u8; EVENT_SIZE * READ_BATCH];

        while self.running.load(Ordering::SeqCst) {
            match self.file.read(&mut buf) {
                Ok(0) => {
                    tracing::warn!(src = self.src, path = %self.path.display(), "Input device closed");
                    break;
                }
                Ok(n) => {
                    if n % EVENT_SIZE != 0 {
                        tracing::warn!(src = self.src, bytes = n, "Short read from input device");
                    }
                    for record in buf[..n].chunks_exact(EVENT_SIZE) {
                        if let Some(event) = decode_record(record) {
                            self.forward(event);
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(self.poll_interval);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!(src = self.src, path = %self.path.display(), "Input device read failed: {}", e);
                    break;
                }
            }
        }

        tracing::debug!(src = self.src, "Reader thread exiting");
    }

    fn forward(&self, event: RawEvent) {
        match self.sender.try_send(SourcedEvent::new(self.src, event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }
}
