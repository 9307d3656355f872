//! Event dispatch.
//!
//! [`InputDevAdaptor`] is the generic half of a device adaptor: it takes
//! raw records from a collector (or a capture) one at a time, in order,
//! and routes them to a pluggable [`EventInterpreter`]. Sync markers go to
//! `interpret_sync`, everything else to `interpret_event`.

pub mod proximity;

use crate::collector::types::{SourcedEvent, RawEvent, SYN_DROPPED, SYN_REPORT};
use crate::stats::SharedStats;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub use proximity::{FieldCode, ProximityCodes, ProximityInterpreter, ADAPTOR_ID};

/// Device-specific interpretation of a raw event stream.
///
/// Calls for one source index arrive strictly in kernel order and are never
/// concurrent.
pub trait EventInterpreter {
    /// Registry id of this interpreter.
    fn name(&self) -> &str;

    /// A field update for `src`.
    fn interpret_event(&mut self, src: usize, event: &RawEvent);

    /// The updates for `src` since the previous marker form one report.
    fn interpret_sync(&mut self, src: usize);
}

impl<I: EventInterpreter + ?Sized> EventInterpreter for Box<I> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn interpret_event(&mut self, src: usize, event: &RawEvent) {
        (**self).interpret_event(src, event);
    }

    fn interpret_sync(&mut self, src: usize) {
        (**self).interpret_sync(src);
    }
}

/// How long `run` waits for a record before re-checking the running flag.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Routes raw records to an interpreter.
pub struct InputDevAdaptor<I> {
    interpreter: I,
    stats: SharedStats,
}

impl<I: EventInterpreter> InputDevAdaptor<I> {
    pub fn new(interpreter: I, stats: SharedStats) -> Self {
        Self { interpreter, stats }
    }

    /// Route one record.
    pub fn dispatch(&mut self, record: &SourcedEvent) {
        let event = record.event();

        if !event.is_sync() {
            self.stats.record_raw_event();
            self.interpreter.interpret_event(record.src, &event);
            return;
        }

        match event.code {
            SYN_REPORT => {
                self.stats.record_sync();
                self.interpreter.interpret_sync(record.src);
            }
            SYN_DROPPED => {
                self.stats.record_kernel_drop();
                tracing::warn!(src = record.src, "Kernel dropped input events");
            }
            code => {
                tracing::trace!(src = record.src, code, "Ignoring sync-class event");
            }
        }
    }

    /// Dispatch records from `receiver` until `running` is cleared or the
    /// sending side goes away. Returns the number of records dispatched.
    pub fn run(&mut self, receiver: &Receiver<SourcedEvent>, running: &AtomicBool) -> u64 {
        let mut dispatched = 0;
        tracing::info!(interpreter = self.interpreter.name(), "Dispatch loop started");

        while running.load(Ordering::SeqCst) {
            match receiver.recv_timeout(RECV_TIMEOUT) {
                Ok(record) => {
                    self.dispatch(&record);
                    dispatched += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Collector disconnected");
                    break;
                }
            }
        }

        tracing::info!(dispatched, "Dispatch loop stopped");
        dispatched
    }

    /// Dispatch every record of a capture.
    pub fn run_capture<'a>(&mut self, records: impl IntoIterator<Item = &'a SourcedEvent>) {
        for record in records {
            self.dispatch(record);
        }
    }

    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }
}
