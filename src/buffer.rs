//! Bounded single-producer, multi-consumer change buffer.
//!
//! The producer side is the [`ChangeBuffer`] trait, which is all the
//! interpreters see. [`RingBuffer`] is the in-process implementation:
//! a fixed-capacity ring where each [`RingBufferReader`] keeps its own
//! cursor, so a slow reader never holds back the producer or other readers.
//! When a reader falls behind the overwrite window it is told how many
//! entries it missed and resumes at the oldest retained entry.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

/// Default ring capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Producer side of a change buffer.
///
/// Pushing never fails and never blocks on readers.
pub trait ChangeBuffer<T> {
    fn push(&self, value: T);
}

impl<T, B: ChangeBuffer<T> + ?Sized> ChangeBuffer<T> for Arc<B> {
    fn push(&self, value: T) {
        (**self).push(value);
    }
}

/// Errors a reader can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("no new entries")]
    Empty,
    #[error("reader lagged behind, {missed} entries overwritten")]
    Lagged { missed: u64 },
}

struct Ring<T> {
    /// Oldest at front, newest at back
    entries: VecDeque<T>,
    capacity: usize,
    /// Total pushes so far
    write_seq: u64,
}

impl<T> Ring<T> {
    fn oldest_seq(&self) -> u64 {
        self.write_seq - self.entries.len() as u64
    }
}

/// Fixed-capacity ring with independent reader cursors.
pub struct RingBuffer<T> {
    ring: Mutex<Ring<T>>,
    pushed: Condvar,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a ring holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity),
                capacity,
                write_seq: 0,
            }),
            pushed: Condvar::new(),
        }
    }

    /// Create a shared ring.
    pub fn shared(capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(capacity))
    }

    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        // A panicking reader cannot leave the ring half-updated.
        self.ring.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new reader positioned at the current write position.
    pub fn subscribe(self: &Arc<Self>) -> RingBufferReader<T> {
        let read_seq = self.lock().write_seq;
        RingBufferReader {
            buffer: Arc::clone(self),
            read_seq,
        }
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Total number of entries ever pushed.
    pub fn written(&self) -> u64 {
        self.lock().write_seq
    }

    /// The most recently pushed entry, if any is retained.
    pub fn latest(&self) -> Option<T> {
        self.lock().entries.back().cloned()
    }
}

impl<T: Clone> ChangeBuffer<T> for RingBuffer<T> {
    fn push(&self, value: T) {
        let mut ring = self.lock();
        if ring.entries.len() >= ring.capacity {
            ring.entries.pop_front();
        }
        ring.entries.push_back(value);
        ring.write_seq += 1;
        drop(ring);
        self.pushed.notify_all();
    }
}

/// A consumer cursor into a [`RingBuffer`].
pub struct RingBufferReader<T> {
    buffer: Arc<RingBuffer<T>>,
    /// Sequence number of the next entry to read
    read_seq: u64,
}

impl<T: Clone> RingBufferReader<T> {
    /// Read the next entry without blocking.
    pub fn try_read(&mut self) -> Result<T, BufferError> {
        let ring = self.buffer.lock();
        Self::read_locked(&ring, &mut self.read_seq)
    }

    /// Read the next entry, waiting up to `timeout` for one to arrive.
    pub fn read_timeout(&mut self, timeout: Duration) -> Result<T, BufferError> {
        let ring = self.buffer.lock();
        let (ring, _) = self
            .buffer
            .pushed
            .wait_timeout_while(ring, timeout, |ring| ring.write_seq <= self.read_seq)
            .unwrap_or_else(|e| e.into_inner());
        Self::read_locked(&ring, &mut self.read_seq)
    }

    /// Take every entry currently available, skipping over any lag.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::new();
        loop {
            match self.try_read() {
                Ok(value) => out.push(value),
                Err(BufferError::Lagged { .. }) => continue,
                Err(BufferError::Empty) => break,
            }
        }
        out
    }

    /// Number of entries waiting for this reader, including overwritten ones.
    pub fn pending(&self) -> u64 {
        self.buffer.lock().write_seq - self.read_seq
    }

    fn read_locked(ring: &Ring<T>, read_seq: &mut u64) -> Result<T, BufferError> {
        if *read_seq >= ring.write_seq {
            return Err(BufferError::Empty);
        }

        let oldest = ring.oldest_seq();
        if *read_seq < oldest {
            let missed = oldest - *read_seq;
            *read_seq = oldest;
            return Err(BufferError::Lagged { missed });
        }

        let value = ring.entries[(*read_seq - oldest) as usize].clone();
        *read_seq += 1;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_reader_starts_at_write_position() {
        let ring = RingBuffer::shared(4);
        ring.push(1);
        let mut reader = ring.subscribe();
        assert_eq!(reader.try_read(), Err(BufferError::Empty));

        ring.push(2);
        assert_eq!(reader.try_read(), Ok(2));
        assert_eq!(reader.try_read(), Err(BufferError::Empty));
    }

    #[test]
    fn test_readers_are_independent() {
        let ring = RingBuffer::shared(8);
        let mut fast = ring.subscribe();
        let mut slow = ring.subscribe();

        ring.push(10);
        ring.push(20);

        assert_eq!(fast.drain(), vec![10, 20]);
        assert_eq!(slow.try_read(), Ok(10));

        ring.push(30);
        assert_eq!(fast.drain(), vec![30]);
        assert_eq!(slow.drain(), vec![20, 30]);
    }

    #[test]
    fn test_overflow_drops_oldest_and_reports_lag() {
        let ring = RingBuffer::shared(3);
        let mut reader = ring.subscribe();

        for i in 0..5 {
            ring.push(i);
        }

        assert_eq!(ring.written(), 5);
        assert_eq!(reader.pending(), 5);
        assert_eq!(reader.try_read(), Err(BufferError::Lagged { missed: 2 }));
        assert_eq!(reader.drain(), vec![2, 3, 4]);
    }

    #[test]
    fn test_latest_and_capacity() {
        let ring: Arc<RingBuffer<u32>> = RingBuffer::shared(0);
        assert_eq!(ring.capacity(), 1);
        assert_eq!(ring.latest(), None);

        ring.push(7);
        ring.push(8);
        assert_eq!(ring.latest(), Some(8));
    }

    #[test]
    fn test_read_timeout_wakes_on_push() {
        let ring = RingBuffer::shared(4);
        let mut reader = ring.subscribe();

        let producer = Arc::clone(&ring);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(99u32);
        });

        assert_eq!(reader.read_timeout(Duration::from_secs(5)), Ok(99));
        handle.join().unwrap();
    }

    #[test]
    fn test_read_timeout_expires_when_idle() {
        let ring: Arc<RingBuffer<u32>> = RingBuffer::shared(4);
        let mut reader = ring.subscribe();
        assert_eq!(
            reader.read_timeout(Duration::from_millis(10)),
            Err(BufferError::Empty)
        );
    }
}
