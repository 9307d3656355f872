//! Value types published by the adaptor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

/// Discrete proximity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProximityState {
    /// No report has been finalized yet
    #[default]
    Unknown,
    /// No target detected
    Open,
    /// Target nearby
    Closed,
}

impl ProximityState {
    /// Decode a raw field value. Only 0 and 1 carry meaning.
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(ProximityState::Open),
            1 => Some(ProximityState::Closed),
            _ => None,
        }
    }

    /// Numeric encoding stored in [`TimedState::state`].
    pub fn code(self) -> i32 {
        match self {
            ProximityState::Unknown => -1,
            ProximityState::Open => 0,
            ProximityState::Closed => 1,
        }
    }

    /// Inverse of [`ProximityState::code`]; unknown codes map to `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ProximityState::Open,
            1 => ProximityState::Closed,
            _ => ProximityState::Unknown,
        }
    }
}

impl fmt::Display for ProximityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProximityState::Unknown => write!(f, "unknown"),
            ProximityState::Open => write!(f, "open"),
            ProximityState::Closed => write!(f, "closed"),
        }
    }
}

/// A committed state change with its monotonic capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedState {
    /// Encoded [`ProximityState`]
    pub state: i32,
    /// Microseconds on the process monotonic clock
    pub timestamp: u64,
}

impl TimedState {
    pub fn new(state: ProximityState, timestamp: u64) -> Self {
        Self {
            state: state.code(),
            timestamp,
        }
    }

    /// Decoded state.
    pub fn proximity(&self) -> ProximityState {
        ProximityState::from_code(self.state)
    }
}

/// Microseconds elapsed on a monotonic clock since first use in this process.
pub fn monotonic_micros() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_micros() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_decoding() {
        assert_eq!(ProximityState::from_raw(0), Some(ProximityState::Open));
        assert_eq!(ProximityState::from_raw(1), Some(ProximityState::Closed));
        assert_eq!(ProximityState::from_raw(99), None);
        assert_eq!(ProximityState::from_raw(-1), None);
    }

    #[test]
    fn test_code_encoding() {
        for state in [
            ProximityState::Unknown,
            ProximityState::Open,
            ProximityState::Closed,
        ] {
            assert_eq!(ProximityState::from_code(state.code()), state);
        }
        assert_eq!(ProximityState::Unknown.code(), -1);
    }

    #[test]
    fn test_timed_state_serializes_numeric_state() {
        let timed = TimedState::new(ProximityState::Closed, 42);
        let json = serde_json::to_string(&timed).unwrap();
        assert_eq!(json, r#"{"state":1,"timestamp":42}"#);
        assert_eq!(timed.proximity(), ProximityState::Closed);
    }

    #[test]
    fn test_monotonic_clock_does_not_go_backwards() {
        let a = monotonic_micros();
        let b = monotonic_micros();
        assert!(b >= a);
    }
}
