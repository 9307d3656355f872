//! Proximity interpreter.
//!
//! Field updates for a source index accumulate into a pending state. At
//! the sync marker the pending state is compared with the last committed
//! one and, only if it differs, committed: timestamped, pushed to the
//! change buffer, and remembered as the new committed state.

use crate::adaptor::EventInterpreter;
use crate::buffer::ChangeBuffer;
use crate::collector::types::{EventClass, RawEvent, ABS_DISTANCE, EV_ABS, EV_SW, SW_FRONT_PROXIMITY};
use crate::datatypes::{monotonic_micros, ProximityState, TimedState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registry id of the evdev proximity adaptor.
pub const ADAPTOR_ID: &str = "proximityadaptor-evdev";

/// A (type, code) pair that carries the proximity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldCode {
    #[serde(rename = "type")]
    pub type_: u16,
    pub code: u16,
}

impl FieldCode {
    pub fn new(class: EventClass, code: u16) -> Self {
        Self {
            type_: class.as_type(),
            code,
        }
    }
}

/// The set of field codes recognized as proximity reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProximityCodes {
    fields: Vec<FieldCode>,
}

impl Default for ProximityCodes {
    fn default() -> Self {
        Self {
            fields: vec![
                FieldCode {
                    type_: EV_ABS,
                    code: ABS_DISTANCE,
                },
                FieldCode {
                    type_: EV_SW,
                    code: SW_FRONT_PROXIMITY,
                },
            ],
        }
    }
}

impl ProximityCodes {
    pub fn new(fields: Vec<FieldCode>) -> Self {
        Self { fields }
    }

    pub fn matches(&self, event: &RawEvent) -> bool {
        self.fields.contains(&FieldCode::new(event.class, event.code))
    }

    pub fn fields(&self) -> &[FieldCode] {
        &self.fields
    }
}

/// Per-source report state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Session {
    /// Last committed state
    current: ProximityState,
    /// State assembled since the last sync
    pending: ProximityState,
}

/// Translates raw proximity events into de-duplicated [`TimedState`]s.
pub struct ProximityInterpreter<B> {
    buffer: B,
    codes: ProximityCodes,
    sessions: HashMap<usize, Session>,
    clock: fn() -> u64,
}

impl<B: ChangeBuffer<TimedState>> ProximityInterpreter<B> {
    /// Create an interpreter publishing into `buffer`, recognizing the default codes.
    pub fn new(buffer: B) -> Self {
        Self::with_codes(buffer, ProximityCodes::default())
    }

    pub fn with_codes(buffer: B, codes: ProximityCodes) -> Self {
        Self {
            buffer,
            codes,
            sessions: HashMap::new(),
            clock: monotonic_micros,
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Record a field update for `src`. Unrecognized codes and values are ignored.
    pub fn interpret_event(&mut self, src: usize, event: &RawEvent) {
        if !self.codes.matches(event) {
            tracing::trace!(src, ?event, "Ignoring unrecognized event");
            return;
        }

        match ProximityState::from_raw(event.value) {
            Some(state) => {
                self.sessions.entry(src).or_default().pending = state;
            }
            None => {
                tracing::debug!(src, value = event.value, "Ignoring unrecognized proximity value");
            }
        }
    }

    /// Finalize the report for `src`, committing it if it changed.
    pub fn interpret_sync(&mut self, src: usize) {
        let changed = self
            .sessions
            .get(&src)
            .map(|s| s.pending != s.current)
            .unwrap_or(false);

        if changed {
            self.commit_output(src);
        } else {
            tracing::trace!(src, "Sync without state change");
        }
    }

    /// Publish the pending state of `src` and make it the committed state.
    pub fn commit_output(&mut self, src: usize) {
        let session = self.sessions.entry(src).or_default();
        let timed = TimedState::new(session.pending, (self.clock)());

        self.buffer.push(timed);
        tracing::info!(src, state = %session.pending, timestamp = timed.timestamp, "Proximity changed");

        session.current = session.pending;
    }

    /// Last committed state for `src`.
    pub fn current_state(&self, src: usize) -> ProximityState {
        self.sessions.get(&src).map(|s| s.current).unwrap_or_default()
    }

    /// State assembled for `src` since its last sync.
    pub fn pending_state(&self, src: usize) -> ProximityState {
        self.sessions.get(&src).map(|s| s.pending).unwrap_or_default()
    }

    pub fn codes(&self) -> &ProximityCodes {
        &self.codes
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }
}

impl<B: ChangeBuffer<TimedState>> EventInterpreter for ProximityInterpreter<B> {
    fn name(&self) -> &str {
        ADAPTOR_ID
    }

    fn interpret_event(&mut self, src: usize, event: &RawEvent) {
        ProximityInterpreter::interpret_event(self, src, event);
    }

    fn interpret_sync(&mut self, src: usize) {
        ProximityInterpreter::interpret_sync(self, src);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<TimedState>>);

    impl ChangeBuffer<TimedState> for Recorder {
        fn push(&self, value: TimedState) {
            self.0.borrow_mut().push(value);
        }
    }

    impl Recorder {
        fn states(&self) -> Vec<ProximityState> {
            self.0.borrow().iter().map(|t| t.proximity()).collect()
        }
    }

    fn fixed_clock() -> u64 {
        1_000
    }

    #[test]
    fn test_initial_state_is_unknown() {
        let interpreter = ProximityInterpreter::new(Recorder::default());
        assert_eq!(interpreter.current_state(0), ProximityState::Unknown);
        assert_eq!(interpreter.pending_state(0), ProximityState::Unknown);
    }

    #[test]
    fn test_event_only_updates_pending() {
        let mut interpreter = ProximityInterpreter::new(Recorder::default());
        interpreter.interpret_event(0, &RawEvent::distance(1));

        assert_eq!(interpreter.pending_state(0), ProximityState::Closed);
        assert_eq!(interpreter.current_state(0), ProximityState::Unknown);
        assert!(interpreter.buffer().states().is_empty());
    }

    #[test]
    fn test_sync_commits_change() {
        let mut interpreter =
            ProximityInterpreter::new(Recorder::default()).with_clock(fixed_clock);
        interpreter.interpret_event(0, &RawEvent::distance(0));
        interpreter.interpret_sync(0);

        let pushed = interpreter.buffer().0.borrow().clone();
        assert_eq!(pushed, vec![TimedState::new(ProximityState::Open, 1_000)]);
        assert_eq!(interpreter.current_state(0), ProximityState::Open);
    }

    #[test]
    fn test_last_update_before_sync_wins() {
        let mut interpreter = ProximityInterpreter::new(Recorder::default());
        interpreter.interpret_event(0, &RawEvent::distance(0));
        interpreter.interpret_event(0, &RawEvent::distance(1));
        interpreter.interpret_sync(0);

        assert_eq!(interpreter.buffer().states(), vec![ProximityState::Closed]);
    }

    #[test]
    fn test_transient_change_reverted_before_sync_is_not_published() {
        let mut interpreter = ProximityInterpreter::new(Recorder::default());
        interpreter.interpret_event(0, &RawEvent::distance(0));
        interpreter.interpret_sync(0);
        interpreter.interpret_event(0, &RawEvent::distance(1));
        interpreter.interpret_event(0, &RawEvent::distance(0));
        interpreter.interpret_sync(0);

        assert_eq!(interpreter.buffer().states(), vec![ProximityState::Open]);
    }

    #[test]
    fn test_sync_on_unseen_source_is_noop() {
        let mut interpreter = ProximityInterpreter::new(Recorder::default());
        interpreter.interpret_sync(7);
        assert!(interpreter.buffer().states().is_empty());
    }

    #[test]
    fn test_unrecognized_code_and_value_ignored() {
        let mut interpreter = ProximityInterpreter::new(Recorder::default());
        interpreter.interpret_event(0, &RawEvent::new(EventClass::Key, 30, 1));
        interpreter.interpret_event(0, &RawEvent::new(EventClass::Absolute, 0x00, 1));
        interpreter.interpret_event(0, &RawEvent::distance(99));
        interpreter.interpret_sync(0);

        assert_eq!(interpreter.pending_state(0), ProximityState::Unknown);
        assert!(interpreter.buffer().states().is_empty());
    }

    #[test]
    fn test_switch_code_recognized() {
        let mut interpreter = ProximityInterpreter::new(Recorder::default());
        interpreter.interpret_event(
            0,
            &RawEvent::new(EventClass::Switch, SW_FRONT_PROXIMITY, 1),
        );
        interpreter.interpret_sync(0);

        assert_eq!(interpreter.buffer().states(), vec![ProximityState::Closed]);
    }

    #[test]
    fn test_custom_codes() {
        let codes = ProximityCodes::new(vec![FieldCode::new(EventClass::Key, 0x1f)]);
        let mut interpreter = ProximityInterpreter::with_codes(Recorder::default(), codes);

        interpreter.interpret_event(0, &RawEvent::distance(1));
        interpreter.interpret_sync(0);
        assert!(interpreter.buffer().states().is_empty());

        interpreter.interpret_event(0, &RawEvent::new(EventClass::Key, 0x1f, 1));
        interpreter.interpret_sync(0);
        assert_eq!(interpreter.buffer().states(), vec![ProximityState::Closed]);
    }

    #[test]
    fn test_commit_output_publishes_unconditionally() {
        let mut interpreter = ProximityInterpreter::new(Recorder::default());
        interpreter.commit_output(0);
        interpreter.commit_output(0);

        assert_eq!(
            interpreter.buffer().states(),
            vec![ProximityState::Unknown, ProximityState::Unknown]
        );
    }

    #[test]
    fn test_codes_serialize_as_list() {
        let json = serde_json::to_string(&ProximityCodes::default()).unwrap();
        assert_eq!(json, r#"[{"type":3,"code":25},{"type":5,"code":11}]"#);
    }

    #[test]
    fn test_default_fields() {
        let codes = ProximityCodes::default();
        assert_eq!(
            codes.fields(),
            &[
                FieldCode::new(EventClass::Absolute, ABS_DISTANCE),
                FieldCode::new(EventClass::Switch, SW_FRONT_PROXIMITY),
            ]
        );
    }
}
