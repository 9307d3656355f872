//! Raw input event records as delivered by the kernel.

use serde::{Deserialize, Serialize};

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;
pub const EV_SW: u16 = 0x05;

pub const SYN_REPORT: u16 = 0x00;
pub const SYN_DROPPED: u16 = 0x03;

pub const ABS_DISTANCE: u16 = 0x19;
pub const SW_FRONT_PROXIMITY: u16 = 0x0b;

/// Event class (the kernel's `type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventClass {
    Sync,
    Key,
    Absolute,
    Switch,
    Other(u16),
}

impl EventClass {
    pub fn from_type(type_: u16) -> Self {
        match type_ {
            EV_SYN => EventClass::Sync,
            EV_KEY => EventClass::Key,
            EV_ABS => EventClass::Absolute,
            EV_SW => EventClass::Switch,
            other => EventClass::Other(other),
        }
    }

    pub fn as_type(self) -> u16 {
        match self {
            EventClass::Sync => EV_SYN,
            EventClass::Key => EV_KEY,
            EventClass::Absolute => EV_ABS,
            EventClass::Switch => EV_SW,
            EventClass::Other(other) => other,
        }
    }
}

/// One field update (or sync marker) from a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub class: EventClass,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub fn new(class: EventClass, code: u16, value: i32) -> Self {
        Self { class, code, value }
    }

    /// Build from the kernel's numeric fields.
    pub fn from_kernel(type_: u16, code: u16, value: i32) -> Self {
        Self::new(EventClass::from_type(type_), code, value)
    }

    /// `EV_SYN / SYN_REPORT`.
    pub fn sync() -> Self {
        Self::new(EventClass::Sync, SYN_REPORT, 0)
    }

    /// `EV_ABS / ABS_DISTANCE` with the given value.
    pub fn distance(value: i32) -> Self {
        Self::new(EventClass::Absolute, ABS_DISTANCE, value)
    }

    pub fn is_sync(&self) -> bool {
        self.class == EventClass::Sync
    }
}

/// A raw event tagged with the index of the device node it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedEvent {
    pub src: usize,
    #[serde(rename = "type")]
    pub type_: u16,
    pub code: u16,
    pub value: i32,
}

impl SourcedEvent {
    pub fn new(src: usize, event: RawEvent) -> Self {
        Self {
            src,
            type_: event.class.as_type(),
            code: event.code,
            value: event.value,
        }
    }

    pub fn event(&self) -> RawEvent {
        RawEvent::from_kernel(self.type_, self.code, self.value)
    }
}
