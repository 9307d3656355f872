//! Proximity Adaptor - evdev proximity sensor to published state changes.
//!
//! Raw input events from a proximity-sensing device arrive one record at a
//! time. Field updates are assembled into a pending report, finalized at
//! each sync marker, and only genuine state changes are pushed, with a
//! monotonic timestamp, into a bounded multi-reader change buffer.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  SourcedEvent  ┌────────────────┐  RawEvent / sync  ┌─────────────┐
//! │ Collector  │───────────────▶│ InputDevAdaptor│──────────────────▶│ Proximity   │
//! │  (evdev)   │   (channel)    │   (dispatch)   │                   │ Interpreter │
//! └────────────┘                └────────────────┘                   └──────┬──────┘
//!                                                                           │ TimedState
//!                                                                           ▼
//!                                              readers ◀──────────── ┌─────────────┐
//!                                                                    │ RingBuffer  │
//!                                                                    └─────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use proximity_adaptor::{
//!     buffer::RingBuffer, collector::RawEvent, datatypes::ProximityState,
//!     ProximityInterpreter,
//! };
//!
//! let buffer = RingBuffer::shared(16);
//! let mut reader = buffer.subscribe();
//! let mut interpreter = ProximityInterpreter::new(buffer.clone());
//!
//! interpreter.interpret_event(0, &RawEvent::distance(1));
//! interpreter.interpret_sync(0);
//!
//! let change = reader.try_read().unwrap();
//! assert_eq!(change.proximity(), ProximityState::Closed);
//! ```

pub mod adaptor;
pub mod buffer;
pub mod collector;
pub mod config;
pub mod datatypes;
pub mod registry;
pub mod stats;

// Re-export key types at crate root for convenience
pub use adaptor::{EventInterpreter, InputDevAdaptor, ProximityCodes, ProximityInterpreter};
pub use buffer::{BufferError, ChangeBuffer, RingBuffer, RingBufferReader};
pub use collector::{Collector, CollectorConfig, CollectorError, RawEvent, SourcedEvent};
pub use config::{Config, ConfigError};
pub use datatypes::{ProximityState, TimedState};
pub use registry::{AdaptorContext, AdaptorRegistry};
pub use stats::{AdaptorStats, SharedStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
