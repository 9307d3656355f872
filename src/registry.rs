//! Adaptor registry.
//!
//! Maps adaptor ids to factories. The binary fills it once at startup and
//! looks up the configured id.

use crate::adaptor::{EventInterpreter, ProximityCodes, ProximityInterpreter, ADAPTOR_ID};
use crate::buffer::RingBuffer;
use crate::datatypes::TimedState;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What a factory gets to build an interpreter from.
#[derive(Clone)]
pub struct AdaptorContext {
    pub buffer: Arc<RingBuffer<TimedState>>,
    pub codes: ProximityCodes,
}

pub type BoxedInterpreter = Box<dyn EventInterpreter + Send>;

pub type AdaptorFactory = fn(&AdaptorContext) -> BoxedInterpreter;

#[derive(Default)]
pub struct AdaptorRegistry {
    factories: BTreeMap<String, AdaptorFactory>,
}

impl AdaptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every adaptor built into this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ADAPTOR_ID, proximity_factory);
        registry
    }

    /// Register `factory` under `id`, replacing any previous entry.
    pub fn register(&mut self, id: &str, factory: AdaptorFactory) {
        if self.factories.insert(id.to_string(), factory).is_some() {
            tracing::debug!(id, "Replaced adaptor factory");
        }
    }

    /// Build the adaptor registered as `id`.
    pub fn create(&self, id: &str, context: &AdaptorContext) -> Option<BoxedInterpreter> {
        self.factories.get(id).map(|factory| factory(context))
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

fn proximity_factory(context: &AdaptorContext) -> BoxedInterpreter {
    Box::new(ProximityInterpreter::with_codes(
        Arc::clone(&context.buffer),
        context.codes.clone(),
    ))
}
