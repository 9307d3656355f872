//! Demonstration of the proximity adaptor pipeline without hardware.
//!
//! This example shows how to:
//! 1. Build the adaptor from the registry
//! 2. Feed it a recorded capture
//! 3. Read published changes from two independent readers
//!
//! Run with: cargo run --example replay_demo

use proximity_adaptor::{
    collector::parse_capture,
    registry::{AdaptorContext, AdaptorRegistry},
    AdaptorStats, InputDevAdaptor, ProximityCodes, RingBuffer,
};
use std::sync::Arc;

const CAPTURE: &str = include_str!("lid.jsonl");

fn main() {
    let records = match parse_capture(CAPTURE) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Bad capture: {e}");
            return;
        }
    };

    let buffer = RingBuffer::shared(8);
    let mut display = buffer.subscribe();
    let mut logger = buffer.subscribe();

    let registry = AdaptorRegistry::with_defaults();
    let context = AdaptorContext {
        buffer: buffer.clone(),
        codes: ProximityCodes::default(),
    };
    let Some(interpreter) = registry.create("proximityadaptor-evdev", &context) else {
        eprintln!("Proximity adaptor is not registered");
        return;
    };

    let stats = Arc::new(AdaptorStats::new());
    let mut adaptor = InputDevAdaptor::new(interpreter, stats.clone());
    adaptor.run_capture(&records);

    println!("Display reader:");
    for change in display.drain() {
        println!("  {} at {}us", change.proximity(), change.timestamp);
    }

    println!("Logger reader saw {} changes", logger.drain().len());
    println!();
    println!("{}", stats.summary());
}
