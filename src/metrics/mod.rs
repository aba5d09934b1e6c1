//! Metrics emission for the synchronizer.
//!
//! Uses the `metrics` facade; whatever recorder the embedding process
//! installs (if any) receives the counters. Events are modeled as structs
//! implementing [`events::InternalEvent`] and emitted through the [`emit!`]
//! macro.

pub mod events;

/// Emit an internal event as a metric.
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
