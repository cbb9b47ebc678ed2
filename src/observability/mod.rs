//! Observability for restquery
//!
//! Lifecycle events are a closed, typed set ([`Event`]) and are emitted as
//! structured `tracing` events. The crate never installs a subscriber; the
//! embedding application decides where logs go.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never fails a call
//! 3. Field order in log output is deterministic (sorted by key)

mod events;

pub use events::Event;

use std::fmt;

use tracing::Level;

/// Key/value pairs rendered as `k=v` in key order
struct Fields<'a>(&'a [(&'a str, &'a str)]);

impl fmt::Display for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sorted: Vec<_> = self.0.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        for (i, (key, value)) in sorted.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let fields = Fields(fields);
    let name = event.as_str();
    match event.level() {
        Level::TRACE => tracing::trace!(event = name, fields = %fields),
        Level::DEBUG => tracing::debug!(event = name, fields = %fields),
        Level::INFO => tracing::info!(event = name, fields = %fields),
        Level::WARN => tracing::warn!(event = name, fields = %fields),
        _ => tracing::error!(event = name, fields = %fields),
    }
}
