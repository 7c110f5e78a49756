//! Structured logging vocabulary.
//!
//! Library code emits `tracing` events using the names in [`events`] and the keys in
//! [`fields`]; it never installs a subscriber.

pub mod events;
pub mod fields;
