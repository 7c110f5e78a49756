//! Runtime integration layer.
//!
//! Holds the timing and scaling rules the data plane consults while it runs: recovery
//! backoff after broker failures and the consumer-count scaling policy. Keeping them
//! free of tasks and channels lets them be tested without a runtime.

pub(crate) mod reconnect_backoff;
pub(crate) mod scaling;
