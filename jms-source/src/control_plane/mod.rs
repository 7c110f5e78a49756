//! Control-plane layer.
//!
//! Owns the configuration-time decisions: strategy selection, destination and
//! subscription binding, and the container lifecycle state model. Nothing in this
//! layer touches a broker session.
//!
//! ```
//! use jms_source::{ConfigurationError, ListenerConfig, ListenerDefaults, ListenerPolicy};
//!
//! let policy = ListenerPolicy::new(ListenerDefaults::default());
//!
//! // Durable subscriptions are a pub/sub concept and are rejected on queues.
//! let config = ListenerConfig {
//!     subscription_durable: Some(true),
//!     subscription_name: Some("audit".to_string()),
//!     ..ListenerConfig::for_queue("orders")
//! };
//! assert!(matches!(
//!     policy.derive(&config),
//!     Err(ConfigurationError::TopicOnlySetting { .. })
//! ));
//! ```

pub(crate) mod container_state;
pub(crate) mod destination_binding;
pub(crate) mod listener_policy;
