//! Canonical structured event names used across `jms-source`.

// Policy and binding events.
pub const POLICY_DERIVED: &str = "policy_derived";

// Container lifecycle events.
pub const CONTAINER_CONFIGURED: &str = "container_configured";
pub const CONTAINER_START: &str = "container_start";
pub const CONTAINER_START_OK: &str = "container_start_ok";
pub const CONTAINER_START_REJECTED: &str = "container_start_rejected";
pub const CONTAINER_STOP: &str = "container_stop";
pub const CONTAINER_STOP_OK: &str = "container_stop_ok";
pub const CONTAINER_STOP_TIMEOUT: &str = "container_stop_timeout";
pub const CONTAINER_STOP_NOOP: &str = "container_stop_noop";

// Shared connection events.
pub const CONNECTION_ESTABLISHED: &str = "connection_established";
pub const CONNECTION_FAILED: &str = "connection_failed";
pub const CONNECTION_INVALIDATED: &str = "connection_invalidated";
pub const CONNECTION_CLOSED: &str = "connection_closed";

// Consumer worker events.
pub const SESSION_OPEN_OK: &str = "session_open_ok";
pub const SESSION_OPEN_FAILED: &str = "session_open_failed";
pub const SESSION_FAILED: &str = "session_failed";
pub const SESSION_RECOVERY_SCHEDULED: &str = "session_recovery_scheduled";
pub const SESSION_CLOSED: &str = "session_closed";
pub const DELIVERY_RECEIVED: &str = "delivery_received";
pub const DELIVERY_COMMITTED: &str = "delivery_committed";
pub const DELIVERY_ROLLED_BACK: &str = "delivery_rolled_back";
pub const DELIVERY_ACKNOWLEDGED: &str = "delivery_acknowledged";
pub const DELIVERY_RECOVERED: &str = "delivery_recovered";
pub const DELIVERY_LOST: &str = "delivery_lost";
pub const LISTENER_FAILED: &str = "listener_failed";
pub const REDELIVERY_BACKOFF: &str = "redelivery_backoff";

// Supervisor events.
pub const CONSUMER_SPAWN: &str = "consumer_spawn";
pub const CONSUMER_RETIRE: &str = "consumer_retire";
pub const CONSUMER_EXIT: &str = "consumer_exit";
pub const CONSUMER_RESPAWN: &str = "consumer_respawn";
pub const SUPERVISOR_DRAIN_START: &str = "supervisor_drain_start";
pub const SUPERVISOR_DRAIN_OK: &str = "supervisor_drain_ok";

// Forwarder events.
pub const FORWARD_PUBLISH_OK: &str = "forward_publish_ok";
pub const FORWARD_PUBLISH_REJECTED: &str = "forward_publish_rejected";
pub const FORWARD_PUBLISH_TIMEOUT: &str = "forward_publish_timeout";
