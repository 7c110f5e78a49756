//! Data-plane layer.
//!
//! Owns the shared broker connection, the consumer workers and their supervisor, and the
//! forwarding listener that turns deliveries into pipeline envelopes.
//!
//! ```
//! use std::sync::Arc;
//! use jms_source::{InboundMessage, MessageBody, MessageForwarder, MessageListener, MpscOutputChannel};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let (channel, mut envelopes) = MpscOutputChannel::bounded(8);
//! let forwarder = MessageForwarder::new(Arc::new(channel));
//!
//! let message = InboundMessage::text("order created").with_correlation_id("order-7");
//! forwarder.on_message(&message).await.unwrap();
//!
//! let envelope = envelopes.recv().await.unwrap();
//! assert_eq!(envelope.payload, MessageBody::Text("order created".to_string()));
//! # });
//! ```

pub(crate) mod consumer_supervisor;
pub(crate) mod consumer_worker;
pub(crate) mod message_forwarder;
pub(crate) mod output_channel;
pub(crate) mod shared_connection;
