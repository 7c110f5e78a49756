/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! # jms-source
//!
//! `jms-source` is a message-driven ingestion adapter: it consumes messages from one broker
//! destination (queue or topic) and forwards each of them to a single downstream output
//! channel.
//!
//! Typical usage is centered on [`Endpoint`], which composes a [`ListenerContainer`] with a
//! [`MessageForwarder`]. The broker client itself stays outside the crate behind
//! [`broker::ConnectionProvider`].
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use jms_source::broker::{BrokerConnection, ConnectionProvider};
//! use jms_source::{
//!     ConnectionError, ContainerSettings, Endpoint, ListenerConfig, ListenerDefaults,
//!     ListenerPolicy, ListenerStrategy, MessageForwarder, MpscOutputChannel, StopOutcome,
//! };
//!
//! # struct OfflineBroker;
//! #
//! # #[async_trait]
//! # impl ConnectionProvider for OfflineBroker {
//! #     async fn new_connection(
//! #         &self,
//! #         _client_id: Option<&str>,
//! #     ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
//! #         Err(ConnectionError::Unavailable("not reachable in doctest".to_string()))
//! #     }
//! # }
//! #
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let (channel, _envelopes) = MpscOutputChannel::bounded(64);
//! let config = ListenerConfig {
//!     session_transacted: true,
//!     concurrency: Some(2),
//!     max_concurrency: Some(8),
//!     ..ListenerConfig::for_queue("orders")
//! };
//!
//! let mut endpoint = Endpoint::from_config(
//!     "orders-source",
//!     Arc::new(OfflineBroker),
//!     &config,
//!     &ListenerPolicy::new(ListenerDefaults::default()),
//!     ContainerSettings::default(),
//!     MessageForwarder::new(Arc::new(channel)),
//! )
//! .unwrap();
//!
//! assert!(matches!(
//!     endpoint.container().strategy(),
//!     Some(ListenerStrategy::Transacted { concurrency: 2, max_concurrency: Some(8), .. })
//! ));
//!
//! endpoint.start().await.unwrap();
//! assert_eq!(endpoint.stop().await, StopOutcome::Drained);
//! # });
//! ```
//!
//! ## Delivery contract
//!
//! - Transacted sessions commit after the listener returns `Ok` and roll back otherwise, so
//!   the broker redelivers the message.
//! - `CLIENT` and `DUPS_OK` sessions acknowledge after success and recover after failure.
//! - `AUTO` and `NONE` sessions treat the message as consumed on delivery: a listener
//!   failure is logged and the message is lost.
//!
//! ## Internal architecture map
//!
//! - API facade: [`Endpoint`], [`ListenerContainer`], [`MessageForwarder`]
//! - Control plane: strategy derivation, destination binding and lifecycle state
//! - Data plane: shared connection, consumer workers and their supervisor, forwarding
//! - Runtime: reconnect backoff and consumer scaling rules
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not unconditionally initialize a global
//! subscriber. Binaries/tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

pub mod broker;

mod config;
pub use config::{AcknowledgeMode, ContainerSettings, ListenerConfig, ListenerDefaults};

mod control_plane;
pub use control_plane::container_state::ContainerState;
pub use control_plane::listener_policy::{ListenerPolicy, ListenerStrategy};

mod data_plane;
pub use data_plane::message_forwarder::MessageForwarder;
pub use data_plane::output_channel::{MpscOutputChannel, OutputChannel};

mod endpoint;
pub use endpoint::Endpoint;

mod error;
pub use error::{
    ChannelUnavailableError, ConfigurationError, ConnectionError, ContainerError, HandlerError,
    IllegalStateError,
};

mod listener;
pub use listener::MessageListener;

mod listener_container;
pub use listener_container::{ListenerContainer, StopOutcome};

mod message;
pub use message::{
    headers, Destination, InboundMessage, MessageBody, OutboundEnvelope, PropertyValue,
};

#[doc(hidden)]
pub mod observability;
mod runtime;
