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

//! Capabilities consumed from the broker client.
//!
//! The container never constructs a connection factory itself: a [`ConnectionProvider`] is
//! supplied from outside and may be shared by several containers. Protocol framing and
//! transport details stay behind these traits.
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use jms_source::broker::{BrokerConnection, ConnectionProvider};
//! use jms_source::ConnectionError;
//!
//! struct OfflineBroker;
//!
//! #[async_trait]
//! impl ConnectionProvider for OfflineBroker {
//!     async fn new_connection(
//!         &self,
//!         _client_id: Option<&str>,
//!     ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
//!         Err(ConnectionError::Unavailable("broker is offline".to_string()))
//!     }
//! }
//!
//! let provider: Arc<dyn ConnectionProvider> = Arc::new(OfflineBroker);
//! # let _ = provider;
//! ```

use crate::config::AcknowledgeMode;
use crate::error::ConnectionError;
use crate::message::{Destination, InboundMessage};
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// How a broker session settles delivered messages.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SessionMode {
    /// Deliveries are settled by `commit` / `rollback`.
    Transacted,
    Acknowledge(AcknowledgeMode),
}

impl Display for SessionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Transacted => f.write_str("TRANSACTED"),
            SessionMode::Acknowledge(mode) => write!(f, "{mode}"),
        }
    }
}

/// Topic subscription attributes bound by the container.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct SubscriptionSpec {
    pub name: Option<String>,
    pub durable: bool,
    pub shared: bool,
}

/// Everything a broker needs to open one consumer session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsumerSpec {
    pub destination: Destination,
    pub message_selector: Option<String>,
    /// Only ever present for topic destinations.
    pub subscription: Option<SubscriptionSpec>,
    pub session_mode: SessionMode,
}

/// Factory for broker connections, supplied by the embedding application.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn new_connection(
        &self,
        client_id: Option<&str>,
    ) -> Result<Arc<dyn BrokerConnection>, ConnectionError>;
}

/// A live broker connection shared read-only by all sessions of one container.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    async fn open_session(
        &self,
        spec: &ConsumerSpec,
    ) -> Result<Box<dyn BrokerSession>, ConnectionError>;

    /// Closes the connection; unsettled deliveries of its sessions return to the broker.
    async fn close(&self);
}

/// One broker session with a single consumer on it.
///
/// A session is exclusively owned by one consumer worker and is never shared.
/// `receive` must be cancel safe: dropping the future must not lose a message.
#[async_trait]
pub trait BrokerSession: Send {
    /// Waits up to `timeout` for the next delivery; `Ok(None)` when none arrived.
    async fn receive(&mut self, timeout: Duration)
        -> Result<Option<InboundMessage>, ConnectionError>;

    async fn acknowledge(&mut self, message: &InboundMessage) -> Result<(), ConnectionError>;

    /// Returns unacknowledged deliveries to the broker for redelivery.
    async fn recover(&mut self) -> Result<(), ConnectionError>;

    async fn commit(&mut self) -> Result<(), ConnectionError>;

    async fn rollback(&mut self) -> Result<(), ConnectionError>;

    async fn close(&mut self);
}
