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

//! In-process broker implementing [`jms_source::broker::ConnectionProvider`].
//!
//! Supports queues with competing consumers, topics with non-durable, durable and shared
//! subscriptions, transacted and acknowledge-mode sessions with redelivery, simple message
//! selectors, client-id exclusivity and fault injection. Used by the integration tests and
//! the demo streamer.

mod in_memory_broker;
pub use in_memory_broker::InMemoryBroker;

mod selector;
pub use selector::{Selector, SelectorError};

mod topology;
pub use topology::BrokerStats;
