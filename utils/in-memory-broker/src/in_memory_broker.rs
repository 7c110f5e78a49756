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

use crate::topology::{BrokerStats, ConnectionId, SessionId, Topology};
use async_trait::async_trait;
use jms_source::broker::{BrokerConnection, BrokerSession, ConnectionProvider, ConsumerSpec};
use jms_source::{ConnectionError, Destination, InboundMessage};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

const COMPONENT: &str = "in_memory_broker";

#[derive(Default)]
struct BrokerShared {
    topology: Mutex<Topology>,
    /// Woken whenever a message may have become deliverable or a connection went away.
    changed: Notify,
    refuse_connections: AtomicU32,
}

impl BrokerShared {
    async fn close_connection(&self, connection: ConnectionId) -> bool {
        let closed = self.topology.lock().await.close_connection(connection);
        self.changed.notify_waiters();
        closed
    }
}

/// Broker living entirely in process memory.
///
/// Cloning yields another handle to the same broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    shared: Arc<BrokerShared>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a message and returns the message id it was stored under.
    pub async fn send(&self, destination: &Destination, message: InboundMessage) -> String {
        let message_id =
            self.shared
                .topology
                .lock()
                .await
                .publish(destination, message, now_ms());
        self.shared.changed.notify_waiters();
        debug!(
            component = COMPONENT,
            destination = %destination,
            msg_id = message_id.as_str(),
            "message published"
        );
        message_id
    }

    pub async fn send_to_queue(&self, queue: &str, message: InboundMessage) -> String {
        self.send(&Destination::Queue(queue.to_string()), message)
            .await
    }

    pub async fn send_to_topic(&self, topic: &str, message: InboundMessage) -> String {
        self.send(&Destination::Topic(topic.to_string()), message)
            .await
    }

    /// Refuses the next `count` connection attempts with `ConnectionError::Unavailable`.
    pub fn fail_next_connections(&self, count: u32) {
        self.shared
            .refuse_connections
            .store(count, Ordering::SeqCst);
    }

    /// Drops every live connection as a network failure would; returns how many there were.
    pub async fn sever_connections(&self) -> usize {
        let severed = {
            let mut topology = self.shared.topology.lock().await;
            let connections = topology.connection_ids();
            for connection in &connections {
                topology.close_connection(*connection);
            }
            connections.len()
        };
        self.shared.changed.notify_waiters();
        debug!(
            component = COMPONENT,
            severed, "live connections severed"
        );
        severed
    }

    pub async fn stats(&self) -> BrokerStats {
        self.shared.topology.lock().await.stats()
    }

    /// Messages waiting on the queue, not counting unsettled deliveries.
    pub async fn queue_depth(&self, queue: &str) -> usize {
        self.shared.topology.lock().await.queue_depth(queue)
    }

    pub async fn subscription_depth(&self, client_id: Option<&str>, name: &str) -> Option<usize> {
        self.shared
            .topology
            .lock()
            .await
            .subscription_depth(client_id, name)
    }

    /// Deliveries handed to sessions and not yet committed or acknowledged.
    pub async fn in_flight(&self) -> usize {
        self.shared.topology.lock().await.in_flight()
    }

    fn take_refusal(&self) -> bool {
        self.shared
            .refuse_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }
}

#[async_trait]
impl ConnectionProvider for InMemoryBroker {
    async fn new_connection(
        &self,
        client_id: Option<&str>,
    ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
        if self.take_refusal() {
            return Err(ConnectionError::Unavailable(
                "connection refused by fault injection".to_string(),
            ));
        }

        let id = self.shared.topology.lock().await.connect(client_id)?;
        debug!(
            component = COMPONENT,
            connection_id = id,
            client_id = client_id.unwrap_or("none"),
            "connection opened"
        );
        Ok(Arc::new(InMemoryConnection {
            id,
            shared: self.shared.clone(),
        }))
    }
}

struct InMemoryConnection {
    id: ConnectionId,
    shared: Arc<BrokerShared>,
}

#[async_trait]
impl BrokerConnection for InMemoryConnection {
    async fn open_session(
        &self,
        spec: &ConsumerSpec,
    ) -> Result<Box<dyn BrokerSession>, ConnectionError> {
        let id = self
            .shared
            .topology
            .lock()
            .await
            .open_session(self.id, spec)?;
        Ok(Box::new(InMemorySession {
            id,
            connection: self.id,
            shared: self.shared.clone(),
        }))
    }

    async fn close(&self) {
        if self.shared.close_connection(self.id).await {
            debug!(
                component = COMPONENT,
                connection_id = self.id,
                "connection closed"
            );
        }
    }
}

struct InMemorySession {
    id: SessionId,
    connection: ConnectionId,
    shared: Arc<BrokerShared>,
}

#[async_trait]
impl BrokerSession for InMemorySession {
    async fn receive(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<InboundMessage>, ConnectionError> {
        let deadline = Instant::now() + timeout;

        loop {
            let changed = self.shared.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            {
                let mut topology = self.shared.topology.lock().await;
                if !topology.is_connected(self.connection) {
                    return Err(ConnectionError::Lost("connection severed".to_string()));
                }
                if let Some(message) = topology.take(self.id)? {
                    return Ok(Some(message));
                }
            }

            tokio::select! {
                _ = &mut changed => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }

    async fn acknowledge(&mut self, _message: &InboundMessage) -> Result<(), ConnectionError> {
        self.shared.topology.lock().await.acknowledge(self.id)
    }

    async fn recover(&mut self) -> Result<(), ConnectionError> {
        self.shared.topology.lock().await.recover(self.id)?;
        self.shared.changed.notify_waiters();
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), ConnectionError> {
        self.shared.topology.lock().await.commit(self.id)
    }

    async fn rollback(&mut self) -> Result<(), ConnectionError> {
        self.shared.topology.lock().await.rollback(self.id)?;
        self.shared.changed.notify_waiters();
        Ok(())
    }

    async fn close(&mut self) {
        self.shared.topology.lock().await.close_session(self.id);
        self.shared.changed.notify_waiters();
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
