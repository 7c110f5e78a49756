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

//! Broker state: destinations, subscriptions, live connections and sessions.
//!
//! Everything here is synchronous and guarded by one lock in [`crate::InMemoryBroker`].

use crate::selector::Selector;
use jms_source::broker::{ConsumerSpec, SessionMode};
use jms_source::{ConnectionError, Destination, InboundMessage};
use std::collections::{HashMap, VecDeque};

pub(crate) type ConnectionId = u64;
pub(crate) type SessionId = u64;

/// Counters exposed for assertions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BrokerStats {
    pub connections_opened: u64,
    pub sessions_opened: u64,
    pub open_sessions: usize,
    pub deliveries: u64,
    pub redeliveries: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub acknowledgements: u64,
    pub recoveries: u64,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum SubscriptionKey {
    Named {
        client_id: Option<String>,
        name: String,
    },
    Ephemeral(SessionId),
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum StoreKey {
    Queue(String),
    Subscription(SubscriptionKey),
}

struct Subscription {
    topic: String,
    selector: Option<Selector>,
    durable: bool,
    shared: bool,
    consumers: usize,
    pending: VecDeque<InboundMessage>,
}

struct SessionEntry {
    connection: ConnectionId,
    store: StoreKey,
    selector: Option<Selector>,
    /// Transacted, CLIENT and DUPS_OK sessions hold deliveries until settled.
    settles: bool,
    unsettled: Vec<InboundMessage>,
}

struct ConnectionEntry {
    client_id: Option<String>,
}

#[derive(Default)]
pub(crate) struct Topology {
    queues: HashMap<String, VecDeque<InboundMessage>>,
    subscriptions: HashMap<SubscriptionKey, Subscription>,
    sessions: HashMap<SessionId, SessionEntry>,
    connections: HashMap<ConnectionId, ConnectionEntry>,
    next_id: u64,
    stats: BrokerStats,
}

fn session_gone() -> ConnectionError {
    ConnectionError::Lost("session or connection is closed".to_string())
}

impl Topology {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn stats(&self) -> BrokerStats {
        BrokerStats {
            open_sessions: self.sessions.len(),
            ..self.stats.clone()
        }
    }

    /// Stores a message on a queue or fans it out to matching topic subscriptions.
    ///
    /// Returns the assigned message id.
    pub(crate) fn publish(
        &mut self,
        destination: &Destination,
        mut message: InboundMessage,
        now_ms: u64,
    ) -> String {
        if message.message_id.is_empty() {
            message.message_id = format!("ID:in-memory-{}", self.allocate_id());
        }
        message.destination = Some(destination.clone());
        message.timestamp_ms.get_or_insert(now_ms);
        let message_id = message.message_id.clone();

        match destination {
            Destination::Queue(name) => {
                self.queues
                    .entry(name.clone())
                    .or_default()
                    .push_back(message);
            }
            Destination::Topic(name) => {
                for subscription in self
                    .subscriptions
                    .values_mut()
                    .filter(|subscription| &subscription.topic == name)
                {
                    let accepted = subscription
                        .selector
                        .as_ref()
                        .map_or(true, |selector| selector.matches(&message));
                    if accepted {
                        subscription.pending.push_back(message.clone());
                    }
                }
            }
        }

        message_id
    }

    pub(crate) fn connect(
        &mut self,
        client_id: Option<&str>,
    ) -> Result<ConnectionId, ConnectionError> {
        if let Some(client_id) = client_id {
            let in_use = self
                .connections
                .values()
                .any(|connection| connection.client_id.as_deref() == Some(client_id));
            if in_use {
                return Err(ConnectionError::Rejected(format!(
                    "client id '{client_id}' is already in use"
                )));
            }
        }

        let id = self.allocate_id();
        self.connections.insert(
            id,
            ConnectionEntry {
                client_id: client_id.map(str::to_string),
            },
        );
        self.stats.connections_opened += 1;
        Ok(id)
    }

    pub(crate) fn is_connected(&self, connection: ConnectionId) -> bool {
        self.connections.contains_key(&connection)
    }

    pub(crate) fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    pub(crate) fn open_session(
        &mut self,
        connection: ConnectionId,
        spec: &ConsumerSpec,
    ) -> Result<SessionId, ConnectionError> {
        let client_id = self
            .connections
            .get(&connection)
            .ok_or_else(session_gone)?
            .client_id
            .clone();
        let selector = spec
            .message_selector
            .as_deref()
            .map(Selector::parse)
            .transpose()
            .map_err(|err| ConnectionError::Rejected(format!("invalid selector: {err}")))?;

        let session_id = self.allocate_id();
        let store = match &spec.destination {
            Destination::Queue(name) => {
                self.queues.entry(name.clone()).or_default();
                StoreKey::Queue(name.clone())
            }
            Destination::Topic(topic) => {
                let subscription = spec.subscription.clone().unwrap_or_default();
                let key = match subscription.name {
                    Some(name) if subscription.durable || subscription.shared => {
                        SubscriptionKey::Named { client_id, name }
                    }
                    _ => SubscriptionKey::Ephemeral(session_id),
                };

                let reusable = self.subscriptions.get(&key).is_some_and(|existing| {
                    existing.topic == *topic && existing.selector == selector
                });
                if let Some(existing) = self.subscriptions.get(&key) {
                    if !existing.shared && existing.consumers > 0 {
                        return Err(ConnectionError::Rejected(
                            "subscription already has an active consumer".to_string(),
                        ));
                    }
                }
                if !reusable {
                    // Changing topic or selector of an inactive subscription replaces it.
                    self.subscriptions.insert(
                        key.clone(),
                        Subscription {
                            topic: topic.clone(),
                            selector: selector.clone(),
                            durable: subscription.durable,
                            shared: subscription.shared,
                            consumers: 0,
                            pending: VecDeque::new(),
                        },
                    );
                }
                if let Some(existing) = self.subscriptions.get_mut(&key) {
                    existing.consumers += 1;
                }
                StoreKey::Subscription(key)
            }
        };

        self.sessions.insert(
            session_id,
            SessionEntry {
                connection,
                store,
                selector,
                settles: !matches!(
                    spec.session_mode,
                    SessionMode::Acknowledge(mode) if !mode.requires_explicit_ack()
                ),
                unsettled: Vec::new(),
            },
        );
        self.stats.sessions_opened += 1;
        Ok(session_id)
    }

    fn store_mut(&mut self, key: &StoreKey) -> Option<&mut VecDeque<InboundMessage>> {
        match key {
            StoreKey::Queue(name) => self.queues.get_mut(name),
            StoreKey::Subscription(key) => self
                .subscriptions
                .get_mut(key)
                .map(|subscription| &mut subscription.pending),
        }
    }

    /// Takes the next deliverable message for `session`, if any.
    pub(crate) fn take(
        &mut self,
        session: SessionId,
    ) -> Result<Option<InboundMessage>, ConnectionError> {
        let entry = self.sessions.get(&session).ok_or_else(session_gone)?;
        let store_key = entry.store.clone();
        let selector = entry.selector.clone();

        let Some(store) = self.store_mut(&store_key) else {
            return Ok(None);
        };
        let position = store.iter().position(|message| {
            selector
                .as_ref()
                .map_or(true, |selector| selector.matches(message))
        });
        let Some(message) = position.and_then(|index| store.remove(index)) else {
            return Ok(None);
        };

        self.stats.deliveries += 1;
        if message.redelivered {
            self.stats.redeliveries += 1;
        }
        if let Some(entry) = self.sessions.get_mut(&session) {
            if entry.settles {
                entry.unsettled.push(message.clone());
            }
        }
        Ok(Some(message))
    }

    fn unsettled_mut(
        &mut self,
        session: SessionId,
    ) -> Result<&mut Vec<InboundMessage>, ConnectionError> {
        self.sessions
            .get_mut(&session)
            .map(|entry| &mut entry.unsettled)
            .ok_or_else(session_gone)
    }

    pub(crate) fn commit(&mut self, session: SessionId) -> Result<(), ConnectionError> {
        self.unsettled_mut(session)?.clear();
        self.stats.commits += 1;
        Ok(())
    }

    pub(crate) fn acknowledge(&mut self, session: SessionId) -> Result<(), ConnectionError> {
        // Acknowledging one message acknowledges everything delivered before it.
        self.unsettled_mut(session)?.clear();
        self.stats.acknowledgements += 1;
        Ok(())
    }

    pub(crate) fn rollback(&mut self, session: SessionId) -> Result<(), ConnectionError> {
        self.requeue_unsettled(session)?;
        self.stats.rollbacks += 1;
        Ok(())
    }

    pub(crate) fn recover(&mut self, session: SessionId) -> Result<(), ConnectionError> {
        self.requeue_unsettled(session)?;
        self.stats.recoveries += 1;
        Ok(())
    }

    /// Puts unsettled deliveries back at the head of their store, marked as redelivered.
    fn requeue_unsettled(&mut self, session: SessionId) -> Result<(), ConnectionError> {
        let entry = self.sessions.get_mut(&session).ok_or_else(session_gone)?;
        let returned = std::mem::take(&mut entry.unsettled);
        let store_key = entry.store.clone();

        if let Some(store) = self.store_mut(&store_key) {
            for mut message in returned.into_iter().rev() {
                message.redelivered = true;
                message.delivery_count = message.delivery_count.saturating_add(1);
                store.push_front(message);
            }
        }
        Ok(())
    }

    pub(crate) fn close_session(&mut self, session: SessionId) {
        if self.requeue_unsettled(session).is_err() {
            return;
        }
        let Some(entry) = self.sessions.remove(&session) else {
            return;
        };

        if let StoreKey::Subscription(key) = entry.store {
            let remove = match self.subscriptions.get_mut(&key) {
                Some(subscription) => {
                    subscription.consumers = subscription.consumers.saturating_sub(1);
                    !subscription.durable && subscription.consumers == 0
                }
                None => false,
            };
            if remove {
                self.subscriptions.remove(&key);
            }
        }
    }

    /// Closes every session of the connection and frees its client id.
    pub(crate) fn close_connection(&mut self, connection: ConnectionId) -> bool {
        let sessions: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, entry)| entry.connection == connection)
            .map(|(id, _)| *id)
            .collect();
        for session in sessions {
            self.close_session(session);
        }
        self.connections.remove(&connection).is_some()
    }

    pub(crate) fn queue_depth(&self, name: &str) -> usize {
        self.queues.get(name).map_or(0, VecDeque::len)
    }

    pub(crate) fn subscription_depth(&self, client_id: Option<&str>, name: &str) -> Option<usize> {
        self.subscriptions
            .get(&SubscriptionKey::Named {
                client_id: client_id.map(str::to_string),
                name: name.to_string(),
            })
            .map(|subscription| subscription.pending.len())
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.sessions
            .values()
            .map(|entry| entry.unsettled.len())
            .sum()
    }
}
