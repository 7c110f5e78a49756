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

//! Inbound broker messages and the outbound pipeline envelope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Typed message property / header value.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(value) => write!(f, "{value}"),
            PropertyValue::Int(value) => write!(f, "{value}"),
            PropertyValue::Double(value) => write!(f, "{value}"),
            PropertyValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// Message body as extracted from text, bytes and map messages.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    Text(String),
    Bytes(Vec<u8>),
    Map(BTreeMap<String, PropertyValue>),
}

impl MessageBody {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageBody::Text(_) => "text",
            MessageBody::Bytes(_) => "bytes",
            MessageBody::Map(_) => "map",
        }
    }
}

/// Queue or topic on the broker.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum Destination {
    Queue(String),
    Topic(String),
}

impl Destination {
    pub fn name(&self) -> &str {
        match self {
            Destination::Queue(name) | Destination::Topic(name) => name,
        }
    }

    pub fn is_topic(&self) -> bool {
        matches!(self, Destination::Topic(_))
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Queue(name) => write!(f, "queue://{name}"),
            Destination::Topic(name) => write!(f, "topic://{name}"),
        }
    }
}

/// A message as delivered by a broker session.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    pub message_id: String,
    pub correlation_id: Option<String>,
    pub message_type: Option<String>,
    pub reply_to: Option<Destination>,
    pub destination: Option<Destination>,
    pub timestamp_ms: Option<u64>,
    pub priority: u8,
    pub redelivered: bool,
    pub delivery_count: u32,
    pub properties: BTreeMap<String, PropertyValue>,
    pub body: MessageBody,
}

impl InboundMessage {
    pub fn new(body: MessageBody) -> Self {
        Self {
            message_id: String::new(),
            correlation_id: None,
            message_type: None,
            reply_to: None,
            destination: None,
            timestamp_ms: None,
            priority: 4,
            redelivered: false,
            delivery_count: 1,
            properties: BTreeMap::new(),
            body,
        }
    }

    pub fn text(body: &str) -> Self {
        Self::new(MessageBody::Text(body.to_string()))
    }

    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        self.correlation_id = Some(correlation_id.to_string());
        self
    }

    pub fn with_message_type(mut self, message_type: &str) -> Self {
        self.message_type = Some(message_type.to_string());
        self
    }
}

/// Pipeline message produced from an [`InboundMessage`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutboundEnvelope {
    pub id: Uuid,
    pub timestamp_ms: u64,
    pub headers: BTreeMap<String, PropertyValue>,
    pub payload: MessageBody,
}

impl OutboundEnvelope {
    pub fn header(&self, name: &str) -> Option<&PropertyValue> {
        self.headers.get(name)
    }
}

/// Header names under which standard broker headers appear on the envelope.
pub mod headers {
    pub const MESSAGE_ID: &str = "jms_messageId";
    pub const CORRELATION_ID: &str = "jms_correlationId";
    pub const TYPE: &str = "jms_type";
    pub const REPLY_TO: &str = "jms_replyTo";
    pub const DESTINATION: &str = "jms_destination";
    pub const TIMESTAMP: &str = "jms_timestamp";
    pub const PRIORITY: &str = "jms_priority";
    pub const REDELIVERED: &str = "jms_redelivered";
    pub const DELIVERY_COUNT: &str = "jms_deliveryCount";
}
