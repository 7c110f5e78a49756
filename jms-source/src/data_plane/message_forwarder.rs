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

//! Message listener that maps broker messages onto pipeline envelopes.

use crate::data_plane::output_channel::OutputChannel;
use crate::error::{ChannelUnavailableError, HandlerError};
use crate::listener::MessageListener;
use crate::message::{headers, InboundMessage, OutboundEnvelope, PropertyValue};
use crate::observability::{events, fields};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

const COMPONENT: &str = "message_forwarder";

/// Converts each delivered message and publishes it on the output channel.
///
/// A publish failure is returned to the container as a [`HandlerError`], which rolls back
/// or recovers the delivery so the broker redelivers it.
pub struct MessageForwarder {
    output: Arc<dyn OutputChannel>,
    send_timeout: Duration,
}

impl MessageForwarder {
    pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_millis(5000);

    pub fn new(output: Arc<dyn OutputChannel>) -> Self {
        Self {
            output,
            send_timeout: Self::DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Maps a message onto a new envelope without side effects on the channel.
    ///
    /// Standard broker headers are copied under the `jms_` names in [`headers`]; application
    /// properties are copied under their own names. Absent optional headers are omitted.
    pub fn forward(&self, message: &InboundMessage) -> OutboundEnvelope {
        let mut mapped: BTreeMap<String, PropertyValue> = message.properties.clone();

        let mut put = |name: &str, value: PropertyValue| {
            mapped.insert(name.to_string(), value);
        };

        if !message.message_id.is_empty() {
            put(headers::MESSAGE_ID, message.message_id.as_str().into());
        }
        if let Some(correlation_id) = &message.correlation_id {
            put(headers::CORRELATION_ID, correlation_id.as_str().into());
        }
        if let Some(message_type) = &message.message_type {
            put(headers::TYPE, message_type.as_str().into());
        }
        if let Some(reply_to) = &message.reply_to {
            put(headers::REPLY_TO, reply_to.to_string().into());
        }
        if let Some(destination) = &message.destination {
            put(headers::DESTINATION, destination.to_string().into());
        }
        if let Some(timestamp_ms) = message.timestamp_ms {
            put(headers::TIMESTAMP, PropertyValue::Int(clamp_to_i64(timestamp_ms)));
        }
        put(headers::PRIORITY, PropertyValue::Int(i64::from(message.priority)));
        put(headers::REDELIVERED, message.redelivered.into());
        put(
            headers::DELIVERY_COUNT,
            PropertyValue::Int(i64::from(message.delivery_count)),
        );

        OutboundEnvelope {
            id: Uuid::new_v4(),
            timestamp_ms: now_ms(),
            headers: mapped,
            payload: message.body.clone(),
        }
    }

    /// Hands the envelope to the output channel within the send timeout.
    pub async fn publish(&self, envelope: OutboundEnvelope) -> Result<(), ChannelUnavailableError> {
        let envelope_id = envelope.id;

        match tokio::time::timeout(self.send_timeout, self.output.send(envelope)).await {
            Ok(true) => {
                debug!(
                    event = events::FORWARD_PUBLISH_OK,
                    component = COMPONENT,
                    envelope_id = %envelope_id,
                    "envelope published"
                );
                Ok(())
            }
            Ok(false) => {
                warn!(
                    event = events::FORWARD_PUBLISH_REJECTED,
                    component = COMPONENT,
                    envelope_id = %envelope_id,
                    "output channel rejected envelope"
                );
                Err(ChannelUnavailableError::Rejected)
            }
            Err(_) => {
                warn!(
                    event = events::FORWARD_PUBLISH_TIMEOUT,
                    component = COMPONENT,
                    envelope_id = %envelope_id,
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "output channel did not accept envelope in time"
                );
                Err(ChannelUnavailableError::TimedOut(self.send_timeout))
            }
        }
    }
}

#[async_trait]
impl MessageListener for MessageForwarder {
    async fn on_message(&self, message: &InboundMessage) -> Result<(), HandlerError> {
        let envelope = self.forward(message);
        debug!(
            component = COMPONENT,
            msg_id = fields::format_message_id(message).as_str(),
            envelope_id = %envelope.id,
            "message mapped to envelope"
        );
        self.publish(envelope).await?;
        Ok(())
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::MessageForwarder;
    use crate::data_plane::output_channel::{MpscOutputChannel, OutputChannel};
    use crate::error::{ChannelUnavailableError, HandlerError};
    use crate::listener::MessageListener;
    use crate::message::{
        headers, Destination, InboundMessage, MessageBody, OutboundEnvelope, PropertyValue,
    };
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct RefusingChannel;

    #[async_trait]
    impl OutputChannel for RefusingChannel {
        async fn send(&self, _envelope: OutboundEnvelope) -> bool {
            false
        }
    }

    struct StalledChannel;

    #[async_trait]
    impl OutputChannel for StalledChannel {
        async fn send(&self, _envelope: OutboundEnvelope) -> bool {
            std::future::pending::<()>().await;
            true
        }
    }

    fn forwarder() -> MessageForwarder {
        let (channel, _receiver) = MpscOutputChannel::bounded(1);
        MessageForwarder::new(Arc::new(channel))
    }

    #[test]
    fn forward_maps_standard_headers_and_properties() {
        let mut message = InboundMessage::text("hello")
            .with_correlation_id("corr-1")
            .with_message_type("order")
            .with_property("region", "eu")
            .with_property("attempt", 3i64);
        message.message_id = "ID:42".to_string();
        message.reply_to = Some(Destination::Queue("replies".to_string()));
        message.destination = Some(Destination::Queue("orders".to_string()));
        message.timestamp_ms = Some(1_700_000_000_000);
        message.priority = 7;

        let envelope = forwarder().forward(&message);

        assert_eq!(envelope.payload, MessageBody::Text("hello".to_string()));
        assert_eq!(
            envelope.header(headers::MESSAGE_ID),
            Some(&PropertyValue::Text("ID:42".to_string()))
        );
        assert_eq!(
            envelope.header(headers::CORRELATION_ID),
            Some(&PropertyValue::Text("corr-1".to_string()))
        );
        assert_eq!(
            envelope.header(headers::TYPE),
            Some(&PropertyValue::Text("order".to_string()))
        );
        assert_eq!(
            envelope.header(headers::REPLY_TO),
            Some(&PropertyValue::Text("queue://replies".to_string()))
        );
        assert_eq!(
            envelope.header(headers::DESTINATION),
            Some(&PropertyValue::Text("queue://orders".to_string()))
        );
        assert_eq!(
            envelope.header(headers::TIMESTAMP),
            Some(&PropertyValue::Int(1_700_000_000_000))
        );
        assert_eq!(envelope.header(headers::PRIORITY), Some(&PropertyValue::Int(7)));
        assert_eq!(
            envelope.header(headers::REDELIVERED),
            Some(&PropertyValue::Bool(false))
        );
        assert_eq!(
            envelope.header(headers::DELIVERY_COUNT),
            Some(&PropertyValue::Int(1))
        );
        assert_eq!(
            envelope.header("region"),
            Some(&PropertyValue::Text("eu".to_string()))
        );
        assert_eq!(envelope.header("attempt"), Some(&PropertyValue::Int(3)));
    }

    #[test]
    fn forward_omits_absent_optional_headers() {
        let envelope = forwarder().forward(&InboundMessage::text("bare"));

        for absent in [
            headers::MESSAGE_ID,
            headers::CORRELATION_ID,
            headers::TYPE,
            headers::REPLY_TO,
            headers::DESTINATION,
            headers::TIMESTAMP,
        ] {
            assert_eq!(envelope.header(absent), None, "{absent} should be absent");
        }
    }

    #[test]
    fn forward_copies_binary_and_map_bodies() {
        let bytes = forwarder().forward(&InboundMessage::new(MessageBody::Bytes(vec![1, 2, 3])));
        assert_eq!(bytes.payload, MessageBody::Bytes(vec![1, 2, 3]));

        let mut entries = BTreeMap::new();
        entries.insert("sku".to_string(), PropertyValue::from("A-1"));
        let map = forwarder().forward(&InboundMessage::new(MessageBody::Map(entries.clone())));
        assert_eq!(map.payload, MessageBody::Map(entries));
    }

    #[test]
    fn every_envelope_gets_a_fresh_id() {
        let forwarder = forwarder();
        let message = InboundMessage::text("same");

        assert_ne!(forwarder.forward(&message).id, forwarder.forward(&message).id);
    }

    #[tokio::test]
    async fn on_message_publishes_to_channel() {
        let (channel, mut receiver) = MpscOutputChannel::bounded(1);
        let forwarder = MessageForwarder::new(Arc::new(channel));

        forwarder
            .on_message(&InboundMessage::text("hello"))
            .await
            .expect("published");

        let envelope = receiver.recv().await.expect("envelope delivered");
        assert_eq!(envelope.payload, MessageBody::Text("hello".to_string()));
    }

    #[tokio::test]
    async fn refused_publish_fails_the_delivery() {
        let forwarder = MessageForwarder::new(Arc::new(RefusingChannel));

        let result = forwarder.on_message(&InboundMessage::text("hello")).await;

        assert_eq!(
            result,
            Err(HandlerError::ChannelUnavailable(
                ChannelUnavailableError::Rejected
            ))
        );
    }

    #[tokio::test]
    async fn stalled_publish_times_out() {
        let forwarder = MessageForwarder::new(Arc::new(StalledChannel))
            .with_send_timeout(Duration::from_millis(20));

        let envelope = forwarder.forward(&InboundMessage::text("hello"));
        let result = forwarder.publish(envelope).await;

        assert_eq!(
            result,
            Err(ChannelUnavailableError::TimedOut(Duration::from_millis(20)))
        );
    }
}
