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

#![allow(dead_code)]

use async_trait::async_trait;
use in_memory_broker::InMemoryBroker;
use jms_source::{
    ContainerSettings, Endpoint, ListenerConfig, ListenerDefaults, ListenerPolicy, MessageBody,
    MessageForwarder, OutboundEnvelope, OutputChannel,
};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WAIT_LIMIT: Duration = Duration::from_secs(10);

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Settings tuned so tests observe idle reports and recovery quickly.
pub(crate) fn fast_settings() -> ContainerSettings {
    ContainerSettings {
        receive_timeout_ms: 50,
        shutdown_grace_ms: 2_000,
        recovery_initial_interval_ms: 10,
        recovery_max_interval_ms: 50,
        recovery_multiplier: 2,
        idle_receives_before_retire: 1,
        report_queue_size: 64,
    }
}

/// Output channel that keeps every accepted envelope and can refuse the first few.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    accepted: Mutex<Vec<OutboundEnvelope>>,
    refuse_remaining: AtomicU32,
}

impl RecordingChannel {
    pub(crate) fn refusing_first(count: u32) -> Self {
        Self {
            accepted: Mutex::new(Vec::new()),
            refuse_remaining: AtomicU32::new(count),
        }
    }

    pub(crate) fn envelopes(&self) -> Vec<OutboundEnvelope> {
        self.accepted.lock().unwrap().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.accepted.lock().unwrap().len()
    }

    /// Text payloads in arrival order.
    pub(crate) fn texts(&self) -> Vec<String> {
        self.accepted
            .lock()
            .unwrap()
            .iter()
            .filter_map(|envelope| match &envelope.payload {
                MessageBody::Text(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl OutputChannel for RecordingChannel {
    async fn send(&self, envelope: OutboundEnvelope) -> bool {
        let refused = self
            .refuse_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if refused {
            return false;
        }
        self.accepted.lock().unwrap().push(envelope);
        true
    }
}

pub(crate) fn make_endpoint(
    name: &str,
    broker: &InMemoryBroker,
    config: &ListenerConfig,
    channel: Arc<RecordingChannel>,
) -> Endpoint {
    Endpoint::from_config(
        name,
        Arc::new(broker.clone()),
        config,
        &ListenerPolicy::new(ListenerDefaults::default()),
        fast_settings(),
        MessageForwarder::new(channel),
    )
    .expect("endpoint configuration should succeed")
}

/// Polls `check` until it holds; panics with `what` if it never does.
pub(crate) async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let polled = tokio::time::timeout(WAIT_LIMIT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(polled.is_ok(), "timed out waiting for {what}");
}
