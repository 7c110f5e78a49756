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

mod support;

use async_trait::async_trait;
use in_memory_broker::InMemoryBroker;
use jms_source::{
    HandlerError, InboundMessage, ListenerConfig, ListenerContainer, ListenerDefaults,
    ListenerPolicy, MessageListener,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::wait_until;

const BACKLOG: usize = 60;

/// Spends a fixed time on every delivery so a backlog keeps all consumers busy.
#[derive(Default)]
struct PacedListener {
    handled: AtomicUsize,
}

#[async_trait]
impl MessageListener for PacedListener {
    async fn on_message(&self, _message: &InboundMessage) -> Result<(), HandlerError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn start_container(
    broker: &InMemoryBroker,
    config: &ListenerConfig,
    listener: Arc<PacedListener>,
) -> ListenerContainer {
    let strategy = ListenerPolicy::new(ListenerDefaults::default())
        .derive(config)
        .expect("valid config");
    let mut container = ListenerContainer::new("elastic-source", support::fast_settings());
    container
        .set_message_listener(listener)
        .expect("listener accepted");
    container
        .configure(Arc::new(broker.clone()), config, strategy)
        .expect("configure");
    container.start().await.expect("start");
    container
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transacted_container_scales_with_backlog() {
    support::init_logging();

    let broker = InMemoryBroker::new();
    let listener = Arc::new(PacedListener::default());
    let config = ListenerConfig {
        session_transacted: true,
        concurrency: Some(1),
        max_concurrency: Some(3),
        ..ListenerConfig::for_queue("jobs")
    };
    let mut container = start_container(&broker, &config, listener.clone()).await;
    wait_until("initial consumer", || async {
        container.active_consumers() == 1
    })
    .await;

    for index in 0..BACKLOG {
        broker
            .send_to_queue("jobs", InboundMessage::text(&format!("job-{index}")))
            .await;
    }

    wait_until("scale up to ceiling", || async {
        container.active_consumers() == 3
    })
    .await;
    assert!(broker.stats().await.open_sessions <= 3);

    wait_until("backlog drained", || async {
        listener.handled.load(Ordering::SeqCst) == BACKLOG
    })
    .await;
    wait_until("scale down to floor", || async {
        container.active_consumers() == 1
    })
    .await;
    wait_until("surplus sessions closed", || async {
        broker.stats().await.open_sessions == 1
    })
    .await;

    container.stop().await;
    assert_eq!(broker.stats().await.commits, BACKLOG as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_transacted_container_keeps_fixed_consumer_count() {
    support::init_logging();

    let broker = InMemoryBroker::new();
    let listener = Arc::new(PacedListener::default());
    let config = ListenerConfig {
        concurrency: Some(2),
        max_concurrency: Some(5),
        ..ListenerConfig::for_queue("events")
    };
    let mut container = start_container(&broker, &config, listener.clone()).await;

    for index in 0..20 {
        broker
            .send_to_queue("events", InboundMessage::text(&format!("event-{index}")))
            .await;
    }

    wait_until("backlog drained", || async {
        listener.handled.load(Ordering::SeqCst) == 20
    })
    .await;
    assert_eq!(container.active_consumers(), 2);
    assert_eq!(broker.stats().await.sessions_opened, 2);

    // Idle receives never retire consumers below the floor.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(container.active_consumers(), 2);

    container.stop().await;
}
