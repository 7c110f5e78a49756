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

use in_memory_broker::InMemoryBroker;
use jms_source::{ContainerState, InboundMessage, ListenerConfig, StopOutcome};
use std::sync::Arc;
use support::{make_endpoint, wait_until, RecordingChannel};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_succeeds_while_broker_is_unreachable() {
    support::init_logging();

    let broker = InMemoryBroker::new();
    broker.fail_next_connections(3);
    let channel = Arc::new(RecordingChannel::default());
    let config = ListenerConfig {
        session_transacted: true,
        ..ListenerConfig::for_queue("orders")
    };
    let mut endpoint = make_endpoint("orders-source", &broker, &config, channel.clone());

    endpoint
        .start()
        .await
        .expect("unreachable broker must not fail start");
    assert_eq!(endpoint.container().state(), ContainerState::Running);

    broker
        .send_to_queue("orders", InboundMessage::text("queued-while-down"))
        .await;
    wait_until("envelope after reconnect", || async { channel.len() == 1 }).await;

    assert_eq!(endpoint.stop().await, StopOutcome::Drained);
    assert_eq!(broker.stats().await.connections_opened, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn consumers_reconnect_after_connection_loss() {
    support::init_logging();

    let broker = InMemoryBroker::new();
    let channel = Arc::new(RecordingChannel::default());
    let config = ListenerConfig {
        session_transacted: true,
        concurrency: Some(2),
        ..ListenerConfig::for_queue("orders")
    };
    let mut endpoint = make_endpoint("orders-source", &broker, &config, channel.clone());
    endpoint.start().await.expect("start");

    broker
        .send_to_queue("orders", InboundMessage::text("before"))
        .await;
    wait_until("first delivery committed", || async {
        broker.stats().await.commits == 1
    })
    .await;

    assert_eq!(broker.sever_connections().await, 1);
    wait_until("sessions reopened", || async {
        broker.stats().await.open_sessions == 2
    })
    .await;

    broker
        .send_to_queue("orders", InboundMessage::text("after"))
        .await;
    wait_until("second envelope", || async { channel.len() == 2 }).await;
    assert_eq!(channel.texts(), vec!["before", "after"]);

    endpoint.stop().await;
    // Both workers share the replacement connection.
    assert_eq!(broker.stats().await.connections_opened, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn durable_subscription_keeps_messages_across_restart() {
    support::init_logging();

    let broker = InMemoryBroker::new();
    let channel = Arc::new(RecordingChannel::default());
    let config = ListenerConfig {
        client_id: Some("audit-client".to_string()),
        subscription_durable: Some(true),
        subscription_name: Some("audit".to_string()),
        ..ListenerConfig::for_topic("ledger")
    };
    let mut endpoint = make_endpoint("ledger-source", &broker, &config, channel.clone());

    endpoint.start().await.expect("start");
    endpoint.stop().await;

    broker
        .send_to_topic("ledger", InboundMessage::text("entry-1"))
        .await;
    broker
        .send_to_topic("ledger", InboundMessage::text("entry-2"))
        .await;
    assert_eq!(
        broker
            .subscription_depth(Some("audit-client"), "audit")
            .await,
        Some(2)
    );

    endpoint.start().await.expect("restart");
    wait_until("stored entries", || async { channel.len() == 2 }).await;
    assert_eq!(channel.texts(), vec!["entry-1", "entry-2"]);

    endpoint.stop().await;
}
