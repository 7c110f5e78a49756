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

mod config;

use crate::config::Config;
use clap::Parser;
use in_memory_broker::InMemoryBroker;
use jms_source::{
    ContainerError, Destination, Endpoint, InboundMessage, ListenerPolicy, MessageForwarder,
    MpscOutputChannel,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Parser)]
#[command()]
struct StreamerArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[derive(Debug, Error)]
enum StreamerError {
    #[error("unable to read config file: {0}")]
    ReadConfig(#[source] std::io::Error),
    #[error("unable to parse config file: {0}")]
    ParseConfig(#[from] json5::Error),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("unable to listen for shutdown signal: {0}")]
    Signal(#[source] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StreamerError> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started jms-source-streamer");

    let args = StreamerArgs::parse();
    let contents = std::fs::read_to_string(&args.config).map_err(StreamerError::ReadConfig)?;
    let config: Config = json5::from_str(&contents)?;

    let broker = InMemoryBroker::new();
    let (channel, mut envelopes) = MpscOutputChannel::bounded(config.forwarder.output_queue_size);
    let forwarder =
        MessageForwarder::new(Arc::new(channel)).with_send_timeout(config.forwarder.send_timeout());

    let mut endpoint = Endpoint::from_config(
        &config.source.name,
        Arc::new(broker.clone()),
        &config.listener,
        &ListenerPolicy::new(config.listener_defaults),
        config.container.clone(),
        forwarder,
    )?;
    endpoint.start().await?;

    // The sink ends once the endpoint, and with it the forwarder, is dropped.
    let sink = tokio::spawn(async move {
        while let Some(envelope) = envelopes.recv().await {
            match serde_json::to_string(&envelope) {
                Ok(json) => info!(envelope = json.as_str(), "envelope forwarded"),
                Err(err) => warn!(err = %err, "unable to render envelope"),
            }
        }
    });

    let destination = if config.listener.is_topic {
        Destination::Topic(config.listener.destination_name.clone())
    } else {
        Destination::Queue(config.listener.destination_name.clone())
    };
    for sequence in 1..=config.demo.seed_messages {
        let message = InboundMessage::text(&format!("demo message {sequence}"))
            .with_property("sequence", i64::from(sequence));
        broker.send(&destination, message).await;
    }

    tokio::signal::ctrl_c()
        .await
        .map_err(StreamerError::Signal)?;

    let outcome = endpoint.stop().await;
    info!(outcome = %outcome, "jms-source-streamer stopped");

    drop(endpoint);
    let _ = sink.await;

    Ok(())
}
