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

//! Downstream channel receiving forwarded envelopes.

use crate::message::OutboundEnvelope;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Destination of forwarded messages; implemented by whatever the pipeline plugs in.
#[async_trait]
pub trait OutputChannel: Send + Sync {
    /// Returns `false` when the channel refuses the envelope.
    ///
    /// A channel may also apply back-pressure by not completing; the forwarder bounds that
    /// wait with its send timeout.
    async fn send(&self, envelope: OutboundEnvelope) -> bool;
}

/// Bounded in-process channel; the receiving half is handed to the pipeline.
#[derive(Clone, Debug)]
pub struct MpscOutputChannel {
    sender: mpsc::Sender<OutboundEnvelope>,
}

impl MpscOutputChannel {
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<OutboundEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl OutputChannel for MpscOutputChannel {
    async fn send(&self, envelope: OutboundEnvelope) -> bool {
        self.sender.send(envelope).await.is_ok()
    }
}
