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

//! Shared field values and value-format helpers for structured events.

use crate::message::{Destination, InboundMessage};

pub const NONE: &str = "none";
pub const REASON_SHUTDOWN: &str = "shutdown";
pub const REASON_IDLE: &str = "idle";
pub const REASON_SESSION_FAILURE: &str = "session_failure";
pub const REASON_AUTO_ACKNOWLEDGED: &str = "auto_acknowledged";

/// Correlation fields attached to every consumer-worker event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkerContext {
    pub container: String,
    pub worker_id: String,
}

impl WorkerContext {
    pub fn new(container: impl Into<String>, worker_id: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            worker_id: worker_id.into(),
        }
    }
}

pub fn format_message_id(message: &InboundMessage) -> String {
    if message.message_id.is_empty() {
        NONE.to_string()
    } else {
        message.message_id.clone()
    }
}

pub fn format_correlation_id(message: &InboundMessage) -> String {
    message
        .correlation_id
        .clone()
        .unwrap_or_else(|| NONE.to_string())
}

pub fn format_destination(destination: &Destination) -> String {
    destination.to_string()
}

pub fn format_message_destination(message: &InboundMessage) -> String {
    message
        .destination
        .as_ref()
        .map(format_destination)
        .unwrap_or_else(|| NONE.to_string())
}
