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

//! Immutable configuration structs consumed by the policy and the container.
//!
//! Values arrive already validated by the loading collaborator; the structs derive
//! `serde` traits so binaries can read them from json5 files.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Session acknowledgement policy for non-transacted consumption.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcknowledgeMode {
    /// The session considers a message consumed as soon as it is delivered.
    Auto,
    /// The container acknowledges explicitly after the listener returns successfully.
    Client,
    /// Lazy acknowledgement; duplicates are tolerated.
    DupsOk,
    /// No acknowledgement tracking at all.
    None,
}

impl AcknowledgeMode {
    /// Whether the container must acknowledge deliveries itself.
    pub fn requires_explicit_ack(self) -> bool {
        matches!(self, AcknowledgeMode::Client | AcknowledgeMode::DupsOk)
    }
}

impl Display for AcknowledgeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AcknowledgeMode::Auto => "AUTO",
            AcknowledgeMode::Client => "CLIENT",
            AcknowledgeMode::DupsOk => "DUPS_OK",
            AcknowledgeMode::None => "NONE",
        };
        f.write_str(label)
    }
}

/// Listener settings for one source destination.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    pub destination_name: String,
    #[serde(default)]
    pub is_topic: bool,
    #[serde(default)]
    pub message_selector: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub session_transacted: bool,
    #[serde(default)]
    pub acknowledge_mode: Option<AcknowledgeMode>,
    #[serde(default)]
    pub subscription_durable: Option<bool>,
    #[serde(default)]
    pub subscription_name: Option<String>,
    #[serde(default)]
    pub subscription_shared: Option<bool>,
    #[serde(default)]
    pub concurrency: Option<u32>,
    #[serde(default)]
    pub max_concurrency: Option<u32>,
}

impl ListenerConfig {
    pub fn for_queue(destination_name: &str) -> Self {
        Self {
            destination_name: destination_name.to_string(),
            ..Default::default()
        }
    }

    pub fn for_topic(destination_name: &str) -> Self {
        Self {
            destination_name: destination_name.to_string(),
            is_topic: true,
            ..Default::default()
        }
    }

    /// The selector, treating an empty string the same as an absent one.
    pub fn effective_selector(&self) -> Option<&str> {
        self.message_selector
            .as_deref()
            .filter(|selector| !selector.trim().is_empty())
    }

    pub fn is_durable(&self) -> bool {
        self.subscription_durable.unwrap_or(false)
    }

    pub fn is_shared(&self) -> bool {
        self.subscription_shared.unwrap_or(false)
    }
}

/// Defaults supplied by the broker-properties collaborator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerDefaults {
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for ListenerDefaults {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> u32 {
    1
}

/// Tuning knobs owned by the listener container itself.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ContainerSettings {
    /// Upper bound for one blocking receive before the worker reports itself idle.
    pub receive_timeout_ms: u64,
    /// Time granted to in-flight deliveries on `stop()` before workers are aborted.
    pub shutdown_grace_ms: u64,
    pub recovery_initial_interval_ms: u64,
    pub recovery_max_interval_ms: u64,
    pub recovery_multiplier: u32,
    /// Consecutive idle receives after which a surplus consumer is retired.
    pub idle_receives_before_retire: u32,
    /// Capacity of the worker → supervisor report queue.
    pub report_queue_size: usize,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 1000,
            shutdown_grace_ms: 5000,
            recovery_initial_interval_ms: 500,
            recovery_max_interval_ms: 30_000,
            recovery_multiplier: 2,
            idle_receives_before_retire: 1,
            report_queue_size: 64,
        }
    }
}

impl ContainerSettings {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn recovery_initial_interval(&self) -> Duration {
        Duration::from_millis(self.recovery_initial_interval_ms)
    }

    pub fn recovery_max_interval(&self) -> Duration {
        Duration::from_millis(self.recovery_max_interval_ms)
    }
}
