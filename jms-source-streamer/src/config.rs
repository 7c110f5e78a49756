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

use jms_source::{ContainerSettings, ListenerConfig, ListenerDefaults};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) source: SourceConfig,
    pub(crate) listener: ListenerConfig,
    #[serde(default)]
    pub(crate) listener_defaults: ListenerDefaults,
    #[serde(default)]
    pub(crate) container: ContainerSettings,
    #[serde(default)]
    pub(crate) forwarder: ForwarderConfig,
    #[serde(default)]
    pub(crate) demo: DemoConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub(crate) name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields, default)]
pub struct ForwarderConfig {
    pub(crate) send_timeout_ms: u64,
    pub(crate) output_queue_size: usize,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5000,
            output_queue_size: 64,
        }
    }
}

impl ForwarderConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// Messages published into the in-process broker at startup.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields, default)]
pub struct DemoConfig {
    pub(crate) seed_messages: u32,
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn bundled_config_parses() {
        let config: Config = json5::from_str(include_str!("../config/DEFAULT_CONFIG.json5"))
            .expect("bundled config is valid");

        assert_eq!(config.source.name, "orders-source");
        assert_eq!(config.listener.max_concurrency, Some(4));
        assert_eq!(config.demo.seed_messages, 5);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let config: Config = json5::from_str(
            r#"{ source: { name: "minimal" }, listener: { destination_name: "orders" } }"#,
        )
        .expect("minimal config is valid");

        assert_eq!(config.listener_defaults.concurrency, 1);
        assert_eq!(config.container.receive_timeout_ms, 1000);
        assert_eq!(config.forwarder.output_queue_size, 64);
        assert_eq!(config.demo.seed_messages, 0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<Config, _> = json5::from_str(
            r#"{ source: { name: "x", colour: "red" }, listener: { destination_name: "orders" } }"#,
        );

        assert!(result.is_err());
    }
}
