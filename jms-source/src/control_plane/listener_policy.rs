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

//! Pure mapping from listener settings to a consumption strategy.

use crate::broker::SessionMode;
use crate::config::{AcknowledgeMode, ListenerConfig, ListenerDefaults};
use crate::error::ConfigurationError;
use crate::observability::events;
use tracing::debug;

const COMPONENT: &str = "listener_policy";

/// Consumption strategy selected for one container.
///
/// A non-transacted strategy has no ceiling: its consumer count never changes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ListenerStrategy {
    Transacted {
        concurrency: u32,
        /// `None` leaves the container default ceiling in place, which is `concurrency`.
        max_concurrency: Option<u32>,
        acknowledge_mode: Option<AcknowledgeMode>,
    },
    NonTransacted {
        concurrency: u32,
        acknowledge_mode: Option<AcknowledgeMode>,
    },
}

impl ListenerStrategy {
    pub fn is_transacted(&self) -> bool {
        matches!(self, ListenerStrategy::Transacted { .. })
    }

    pub fn concurrency(&self) -> u32 {
        match self {
            ListenerStrategy::Transacted { concurrency, .. }
            | ListenerStrategy::NonTransacted { concurrency, .. } => *concurrency,
        }
    }

    pub fn max_concurrency(&self) -> Option<u32> {
        match self {
            ListenerStrategy::Transacted {
                max_concurrency, ..
            } => *max_concurrency,
            ListenerStrategy::NonTransacted { .. } => None,
        }
    }

    /// Highest number of consumer sessions the container may run.
    pub fn consumer_ceiling(&self) -> u32 {
        let concurrency = self.concurrency();
        self.max_concurrency()
            .map_or(concurrency, |max| max.max(concurrency))
    }

    /// The acknowledge-mode override, if the policy applied one.
    pub fn acknowledge_mode(&self) -> Option<AcknowledgeMode> {
        match self {
            ListenerStrategy::Transacted {
                acknowledge_mode, ..
            }
            | ListenerStrategy::NonTransacted {
                acknowledge_mode, ..
            } => *acknowledge_mode,
        }
    }

    pub fn session_mode(&self) -> SessionMode {
        match self {
            ListenerStrategy::Transacted { .. } => SessionMode::Transacted,
            ListenerStrategy::NonTransacted {
                acknowledge_mode, ..
            } => SessionMode::Acknowledge(acknowledge_mode.unwrap_or(AcknowledgeMode::Auto)),
        }
    }
}

/// Selects transacted vs. non-transacted consumption and its concurrency bounds.
///
/// ```
/// use jms_source::{AcknowledgeMode, ListenerConfig, ListenerDefaults, ListenerPolicy};
///
/// let policy = ListenerPolicy::new(ListenerDefaults { concurrency: 2 });
/// let config = ListenerConfig {
///     session_transacted: true,
///     max_concurrency: Some(8),
///     ..ListenerConfig::for_queue("orders")
/// };
///
/// let strategy = policy.derive(&config).unwrap();
/// assert!(strategy.is_transacted());
/// assert_eq!(strategy.concurrency(), 2);
/// assert_eq!(strategy.consumer_ceiling(), 8);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ListenerPolicy {
    defaults: ListenerDefaults,
}

impl ListenerPolicy {
    pub fn new(defaults: ListenerDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ListenerDefaults {
        &self.defaults
    }

    pub fn derive(&self, config: &ListenerConfig) -> Result<ListenerStrategy, ConfigurationError> {
        validate_destination(config)?;

        let concurrency = config.concurrency.unwrap_or(self.defaults.concurrency);
        if concurrency == 0 {
            return Err(ConfigurationError::ZeroConcurrency);
        }

        // The override only takes effect together with a selector; see DESIGN.md.
        let acknowledge_mode = config.effective_selector().and(config.acknowledge_mode);

        let strategy = if config.session_transacted {
            if let Some(max_concurrency) = config.max_concurrency {
                if max_concurrency < concurrency {
                    return Err(ConfigurationError::MaxBelowConcurrency {
                        concurrency,
                        max_concurrency,
                    });
                }
            }
            ListenerStrategy::Transacted {
                concurrency,
                max_concurrency: config.max_concurrency,
                acknowledge_mode,
            }
        } else {
            ListenerStrategy::NonTransacted {
                concurrency,
                acknowledge_mode,
            }
        };

        validate_subscription_concurrency(config, &strategy)?;

        debug!(
            event = events::POLICY_DERIVED,
            component = COMPONENT,
            destination = config.destination_name.as_str(),
            transacted = strategy.is_transacted(),
            concurrency = strategy.concurrency(),
            ceiling = strategy.consumer_ceiling(),
            session_mode = %strategy.session_mode(),
            "derived listener strategy"
        );

        Ok(strategy)
    }
}

/// Destination and subscription checks shared by the policy and container binding.
pub(crate) fn validate_destination(config: &ListenerConfig) -> Result<(), ConfigurationError> {
    if config.destination_name.trim().is_empty() {
        return Err(ConfigurationError::EmptyDestination);
    }

    if !config.is_topic {
        if config.is_durable() {
            return Err(ConfigurationError::TopicOnlySetting {
                setting: "subscription_durable",
            });
        }
        if config.is_shared() {
            return Err(ConfigurationError::TopicOnlySetting {
                setting: "subscription_shared",
            });
        }
        if config.subscription_name.is_some() {
            return Err(ConfigurationError::TopicOnlySetting {
                setting: "subscription_name",
            });
        }
    }

    let has_name = config
        .subscription_name
        .as_deref()
        .is_some_and(|name| !name.trim().is_empty());
    if config.is_durable() && !has_name {
        return Err(ConfigurationError::MissingSubscriptionName);
    }

    Ok(())
}

/// A non-shared durable subscription admits exactly one consumer.
pub(crate) fn validate_subscription_concurrency(
    config: &ListenerConfig,
    strategy: &ListenerStrategy,
) -> Result<(), ConfigurationError> {
    if config.is_durable() && !config.is_shared() && strategy.consumer_ceiling() > 1 {
        return Err(ConfigurationError::DurableSubscriptionConcurrency(
            strategy.consumer_ceiling(),
        ));
    }
    Ok(())
}
