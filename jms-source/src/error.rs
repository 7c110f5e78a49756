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

//! Error taxonomy for configuration, lifecycle, broker and delivery failures.

use crate::control_plane::container_state::ContainerState;
use std::time::Duration;
use thiserror::Error;

/// Invalid combination of destination, subscription or concurrency settings.
///
/// Fatal at startup: a container never reaches `Running` with one of these.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("destination name must not be empty")]
    EmptyDestination,
    #[error("{setting} is only supported for topic destinations")]
    TopicOnlySetting { setting: &'static str },
    #[error("durable subscription requires a subscription name")]
    MissingSubscriptionName,
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("max concurrency {max_concurrency} is lower than concurrency {concurrency}")]
    MaxBelowConcurrency {
        concurrency: u32,
        max_concurrency: u32,
    },
    #[error("only 1 concurrent consumer supported for a non-shared durable subscription, got {0}")]
    DurableSubscriptionConcurrency(u32),
}

/// Lifecycle API misuse by the composing code.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum IllegalStateError {
    #[error("cannot {operation} while container is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: ContainerState,
    },
    #[error("no message listener registered")]
    NoMessageListener,
}

/// Synchronous failures of `configure()` and `start()`.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),
}

/// Transient broker-side failure; retried with backoff while the container runs.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConnectionError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("connection lost: {0}")]
    Lost(String),
    #[error("broker rejected request: {0}")]
    Rejected(String),
}

impl ConnectionError {
    /// Whether the underlying connection should be considered broken.
    ///
    /// A rejected request leaves the connection usable for other sessions.
    pub fn is_connection_failure(&self) -> bool {
        !matches!(self, ConnectionError::Rejected(_))
    }
}

/// The output channel did not take the envelope.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ChannelUnavailableError {
    #[error("output channel rejected the envelope")]
    Rejected,
    #[error("output channel did not accept the envelope within {0:?}")]
    TimedOut(Duration),
}

/// Failure of one listener invocation; triggers rollback or recovery.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum HandlerError {
    #[error(transparent)]
    ChannelUnavailable(#[from] ChannelUnavailableError),
    #[error("listener failed: {0}")]
    Listener(String),
    #[error("listener panicked: {0}")]
    Panicked(String),
}
