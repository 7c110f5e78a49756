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

use crate::broker::ConnectionProvider;
use crate::config::{ContainerSettings, ListenerConfig};
use crate::control_plane::listener_policy::ListenerPolicy;
use crate::data_plane::message_forwarder::MessageForwarder;
use crate::error::{ContainerError, IllegalStateError};
use crate::listener_container::{ListenerContainer, StopOutcome};
use std::sync::Arc;

///
/// [`Endpoint`] is the message-driven source: a [`ListenerContainer`] whose listener is a
/// [`MessageForwarder`] publishing to one output channel.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use jms_source::broker::{BrokerConnection, ConnectionProvider};
/// use jms_source::{
///     ConnectionError, ContainerSettings, Endpoint, ListenerConfig, ListenerDefaults,
///     ListenerPolicy, MessageForwarder, MpscOutputChannel,
/// };
///
/// # struct OfflineBroker;
/// #
/// # #[async_trait]
/// # impl ConnectionProvider for OfflineBroker {
/// #     async fn new_connection(
/// #         &self,
/// #         _client_id: Option<&str>,
/// #     ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
/// #         Err(ConnectionError::Unavailable("broker offline".to_string()))
/// #     }
/// # }
/// #
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let (channel, _envelopes) = MpscOutputChannel::bounded(16);
/// let config = ListenerConfig {
///     session_transacted: true,
///     max_concurrency: Some(4),
///     ..ListenerConfig::for_queue("orders")
/// };
///
/// let mut endpoint = Endpoint::from_config(
///     "orders-source",
///     Arc::new(OfflineBroker),
///     &config,
///     &ListenerPolicy::new(ListenerDefaults::default()),
///     ContainerSettings::default(),
///     MessageForwarder::new(Arc::new(channel)),
/// )
/// .unwrap();
///
/// endpoint.start().await.unwrap();
/// endpoint.stop().await;
/// # });
/// ```
pub struct Endpoint {
    container: ListenerContainer,
    /// The instance registered as the container's listener.
    forwarder: Arc<MessageForwarder>,
}

impl Endpoint {
    /// Registers `forwarder` as the listener of an already configured container.
    pub fn new(
        mut container: ListenerContainer,
        forwarder: MessageForwarder,
    ) -> Result<Self, IllegalStateError> {
        let forwarder = Arc::new(forwarder);
        container.set_message_listener(forwarder.clone())?;
        Ok(Self {
            container,
            forwarder,
        })
    }

    /// Derives the strategy, configures a new container and registers the forwarder.
    pub fn from_config(
        name: &str,
        provider: Arc<dyn ConnectionProvider>,
        config: &ListenerConfig,
        policy: &ListenerPolicy,
        settings: ContainerSettings,
        forwarder: MessageForwarder,
    ) -> Result<Self, ContainerError> {
        let strategy = policy.derive(config)?;
        let mut container = ListenerContainer::new(name, settings);
        container.configure(provider, config, strategy)?;
        Ok(Self::new(container, forwarder)?)
    }

    pub fn name(&self) -> &str {
        self.container.name()
    }

    pub fn container(&self) -> &ListenerContainer {
        &self.container
    }

    pub fn forwarder(&self) -> &MessageForwarder {
        &self.forwarder
    }

    pub async fn start(&mut self) -> Result<(), ContainerError> {
        self.container.start().await
    }

    pub async fn stop(&mut self) -> StopOutcome {
        self.container.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::Endpoint;
    use crate::broker::{BrokerConnection, ConnectionProvider};
    use crate::config::{ContainerSettings, ListenerConfig, ListenerDefaults};
    use crate::control_plane::container_state::ContainerState;
    use crate::control_plane::listener_policy::{ListenerPolicy, ListenerStrategy};
    use crate::data_plane::message_forwarder::MessageForwarder;
    use crate::data_plane::output_channel::MpscOutputChannel;
    use crate::error::{ConfigurationError, ConnectionError, ContainerError};
    use crate::listener_container::ListenerContainer;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct OfflineProvider;

    #[async_trait]
    impl ConnectionProvider for OfflineProvider {
        async fn new_connection(
            &self,
            _client_id: Option<&str>,
        ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
            Err(ConnectionError::Unavailable("broker offline".to_string()))
        }
    }

    fn forwarder() -> MessageForwarder {
        let (channel, _receiver) = MpscOutputChannel::bounded(1);
        MessageForwarder::new(Arc::new(channel))
    }

    #[test]
    fn from_config_wires_derived_strategy() {
        let config = ListenerConfig {
            session_transacted: true,
            concurrency: Some(2),
            max_concurrency: Some(5),
            ..ListenerConfig::for_queue("orders")
        };

        let endpoint = Endpoint::from_config(
            "source",
            Arc::new(OfflineProvider),
            &config,
            &ListenerPolicy::new(ListenerDefaults::default()),
            ContainerSettings::default(),
            forwarder(),
        )
        .expect("valid endpoint");

        assert_eq!(endpoint.name(), "source");
        assert_eq!(endpoint.container().state(), ContainerState::Configured);
        assert_eq!(
            endpoint.container().strategy(),
            Some(ListenerStrategy::Transacted {
                concurrency: 2,
                max_concurrency: Some(5),
                acknowledge_mode: None,
            })
        );
    }

    #[test]
    fn new_takes_name_from_container() {
        let endpoint = Endpoint::new(
            ListenerContainer::new("inventory-source", ContainerSettings::default()),
            forwarder(),
        )
        .expect("listener registered");

        assert_eq!(endpoint.name(), "inventory-source");
        assert_eq!(endpoint.container().state(), ContainerState::Created);
    }

    #[test]
    fn from_config_surfaces_configuration_errors() {
        let config = ListenerConfig {
            subscription_shared: Some(true),
            ..ListenerConfig::for_queue("orders")
        };

        let result = Endpoint::from_config(
            "source",
            Arc::new(OfflineProvider),
            &config,
            &ListenerPolicy::new(ListenerDefaults::default()),
            ContainerSettings::default(),
            forwarder(),
        );

        assert!(matches!(
            result,
            Err(ContainerError::Configuration(
                ConfigurationError::TopicOnlySetting { .. }
            ))
        ));
    }
}
