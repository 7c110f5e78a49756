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
use crate::control_plane::container_state::ContainerState;
use crate::control_plane::destination_binding::DestinationBinding;
use crate::control_plane::listener_policy::ListenerStrategy;
use crate::data_plane::consumer_supervisor::ConsumerSupervisor;
use crate::data_plane::consumer_worker::{open_initial_sessions, WorkerShared};
use crate::data_plane::shared_connection::SharedConnection;
use crate::error::{ContainerError, IllegalStateError};
use crate::listener::MessageListener;
use crate::message::Destination;
use crate::observability::events;
use crate::runtime::scaling::ScalingPolicy;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const COMPONENT: &str = "listener_container";

/// How a call to [`ListenerContainer::stop`] ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopOutcome {
    /// All workers finished their in-flight work within the grace period.
    Drained,
    /// The grace period expired and the remaining workers were aborted.
    Forced,
    /// The container was not running.
    AlreadyStopped,
}

impl Display for StopOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StopOutcome::Drained => "drained",
            StopOutcome::Forced => "forced",
            StopOutcome::AlreadyStopped => "already_stopped",
        };
        f.write_str(label)
    }
}

struct RunningContainer {
    shutdown: watch::Sender<bool>,
    supervisor: JoinHandle<()>,
    connection: Arc<SharedConnection>,
    active: watch::Receiver<usize>,
}

///
/// [`ListenerContainer`] owns the consumer sessions against one destination and delivers each
/// received message to the registered [`MessageListener`].
///
/// The container is configured once with a [`ListenerStrategy`] and can then be started and
/// stopped repeatedly. Transacted containers scale between the strategy's `concurrency` and its
/// consumer ceiling; non-transacted containers keep a fixed number of sessions.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use jms_source::broker::{BrokerConnection, ConnectionProvider};
/// use jms_source::{
///     ConnectionError, ContainerSettings, ContainerState, HandlerError, InboundMessage,
///     ListenerConfig, ListenerContainer, ListenerDefaults, ListenerPolicy, MessageListener,
///     StopOutcome,
/// };
///
/// struct OfflineBroker;
///
/// #[async_trait]
/// impl ConnectionProvider for OfflineBroker {
///     async fn new_connection(
///         &self,
///         _client_id: Option<&str>,
///     ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
///         Err(ConnectionError::Unavailable("broker offline".to_string()))
///     }
/// }
///
/// struct Discard;
///
/// #[async_trait]
/// impl MessageListener for Discard {
///     async fn on_message(&self, _message: &InboundMessage) -> Result<(), HandlerError> {
///         Ok(())
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let config = ListenerConfig::for_queue("orders");
/// let strategy = ListenerPolicy::new(ListenerDefaults::default())
///     .derive(&config)
///     .unwrap();
///
/// let mut container = ListenerContainer::new("orders-source", ContainerSettings::default());
/// container.set_message_listener(Arc::new(Discard)).unwrap();
/// container.configure(Arc::new(OfflineBroker), &config, strategy).unwrap();
///
/// // An unreachable broker does not fail start(); workers keep reconnecting.
/// container.start().await.unwrap();
/// assert_eq!(container.state(), ContainerState::Running);
///
/// assert_eq!(container.stop().await, StopOutcome::Drained);
/// assert_eq!(container.stop().await, StopOutcome::AlreadyStopped);
/// # });
/// ```
pub struct ListenerContainer {
    name: String,
    settings: ContainerSettings,
    state: ContainerState,
    listener: Option<Arc<dyn MessageListener>>,
    binding: Option<DestinationBinding>,
    running: Option<RunningContainer>,
}

impl ListenerContainer {
    pub fn new(name: &str, settings: ContainerSettings) -> Self {
        Self {
            name: name.to_string(),
            settings,
            state: ContainerState::Created,
            listener: None,
            binding: None,
            running: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    /// Strategy applied by the last successful `configure()`.
    pub fn strategy(&self) -> Option<ListenerStrategy> {
        self.binding.as_ref().map(|binding| binding.strategy)
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.binding
            .as_ref()
            .map(|binding| &binding.consumer_spec.destination)
    }

    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }

    /// Number of consumer workers currently owned by the container.
    pub fn active_consumers(&self) -> usize {
        self.running
            .as_ref()
            .map(|running| *running.active.borrow())
            .unwrap_or(0)
    }

    pub fn set_message_listener(
        &mut self,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), IllegalStateError> {
        if !self.state.can_register_listener() {
            return Err(IllegalStateError::InvalidTransition {
                operation: "register a message listener",
                state: self.state,
            });
        }
        self.listener = Some(listener);
        Ok(())
    }

    /// Binds the container to its destination and applies the strategy's bounds.
    ///
    /// May be repeated until the first `start()`; afterwards the binding is frozen.
    pub fn configure(
        &mut self,
        provider: Arc<dyn ConnectionProvider>,
        config: &ListenerConfig,
        strategy: ListenerStrategy,
    ) -> Result<(), ContainerError> {
        if !self.state.can_configure() {
            return Err(IllegalStateError::InvalidTransition {
                operation: "configure",
                state: self.state,
            }
            .into());
        }

        let binding = DestinationBinding::bind(provider, config, strategy)?;

        info!(
            event = events::CONTAINER_CONFIGURED,
            component = COMPONENT,
            container = self.name.as_str(),
            destination = %binding.consumer_spec.destination,
            session_mode = %binding.consumer_spec.session_mode,
            concurrency = strategy.concurrency(),
            ceiling = strategy.consumer_ceiling(),
            selector = binding.consumer_spec.message_selector.as_deref().unwrap_or("none"),
            "listener container configured"
        );

        self.binding = Some(binding);
        self.state = ContainerState::Configured;
        Ok(())
    }

    /// Opens the shared connection and the initial sessions, then hands them to the
    /// supervisor.
    ///
    /// Broker failures do not fail `start()`: they are logged and the workers keep
    /// reconnecting with backoff while the container runs.
    pub async fn start(&mut self) -> Result<(), ContainerError> {
        if !self.state.can_start() {
            warn!(
                event = events::CONTAINER_START_REJECTED,
                component = COMPONENT,
                container = self.name.as_str(),
                state = %self.state,
                "start rejected"
            );
            return Err(IllegalStateError::InvalidTransition {
                operation: "start",
                state: self.state,
            }
            .into());
        }

        let listener = self
            .listener
            .clone()
            .ok_or(IllegalStateError::NoMessageListener)?;
        let binding = self
            .binding
            .clone()
            .ok_or(IllegalStateError::InvalidTransition {
                operation: "start",
                state: self.state,
            })?;
        let strategy = binding.strategy;

        info!(
            event = events::CONTAINER_START,
            component = COMPONENT,
            container = self.name.as_str(),
            destination = %binding.consumer_spec.destination,
            concurrency = strategy.concurrency(),
            "starting listener container"
        );

        let connection = Arc::new(SharedConnection::new(
            &self.name,
            binding.provider.clone(),
            binding.client_id.clone(),
        ));
        let shared = Arc::new(WorkerShared {
            container: self.name.clone(),
            connection: connection.clone(),
            consumer_spec: binding.consumer_spec,
            strategy,
            listener,
            settings: self.settings.clone(),
        });

        let initial = open_initial_sessions(&shared, strategy.concurrency()).await;
        let established = initial.iter().filter(|session| session.is_some()).count();
        let connection_established = connection.is_established().await;

        let policy = ScalingPolicy::new(
            strategy.concurrency(),
            strategy.consumer_ceiling(),
            self.settings.idle_receives_before_retire,
        );
        let (active_tx, active) = watch::channel(0);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let mut supervisor = ConsumerSupervisor::new(shared, policy, active_tx);
        supervisor.spawn_initial(initial);
        let supervisor = tokio::spawn(supervisor.run(shutdown_rx));

        self.running = Some(RunningContainer {
            shutdown,
            supervisor,
            connection,
            active,
        });
        self.state = ContainerState::Running;

        info!(
            event = events::CONTAINER_START_OK,
            component = COMPONENT,
            container = self.name.as_str(),
            connected = connection_established,
            sessions_established = established,
            ceiling = policy.ceiling(),
            elastic = policy.is_elastic(),
            "listener container running"
        );
        Ok(())
    }

    /// Stops all workers, waiting up to the shutdown grace period for in-flight deliveries.
    pub async fn stop(&mut self) -> StopOutcome {
        let Some(mut running) = self.running.take() else {
            debug!(
                event = events::CONTAINER_STOP_NOOP,
                component = COMPONENT,
                container = self.name.as_str(),
                state = %self.state,
                "stop ignored; container not running"
            );
            return StopOutcome::AlreadyStopped;
        };

        self.state = ContainerState::Stopping;
        let grace = self.settings.shutdown_grace();
        info!(
            event = events::CONTAINER_STOP,
            component = COMPONENT,
            container = self.name.as_str(),
            grace_ms = grace.as_millis() as u64,
            "stopping listener container"
        );

        let _ = running.shutdown.send(true);
        let outcome = match tokio::time::timeout(grace, &mut running.supervisor).await {
            Ok(joined) => {
                if let Err(err) = joined {
                    warn!(
                        event = events::CONTAINER_STOP,
                        component = COMPONENT,
                        container = self.name.as_str(),
                        err = %err,
                        "consumer supervisor ended abnormally"
                    );
                }
                StopOutcome::Drained
            }
            Err(_) => {
                warn!(
                    event = events::CONTAINER_STOP_TIMEOUT,
                    component = COMPONENT,
                    container = self.name.as_str(),
                    grace_ms = grace.as_millis() as u64,
                    "shutdown grace period expired; aborting remaining consumers"
                );
                // Dropping the supervisor's JoinSet aborts every worker it still owns.
                running.supervisor.abort();
                let _ = running.supervisor.await;
                StopOutcome::Forced
            }
        };

        running.connection.close().await;
        self.state = ContainerState::Stopped;

        info!(
            event = events::CONTAINER_STOP_OK,
            component = COMPONENT,
            container = self.name.as_str(),
            outcome = %outcome,
            "listener container stopped"
        );
        outcome
    }
}

impl Drop for ListenerContainer {
    fn drop(&mut self) {
        // The supervisor drains its workers and closes the shared connection on its own.
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ListenerContainer, StopOutcome};
    use crate::broker::{BrokerConnection, ConnectionProvider};
    use crate::config::{ContainerSettings, ListenerConfig};
    use crate::control_plane::container_state::ContainerState;
    use crate::control_plane::listener_policy::ListenerStrategy;
    use crate::error::{
        ConfigurationError, ConnectionError, ContainerError, HandlerError, IllegalStateError,
    };
    use crate::listener::MessageListener;
    use crate::message::InboundMessage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct OfflineProvider {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionProvider for OfflineProvider {
        async fn new_connection(
            &self,
            _client_id: Option<&str>,
        ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(ConnectionError::Unavailable("broker offline".to_string()))
        }
    }

    struct NoopListener;

    #[async_trait]
    impl MessageListener for NoopListener {
        async fn on_message(&self, _message: &InboundMessage) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn strategy(concurrency: u32) -> ListenerStrategy {
        ListenerStrategy::NonTransacted {
            concurrency,
            acknowledge_mode: None,
        }
    }

    fn configured_container() -> ListenerContainer {
        let mut container = ListenerContainer::new("unit", ContainerSettings::default());
        container
            .set_message_listener(Arc::new(NoopListener))
            .expect("listener accepted");
        container
            .configure(
                Arc::new(OfflineProvider::default()),
                &ListenerConfig::for_queue("orders"),
                strategy(2),
            )
            .expect("configuration accepted");
        container
    }

    #[tokio::test]
    async fn start_requires_configuration() {
        let mut container = ListenerContainer::new("unit", ContainerSettings::default());
        container
            .set_message_listener(Arc::new(NoopListener))
            .expect("listener accepted");

        let result = container.start().await;

        assert_eq!(
            result,
            Err(ContainerError::IllegalState(
                IllegalStateError::InvalidTransition {
                    operation: "start",
                    state: ContainerState::Created,
                }
            ))
        );
    }

    #[tokio::test]
    async fn start_requires_listener() {
        let mut container = ListenerContainer::new("unit", ContainerSettings::default());
        container
            .configure(
                Arc::new(OfflineProvider::default()),
                &ListenerConfig::for_queue("orders"),
                strategy(1),
            )
            .expect("configuration accepted");

        let result = container.start().await;

        assert_eq!(
            result,
            Err(ContainerError::IllegalState(
                IllegalStateError::NoMessageListener
            ))
        );
        assert_eq!(container.state(), ContainerState::Configured);
    }

    #[test]
    fn configure_is_repeatable_before_start() {
        let mut container = configured_container();

        container
            .configure(
                Arc::new(OfflineProvider::default()),
                &ListenerConfig::for_topic("prices"),
                strategy(1),
            )
            .expect("reconfiguration accepted");

        assert_eq!(container.state(), ContainerState::Configured);
        assert_eq!(
            container.destination().map(|destination| destination.name()),
            Some("prices")
        );
        assert_eq!(container.strategy().map(|s| s.concurrency()), Some(1));
    }

    #[test]
    fn configure_revalidates_subscription_settings() {
        let mut container = ListenerContainer::new("unit", ContainerSettings::default());
        let config = ListenerConfig {
            subscription_durable: Some(true),
            subscription_name: Some("audit".to_string()),
            ..ListenerConfig::for_queue("orders")
        };

        let result =
            container.configure(Arc::new(OfflineProvider::default()), &config, strategy(1));

        assert!(matches!(
            result,
            Err(ContainerError::Configuration(
                ConfigurationError::TopicOnlySetting { .. }
            ))
        ));
        assert_eq!(container.state(), ContainerState::Created);
    }

    #[tokio::test]
    async fn unreachable_broker_does_not_fail_start() {
        let mut container = configured_container();

        container.start().await.expect("start succeeds");

        assert!(container.is_running());
        assert_eq!(container.active_consumers(), 2);
        assert_eq!(container.stop().await, StopOutcome::Drained);
        assert_eq!(container.active_consumers(), 0);
    }

    #[tokio::test]
    async fn lifecycle_rejects_misuse_while_running() {
        let mut container = configured_container();
        container.start().await.expect("start succeeds");

        assert!(matches!(
            container.start().await,
            Err(ContainerError::IllegalState(
                IllegalStateError::InvalidTransition {
                    state: ContainerState::Running,
                    ..
                }
            ))
        ));
        assert!(container.set_message_listener(Arc::new(NoopListener)).is_err());

        container.stop().await;

        assert_eq!(container.state(), ContainerState::Stopped);
        assert!(container
            .configure(
                Arc::new(OfflineProvider::default()),
                &ListenerConfig::for_queue("orders"),
                strategy(1),
            )
            .is_err());
        assert!(container.set_message_listener(Arc::new(NoopListener)).is_ok());
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_restart_is_allowed() {
        let mut container = configured_container();

        assert_eq!(container.stop().await, StopOutcome::AlreadyStopped);

        container.start().await.expect("first start");
        assert_eq!(container.stop().await, StopOutcome::Drained);
        assert_eq!(container.stop().await, StopOutcome::AlreadyStopped);

        container.start().await.expect("restart");
        assert_eq!(container.active_consumers(), 2);
        assert_eq!(container.stop().await, StopOutcome::Drained);
    }
}
