//! Destination/subscription binding applied by `ListenerContainer::configure`.

use crate::broker::{ConnectionProvider, ConsumerSpec, SubscriptionSpec};
use crate::config::ListenerConfig;
use crate::control_plane::listener_policy::{
    validate_destination, validate_subscription_concurrency, ListenerStrategy,
};
use crate::error::ConfigurationError;
use crate::message::Destination;
use std::sync::Arc;

/// Everything the container needs to (re)establish its consumer sessions.
#[derive(Clone)]
pub(crate) struct DestinationBinding {
    pub(crate) provider: Arc<dyn ConnectionProvider>,
    pub(crate) client_id: Option<String>,
    pub(crate) consumer_spec: ConsumerSpec,
    pub(crate) strategy: ListenerStrategy,
}

impl DestinationBinding {
    pub(crate) fn bind(
        provider: Arc<dyn ConnectionProvider>,
        config: &ListenerConfig,
        strategy: ListenerStrategy,
    ) -> Result<Self, ConfigurationError> {
        validate_destination(config)?;
        validate_subscription_concurrency(config, &strategy)?;

        let destination = if config.is_topic {
            Destination::Topic(config.destination_name.clone())
        } else {
            Destination::Queue(config.destination_name.clone())
        };

        // Subscription attributes only make sense on the pub/sub domain.
        let subscription = config.is_topic.then(|| SubscriptionSpec {
            name: config.subscription_name.clone(),
            durable: config.is_durable(),
            shared: config.is_shared(),
        });

        Ok(Self {
            provider,
            client_id: config.client_id.clone(),
            consumer_spec: ConsumerSpec {
                destination,
                message_selector: config.effective_selector().map(str::to_string),
                subscription,
                session_mode: strategy.session_mode(),
            },
            strategy,
        })
    }
}
