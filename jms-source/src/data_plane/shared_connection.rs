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

//! One broker connection shared by all consumer sessions of a container.

use crate::broker::{BrokerConnection, ConnectionProvider};
use crate::error::ConnectionError;
use crate::observability::events;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

const COMPONENT: &str = "shared_connection";

/// Lazily established connection, replaced after a failure is reported.
///
/// Connection attempts are serialized: workers racing to reconnect wait on the lock and
/// then reuse whatever connection the winner established.
pub(crate) struct SharedConnection {
    container: String,
    provider: Arc<dyn ConnectionProvider>,
    client_id: Option<String>,
    current: Mutex<Option<Arc<dyn BrokerConnection>>>,
}

impl SharedConnection {
    pub(crate) fn new(
        container: &str,
        provider: Arc<dyn ConnectionProvider>,
        client_id: Option<String>,
    ) -> Self {
        Self {
            container: container.to_string(),
            provider,
            client_id,
            current: Mutex::new(None),
        }
    }

    pub(crate) async fn get_or_connect(
        &self,
    ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
        let mut current = self.current.lock().await;
        if let Some(connection) = current.as_ref() {
            return Ok(connection.clone());
        }

        match self.provider.new_connection(self.client_id.as_deref()).await {
            Ok(connection) => {
                info!(
                    event = events::CONNECTION_ESTABLISHED,
                    component = COMPONENT,
                    container = self.container.as_str(),
                    client_id = self.client_id.as_deref().unwrap_or("none"),
                    "broker connection established"
                );
                *current = Some(connection.clone());
                Ok(connection)
            }
            Err(err) => {
                warn!(
                    event = events::CONNECTION_FAILED,
                    component = COMPONENT,
                    container = self.container.as_str(),
                    err = %err,
                    "broker connection attempt failed"
                );
                Err(err)
            }
        }
    }

    /// Drops `failed` if it is still the current connection.
    ///
    /// A stale handle from before an earlier refresh leaves the newer connection alone.
    pub(crate) async fn invalidate(&self, failed: &Arc<dyn BrokerConnection>) {
        let stale = {
            let mut current = self.current.lock().await;
            match current.as_ref() {
                Some(connection) if Arc::ptr_eq(connection, failed) => current.take(),
                _ => None,
            }
        };

        if let Some(stale) = stale {
            stale.close().await;
            info!(
                event = events::CONNECTION_INVALIDATED,
                component = COMPONENT,
                container = self.container.as_str(),
                "broker connection invalidated; next session open reconnects"
            );
        }
    }

    pub(crate) async fn is_established(&self) -> bool {
        self.current.lock().await.is_some()
    }

    pub(crate) async fn close(&self) {
        let current = self.current.lock().await.take();
        if let Some(connection) = current {
            connection.close().await;
            info!(
                event = events::CONNECTION_CLOSED,
                component = COMPONENT,
                container = self.container.as_str(),
                "broker connection closed"
            );
        }
    }
}
