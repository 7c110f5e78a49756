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

use crate::error::HandlerError;
use crate::message::InboundMessage;
use async_trait::async_trait;

/// Delivery callback registered on a [`ListenerContainer`][crate::ListenerContainer].
///
/// Invoked concurrently from every active consumer worker. Returning an error makes the
/// container roll back (transacted) or recover (client acknowledgement) the delivery.
#[async_trait]
pub trait MessageListener: Send + Sync {
    async fn on_message(&self, message: &InboundMessage) -> Result<(), HandlerError>;
}
