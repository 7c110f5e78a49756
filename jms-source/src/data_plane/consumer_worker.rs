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

//! Consumer worker: one broker session, one receive loop, one message in flight.

use crate::broker::{BrokerConnection, BrokerSession, ConsumerSpec, SessionMode};
use crate::config::ContainerSettings;
use crate::control_plane::listener_policy::ListenerStrategy;
use crate::data_plane::shared_connection::SharedConnection;
use crate::error::{ConnectionError, HandlerError};
use crate::listener::MessageListener;
use crate::message::InboundMessage;
use crate::observability::{
    events,
    fields::{self, WorkerContext},
};
use crate::runtime::reconnect_backoff::ReconnectBackoff;
use futures::FutureExt;
use std::any::Any;
use std::fmt::{Display, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "consumer_worker";

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct WorkerId(pub(crate) u64);

impl Display for WorkerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

/// What a worker observed on its last receive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum WorkerEvent {
    Received,
    Idle,
}

/// How a dispatched delivery left the session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Settlement {
    /// Committed, acknowledged, or consumed on delivery.
    Settled,
    /// Rolled back or recovered; the broker will deliver it again.
    Returned,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct WorkerReport {
    pub(crate) worker_id: WorkerId,
    pub(crate) event: WorkerEvent,
}

/// Inputs shared by every worker of one container run.
pub(crate) struct WorkerShared {
    pub(crate) container: String,
    pub(crate) connection: Arc<SharedConnection>,
    pub(crate) consumer_spec: ConsumerSpec,
    pub(crate) strategy: ListenerStrategy,
    pub(crate) listener: Arc<dyn MessageListener>,
    pub(crate) settings: ContainerSettings,
}

/// An open session together with the connection it was opened on.
pub(crate) struct ConsumerSession {
    connection: Arc<dyn BrokerConnection>,
    session: Box<dyn BrokerSession>,
}

impl ConsumerSession {
    pub(crate) async fn open(shared: &WorkerShared) -> Result<Self, ConnectionError> {
        let connection = shared.connection.get_or_connect().await?;
        match connection.open_session(&shared.consumer_spec).await {
            Ok(session) => Ok(Self {
                connection,
                session,
            }),
            Err(err) => {
                if err.is_connection_failure() {
                    shared.connection.invalidate(&connection).await;
                }
                Err(err)
            }
        }
    }
}

/// Opens the initial sessions up front so `start()` returns with them in place.
///
/// After a connection failure the remaining slots are left empty; their workers keep
/// retrying with backoff once running.
pub(crate) async fn open_initial_sessions(
    shared: &WorkerShared,
    count: u32,
) -> Vec<Option<ConsumerSession>> {
    let mut sessions = Vec::with_capacity(count as usize);
    let mut broker_down = false;

    for _ in 0..count {
        if broker_down {
            sessions.push(None);
            continue;
        }
        match ConsumerSession::open(shared).await {
            Ok(session) => sessions.push(Some(session)),
            Err(err) => {
                warn!(
                    event = events::SESSION_OPEN_FAILED,
                    component = COMPONENT,
                    container = shared.container.as_str(),
                    err = %err,
                    "initial session open failed; consumer will retry in background"
                );
                broker_down = err.is_connection_failure();
                sessions.push(None);
            }
        }
    }

    sessions
}

/// Resolves once stop is requested or the stop sender is gone.
pub(crate) async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

pub(crate) struct ConsumerWorker {
    id: WorkerId,
    shared: Arc<WorkerShared>,
    context: WorkerContext,
    reports: mpsc::Sender<WorkerReport>,
    stop: watch::Receiver<bool>,
}

impl ConsumerWorker {
    pub(crate) fn new(
        id: WorkerId,
        shared: Arc<WorkerShared>,
        reports: mpsc::Sender<WorkerReport>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        let context = WorkerContext::new(shared.container.as_str(), id.to_string());
        Self {
            id,
            shared,
            context,
            reports,
            stop,
        }
    }

    /// Receive loop; returns the worker id once stop is observed.
    ///
    /// Stop interrupts a pending receive or backoff wait but never a listener invocation:
    /// the in-flight message is settled before the loop exits.
    pub(crate) async fn run(mut self, initial: Option<ConsumerSession>) -> WorkerId {
        let mut session = initial;
        let mut backoff = ReconnectBackoff::from_settings(&self.shared.settings);
        let receive_timeout = self.shared.settings.receive_timeout();

        while !*self.stop.borrow() {
            let Some(active) = session.as_mut() else {
                match ConsumerSession::open(&self.shared).await {
                    Ok(opened) => {
                        debug!(
                            event = events::SESSION_OPEN_OK,
                            component = COMPONENT,
                            container = self.context.container.as_str(),
                            worker_id = self.context.worker_id.as_str(),
                            attempts = backoff.attempts(),
                            "consumer session opened"
                        );
                        backoff.reset();
                        session = Some(opened);
                    }
                    Err(err) => {
                        let delay = backoff.next_delay();
                        warn!(
                            event = events::SESSION_OPEN_FAILED,
                            component = COMPONENT,
                            container = self.context.container.as_str(),
                            worker_id = self.context.worker_id.as_str(),
                            delay_ms = delay.as_millis() as u64,
                            err = %err,
                            "consumer session open failed; retrying"
                        );
                        if self.sleep_or_stop(delay).await {
                            break;
                        }
                    }
                }
                continue;
            };

            let received = tokio::select! {
                biased;
                _ = wait_for_stop(&mut self.stop) => break,
                received = active.session.receive(receive_timeout) => received,
            };

            let failure = match received {
                Ok(Some(message)) => {
                    self.report(WorkerEvent::Received);
                    match self.dispatch(active, message).await {
                        Ok(Settlement::Settled) => {
                            backoff.reset();
                            None
                        }
                        Ok(Settlement::Returned) => {
                            // Keeps a permanently failing listener from spinning on the
                            // same redelivered message.
                            let delay = backoff.next_delay();
                            debug!(
                                event = events::REDELIVERY_BACKOFF,
                                component = COMPONENT,
                                container = self.context.container.as_str(),
                                worker_id = self.context.worker_id.as_str(),
                                delay_ms = delay.as_millis() as u64,
                                "delaying receive after returned delivery"
                            );
                            if self.sleep_or_stop(delay).await {
                                break;
                            }
                            None
                        }
                        Err(err) => Some(err),
                    }
                }
                Ok(None) => {
                    self.report(WorkerEvent::Idle);
                    None
                }
                Err(err) => Some(err),
            };

            if let Some(err) = failure {
                if let Some(failed) = session.take() {
                    self.discard_session(failed, &err).await;
                }
                let delay = backoff.next_delay();
                info!(
                    event = events::SESSION_RECOVERY_SCHEDULED,
                    component = COMPONENT,
                    container = self.context.container.as_str(),
                    worker_id = self.context.worker_id.as_str(),
                    delay_ms = delay.as_millis() as u64,
                    "consumer session recovery scheduled"
                );
                if self.sleep_or_stop(delay).await {
                    break;
                }
            }
        }

        if let Some(mut remaining) = session {
            remaining.session.close().await;
            debug!(
                event = events::SESSION_CLOSED,
                component = COMPONENT,
                container = self.context.container.as_str(),
                worker_id = self.context.worker_id.as_str(),
                reason = fields::REASON_SHUTDOWN,
                "consumer session closed"
            );
        }

        self.id
    }

    /// Invokes the listener and settles the delivery according to the session mode.
    ///
    /// Returns an error only when the session itself failed while settling.
    async fn dispatch(
        &self,
        active: &mut ConsumerSession,
        message: InboundMessage,
    ) -> Result<Settlement, ConnectionError> {
        let msg_id = fields::format_message_id(&message);

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::DELIVERY_RECEIVED,
                component = COMPONENT,
                container = self.context.container.as_str(),
                worker_id = self.context.worker_id.as_str(),
                msg_id = msg_id.as_str(),
                correlation_id = fields::format_correlation_id(&message).as_str(),
                destination = fields::format_message_destination(&message).as_str(),
                redelivered = message.redelivered,
                body_kind = message.body.kind(),
                "message received"
            );
        }

        let outcome = match AssertUnwindSafe(self.shared.listener.on_message(&message))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(HandlerError::Panicked(panic_message(panic.as_ref()))),
        };

        if let Err(err) = &outcome {
            warn!(
                event = events::LISTENER_FAILED,
                component = COMPONENT,
                container = self.context.container.as_str(),
                worker_id = self.context.worker_id.as_str(),
                msg_id = msg_id.as_str(),
                err = %err,
                "listener failed"
            );
        }

        let settlement = match self.shared.strategy.session_mode() {
            SessionMode::Transacted => {
                if outcome.is_ok() {
                    active.session.commit().await?;
                    debug!(
                        event = events::DELIVERY_COMMITTED,
                        component = COMPONENT,
                        container = self.context.container.as_str(),
                        worker_id = self.context.worker_id.as_str(),
                        msg_id = msg_id.as_str(),
                        "delivery committed"
                    );
                    Settlement::Settled
                } else {
                    active.session.rollback().await?;
                    info!(
                        event = events::DELIVERY_ROLLED_BACK,
                        component = COMPONENT,
                        container = self.context.container.as_str(),
                        worker_id = self.context.worker_id.as_str(),
                        msg_id = msg_id.as_str(),
                        "delivery rolled back for redelivery"
                    );
                    Settlement::Returned
                }
            }
            SessionMode::Acknowledge(mode) if mode.requires_explicit_ack() => {
                if outcome.is_ok() {
                    active.session.acknowledge(&message).await?;
                    debug!(
                        event = events::DELIVERY_ACKNOWLEDGED,
                        component = COMPONENT,
                        container = self.context.container.as_str(),
                        worker_id = self.context.worker_id.as_str(),
                        msg_id = msg_id.as_str(),
                        ack_mode = %mode,
                        "delivery acknowledged"
                    );
                    Settlement::Settled
                } else {
                    active.session.recover().await?;
                    info!(
                        event = events::DELIVERY_RECOVERED,
                        component = COMPONENT,
                        container = self.context.container.as_str(),
                        worker_id = self.context.worker_id.as_str(),
                        msg_id = msg_id.as_str(),
                        ack_mode = %mode,
                        "session recovered for redelivery"
                    );
                    Settlement::Returned
                }
            }
            SessionMode::Acknowledge(mode) => {
                if outcome.is_err() {
                    warn!(
                        event = events::DELIVERY_LOST,
                        component = COMPONENT,
                        container = self.context.container.as_str(),
                        worker_id = self.context.worker_id.as_str(),
                        msg_id = msg_id.as_str(),
                        ack_mode = %mode,
                        reason = fields::REASON_AUTO_ACKNOWLEDGED,
                        "message consumed on delivery; failure cannot trigger redelivery"
                    );
                }
                Settlement::Settled
            }
        };

        Ok(settlement)
    }

    async fn discard_session(&self, mut failed: ConsumerSession, err: &ConnectionError) {
        warn!(
            event = events::SESSION_FAILED,
            component = COMPONENT,
            container = self.context.container.as_str(),
            worker_id = self.context.worker_id.as_str(),
            reason = fields::REASON_SESSION_FAILURE,
            err = %err,
            "consumer session failed"
        );
        failed.session.close().await;
        if err.is_connection_failure() {
            self.shared.connection.invalidate(&failed.connection).await;
        }
    }

    /// Returns `true` when stop was requested during the wait.
    async fn sleep_or_stop(&mut self, delay: Duration) -> bool {
        tokio::select! {
            _ = wait_for_stop(&mut self.stop) => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    fn report(&self, event: WorkerEvent) {
        // A full queue only postpones a scaling decision.
        let _ = self.reports.try_send(WorkerReport {
            worker_id: self.id,
            event,
        });
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
