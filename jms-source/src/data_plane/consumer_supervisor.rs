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

//! Supervisor task owning the consumer workers of one running container.

use crate::data_plane::consumer_worker::{
    panic_message, wait_for_stop, ConsumerSession, ConsumerWorker, WorkerEvent, WorkerId,
    WorkerReport, WorkerShared,
};
use crate::observability::{events, fields};
use crate::runtime::scaling::{ScalingDecision, ScalingPolicy};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "consumer_supervisor";

struct WorkerSlot {
    stop: watch::Sender<bool>,
    busy: bool,
    consecutive_idle: u32,
}

/// Keeps the number of workers between the scaling floor and ceiling.
///
/// Workers report every receive outcome; the supervisor is the only place that spawns or
/// retires them, so the active count never exceeds the ceiling.
pub(crate) struct ConsumerSupervisor {
    shared: Arc<WorkerShared>,
    policy: ScalingPolicy,
    slots: HashMap<WorkerId, WorkerSlot>,
    tasks: JoinSet<WorkerId>,
    reports_tx: mpsc::Sender<WorkerReport>,
    reports_rx: mpsc::Receiver<WorkerReport>,
    active: watch::Sender<usize>,
    next_id: u64,
}

impl ConsumerSupervisor {
    pub(crate) fn new(
        shared: Arc<WorkerShared>,
        policy: ScalingPolicy,
        active: watch::Sender<usize>,
    ) -> Self {
        let (reports_tx, reports_rx) = mpsc::channel(shared.settings.report_queue_size.max(1));
        Self {
            shared,
            policy,
            slots: HashMap::new(),
            tasks: JoinSet::new(),
            reports_tx,
            reports_rx,
            active,
            next_id: 0,
        }
    }

    /// Spawns one worker per initial session slot; empty slots open their session lazily.
    pub(crate) fn spawn_initial(&mut self, sessions: Vec<Option<ConsumerSession>>) {
        for session in sessions {
            self.spawn_worker(session);
        }
    }

    pub(crate) async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = wait_for_stop(&mut shutdown) => break,
                Some(report) = self.reports_rx.recv() => self.on_report(report),
                Some(joined) = self.tasks.join_next() => self.on_worker_exit(joined),
            }
        }

        self.drain().await;
    }

    fn spawn_worker(&mut self, session: Option<ConsumerSession>) {
        let id = WorkerId(self.next_id);
        self.next_id += 1;

        let (stop, stop_rx) = watch::channel(false);
        let worker = ConsumerWorker::new(id, self.shared.clone(), self.reports_tx.clone(), stop_rx);
        let container = self.shared.container.clone();

        self.tasks.spawn(async move {
            if let Err(panic) = AssertUnwindSafe(worker.run(session)).catch_unwind().await {
                let reason = panic_message(panic.as_ref());
                error!(
                    event = events::CONSUMER_EXIT,
                    component = COMPONENT,
                    container = container.as_str(),
                    worker_id = %id,
                    reason = reason.as_str(),
                    "consumer worker panicked"
                );
            }
            id
        });

        self.slots.insert(
            id,
            WorkerSlot {
                stop,
                busy: false,
                consecutive_idle: 0,
            },
        );
        self.publish_active();

        debug!(
            event = events::CONSUMER_SPAWN,
            component = COMPONENT,
            container = self.shared.container.as_str(),
            worker_id = %id,
            active = self.slots.len(),
            "consumer worker spawned"
        );
    }

    fn on_report(&mut self, report: WorkerReport) {
        let active = self.slots.len();
        // Reports from workers already retired are stale.
        let Some(slot) = self.slots.get_mut(&report.worker_id) else {
            return;
        };

        match report.event {
            WorkerEvent::Received => {
                slot.busy = true;
                slot.consecutive_idle = 0;
                let waiting = self.slots.values().filter(|slot| !slot.busy).count();
                if self.policy.after_delivery(active, waiting) == ScalingDecision::ScaleUp {
                    self.spawn_worker(None);
                }
            }
            WorkerEvent::Idle => {
                slot.busy = false;
                slot.consecutive_idle = slot.consecutive_idle.saturating_add(1);
                let consecutive_idle = slot.consecutive_idle;
                if self.policy.after_idle(active, consecutive_idle) == ScalingDecision::Retire {
                    self.retire(report.worker_id);
                }
            }
        }
    }

    fn retire(&mut self, id: WorkerId) {
        if let Some(slot) = self.slots.remove(&id) {
            let _ = slot.stop.send(true);
            self.publish_active();
            debug!(
                event = events::CONSUMER_RETIRE,
                component = COMPONENT,
                container = self.shared.container.as_str(),
                worker_id = %id,
                reason = fields::REASON_IDLE,
                active = self.slots.len(),
                "idle consumer worker retired"
            );
        }
    }

    fn on_worker_exit(&mut self, joined: Result<WorkerId, JoinError>) {
        let id = match joined {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    event = events::CONSUMER_EXIT,
                    component = COMPONENT,
                    container = self.shared.container.as_str(),
                    err = %err,
                    "consumer worker task aborted"
                );
                return;
            }
        };

        // Retired workers were removed already; anything still registered exited on its own.
        if self.slots.remove(&id).is_none() {
            return;
        }
        warn!(
            event = events::CONSUMER_EXIT,
            component = COMPONENT,
            container = self.shared.container.as_str(),
            worker_id = %id,
            active = self.slots.len(),
            "consumer worker exited unexpectedly"
        );
        self.publish_active();

        if self.slots.len() < self.policy.floor() {
            info!(
                event = events::CONSUMER_RESPAWN,
                component = COMPONENT,
                container = self.shared.container.as_str(),
                active = self.slots.len(),
                floor = self.policy.floor(),
                "respawning consumer worker below floor"
            );
            self.spawn_worker(None);
        }
    }

    async fn drain(mut self) {
        info!(
            event = events::SUPERVISOR_DRAIN_START,
            component = COMPONENT,
            container = self.shared.container.as_str(),
            active = self.slots.len(),
            "stopping consumer workers"
        );

        for slot in self.slots.values() {
            let _ = slot.stop.send(true);
        }
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                warn!(
                    event = events::CONSUMER_EXIT,
                    component = COMPONENT,
                    container = self.shared.container.as_str(),
                    err = %err,
                    "consumer worker task failed during drain"
                );
            }
        }
        self.slots.clear();
        self.publish_active();
        // Releases the broker connection and its client id even when the container was
        // dropped without stop().
        self.shared.connection.close().await;

        info!(
            event = events::SUPERVISOR_DRAIN_OK,
            component = COMPONENT,
            container = self.shared.container.as_str(),
            "all consumer workers stopped"
        );
    }

    fn publish_active(&self) {
        self.active.send_replace(self.slots.len());
    }
}

#[cfg(test)]
mod tests {
    use super::ConsumerSupervisor;
    use crate::broker::{BrokerConnection, BrokerSession, ConnectionProvider, ConsumerSpec};
    use crate::config::ContainerSettings;
    use crate::control_plane::listener_policy::ListenerStrategy;
    use crate::data_plane::consumer_worker::WorkerShared;
    use crate::data_plane::shared_connection::SharedConnection;
    use crate::error::{ConnectionError, HandlerError};
    use crate::listener::MessageListener;
    use crate::message::{Destination, InboundMessage};
    use crate::runtime::scaling::ScalingPolicy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Hands out an endless supply of messages to every session.
    struct FloodSession {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrokerSession for FloodSession {
        async fn receive(
            &mut self,
            _timeout: Duration,
        ) -> Result<Option<InboundMessage>, ConnectionError> {
            tokio::task::yield_now().await;
            Ok(Some(InboundMessage::text("work")))
        }

        async fn acknowledge(&mut self, _message: &InboundMessage) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn recover(&mut self) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FloodBroker {
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrokerConnection for FloodBroker {
        async fn open_session(
            &self,
            _spec: &ConsumerSpec,
        ) -> Result<Box<dyn BrokerSession>, ConnectionError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FloodSession {
                closed: self.closed.clone(),
            }))
        }

        async fn close(&self) {}
    }

    #[async_trait]
    impl ConnectionProvider for FloodBroker {
        async fn new_connection(
            &self,
            _client_id: Option<&str>,
        ) -> Result<Arc<dyn BrokerConnection>, ConnectionError> {
            Ok(Arc::new(FloodBroker {
                opened: self.opened.clone(),
                closed: self.closed.clone(),
            }))
        }
    }

    struct SlowListener;

    #[async_trait]
    impl MessageListener for SlowListener {
        async fn on_message(&self, _message: &InboundMessage) -> Result<(), HandlerError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(())
        }
    }

    fn shared(opened: Arc<AtomicUsize>, closed: Arc<AtomicUsize>) -> Arc<WorkerShared> {
        let strategy = ListenerStrategy::Transacted {
            concurrency: 1,
            max_concurrency: Some(3),
            acknowledge_mode: None,
        };
        Arc::new(WorkerShared {
            container: "supervisor-test".to_string(),
            connection: Arc::new(SharedConnection::new(
                "supervisor-test",
                Arc::new(FloodBroker { opened, closed }),
                None,
            )),
            consumer_spec: ConsumerSpec {
                destination: Destination::Queue("work".to_string()),
                message_selector: None,
                subscription: None,
                session_mode: strategy.session_mode(),
            },
            strategy,
            listener: Arc::new(SlowListener),
            settings: ContainerSettings::default(),
        })
    }

    #[tokio::test]
    async fn backlog_scales_up_to_ceiling_and_drains_on_shutdown() {
        let opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let (active_tx, mut active) = watch::channel(0);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut supervisor = ConsumerSupervisor::new(
            shared(opened.clone(), closed.clone()),
            ScalingPolicy::new(1, 3, 1),
            active_tx,
        );
        supervisor.spawn_initial(vec![None]);
        let task = tokio::spawn(supervisor.run(shutdown_rx));

        tokio::time::timeout(Duration::from_secs(5), active.wait_for(|count| *count == 3))
            .await
            .expect("scaled up in time")
            .expect("supervisor alive");

        shutdown_tx.send(true).expect("supervisor listening");
        task.await.expect("supervisor exits");

        assert_eq!(*active.borrow(), 0);
        // A worker spawned just before shutdown may never have opened its session.
        assert!(opened.load(Ordering::SeqCst) >= 2);
        assert_eq!(closed.load(Ordering::SeqCst), opened.load(Ordering::SeqCst));
    }
}
