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

//! Matches asynchronous notifications of one kind to the send they describe.

use crate::config::CorrelationConfig;
use crate::correlation::sweeper::SweeperHandle;
use crate::correlation::table::{AwaitError, CorrelationTable, DeliveryOutcome};
use crate::error::{GatewayError, Result};
use crate::model::{Notification, NotificationKind};
use crate::observability::{events, fields};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;
use tracing::{debug, trace, warn};

const COMPONENT: &str = "notification_correlator";

/// Push consumer of notifications. Receives every notification that no
/// blocking waiter claimed at the time of delivery.
#[async_trait]
pub trait NotificationListener: Send + Sync {
    async fn on_notification(&self, notification: Notification);
}

/// Correlation engine for a single [`NotificationKind`], keyed by the
/// identifier of the message the notification refers to.
pub struct NotificationCorrelator {
    kind: NotificationKind,
    table: Arc<CorrelationTable<String, Notification>>,
    listener: OnceLock<Arc<dyn NotificationListener>>,
    sweeper: Mutex<Option<SweeperHandle>>,
}

impl NotificationCorrelator {
    /// Creates the engine and starts its sweep thread.
    pub fn new(kind: NotificationKind, config: &CorrelationConfig) -> Result<Self> {
        let table = Arc::new(CorrelationTable::with_expiry(
            kind.to_string(),
            config.ttl(),
            |notification: &Notification, ttl| notification.is_older_than(Utc::now(), ttl),
        ));
        let sweeper = SweeperHandle::spawn(&table, config.sweep_period()).map_err(|err| {
            GatewayError::configuration(format!("unable to start {kind} sweeper: {err}"))
        })?;

        Ok(Self {
            kind,
            table,
            listener: OnceLock::new(),
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    /// Installs the push consumer. Only one listener may be registered.
    pub fn register_listener(&self, listener: Arc<dyn NotificationListener>) -> Result<()> {
        self.listener.set(listener).map_err(|_| {
            GatewayError::configuration(format!(
                "a {} notification callback is already registered",
                self.kind
            ))
        })
    }

    /// Hands `notification` to blocked waiters, else to the registered
    /// listener, else parks it until it is claimed or swept.
    pub async fn deliver(&self, notification: Notification) -> Result<()> {
        if notification.kind() != self.kind {
            return Err(GatewayError::invalid_argument(format!(
                "{} notification delivered to {} correlator",
                notification.kind(),
                self.kind
            )));
        }

        let key = notification.ref_to_message_id().to_string();
        let notification = match self.table.try_complete(&key, notification) {
            Ok(woken) => {
                debug!(
                    event = events::CORRELATION_DELIVERED,
                    component = COMPONENT,
                    kind = %self.kind,
                    ref_to_msg_id = %key,
                    woken,
                    "woke waiters"
                );
                return Ok(());
            }
            Err(notification) => notification,
        };

        if let Some(listener) = self.listener.get() {
            debug!(
                event = events::CORRELATION_CALLBACK,
                component = COMPONENT,
                notification = %fields::format_notification(&notification),
                "handing notification to callback"
            );
            listener.on_notification(notification).await;
            return Ok(());
        }

        match self.table.deliver(key.clone(), notification) {
            DeliveryOutcome::Woken(woken) => {
                debug!(
                    event = events::CORRELATION_DELIVERED,
                    component = COMPONENT,
                    kind = %self.kind,
                    ref_to_msg_id = %key,
                    woken,
                    "woke waiters"
                );
            }
            DeliveryOutcome::Stored | DeliveryOutcome::StoredLate => {
                trace!(
                    event = events::CORRELATION_STORED,
                    component = COMPONENT,
                    kind = %self.kind,
                    ref_to_msg_id = %key,
                    "no waiter yet, notification parked"
                );
            }
            DeliveryOutcome::Replaced => {
                warn!(
                    event = events::CORRELATION_STORED,
                    component = COMPONENT,
                    kind = %self.kind,
                    ref_to_msg_id = %key,
                    "unclaimed notification replaced by a newer one"
                );
            }
        }
        Ok(())
    }

    /// Waits up to `timeout` for the notification answering `ref_to_message_id`.
    /// A zero `timeout` waits without bound.
    pub async fn await_notification(
        &self,
        ref_to_message_id: &str,
        timeout: Duration,
    ) -> Result<Notification> {
        match self
            .table
            .wait_for(ref_to_message_id.to_string(), timeout)
            .await
        {
            Ok(notification) => {
                trace!(
                    event = events::CORRELATION_CLAIMED,
                    component = COMPONENT,
                    notification = %fields::format_notification(&notification),
                    "notification claimed"
                );
                Ok(notification)
            }
            Err(AwaitError::TimedOut) => {
                // an expected outcome for the caller, not an engine fault
                debug!(
                    event = events::CORRELATION_TIMEOUT,
                    component = COMPONENT,
                    kind = %self.kind,
                    ref_to_msg_id = ref_to_message_id,
                    waited_ms = timeout.as_millis() as u64,
                    "no notification within timeout"
                );
                Err(GatewayError::CorrelationTimeout {
                    message_id: ref_to_message_id.to_string(),
                    waited: timeout,
                })
            }
            Err(AwaitError::Closed) => Err(GatewayError::Rejected(format!(
                "{} correlator shut down while waiting for '{ref_to_message_id}'",
                self.kind
            ))),
        }
    }

    /// Number of carriers currently held, waiting or filled.
    pub fn pending(&self) -> usize {
        self.table.len()
    }

    pub fn contains(&self, ref_to_message_id: &str) -> bool {
        self.table.contains(&ref_to_message_id.to_string())
    }

    /// Runs one sweep immediately, returning the number of carriers removed.
    pub fn sweep_now(&self) -> usize {
        self.table.sweep()
    }

    /// Stops the sweep thread and releases all waiters.
    pub async fn shutdown(&self) {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }

        let dropped = self.table.close();
        if dropped > 0 {
            debug!(
                component = COMPONENT,
                kind = %self.kind,
                dropped,
                "dropped pending carriers on shutdown"
            );
        }
    }
}
