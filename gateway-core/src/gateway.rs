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

use crate::api::transport::{Transport, TransportContext};
use crate::config::GatewayConfig;
use crate::control_plane::transport_registry::TransportRegistry;
use crate::correlation::{NotificationCorrelator, NotificationListener};
use crate::data_plane::inbound_demux::{
    IncomingRequestHandler, IncomingResponseHandler, InboundDemultiplexer,
};
use crate::data_plane::outbound_pipeline::{OutboundPipeline, PipelineStats};
use crate::error::Result;
use crate::model::{Message, Notification, NotificationKind};
use crate::observability::events;
use crate::routing::RoutingDescriptor;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const GATEWAY_TAG: &str = "Gateway:";
const GATEWAY_FN_NEW_TAG: &str = "new():";
const GATEWAY_FN_SHUTDOWN_TAG: &str = "shutdown():";

const COMPONENT: &str = "gateway";

/// Outward facade of the message exchange core.
///
/// Owns one outbound pipeline bound to the configured transport, one
/// correlation engine per notification kind, and the inbound demultiplexer
/// the transport feeds through its [`TransportContext`].
pub struct Gateway {
    name: String,
    transport: Arc<dyn Transport>,
    context: Arc<TransportContext>,
    demultiplexer: Arc<InboundDemultiplexer>,
    submission_results: Arc<NotificationCorrelator>,
    relay_results: Arc<NotificationCorrelator>,
    pipeline: OutboundPipeline,
    stopped: AtomicBool,
}

impl Gateway {
    /// Validates `config`, resolves the configured transport from `registry`,
    /// registers the inbound context with it and starts the outbound worker.
    pub async fn new(config: GatewayConfig, registry: &TransportRegistry) -> Result<Self> {
        config.validate()?;
        let name = format!("{GATEWAY_TAG}{}", config.gateway_name);
        debug!("{name}:{GATEWAY_FN_NEW_TAG} creating gateway");

        let transport = registry.resolve_configured().await?;

        let submission_results = Arc::new(NotificationCorrelator::new(
            NotificationKind::Submission,
            &config.correlation,
        )?);
        let relay_results =
            match NotificationCorrelator::new(NotificationKind::Relay, &config.correlation) {
                Ok(relay_results) => Arc::new(relay_results),
                Err(err) => {
                    submission_results.shutdown().await;
                    return Err(err);
                }
            };
        let demultiplexer = Arc::new(InboundDemultiplexer::new());
        let context = Arc::new(TransportContext::new(
            &config.gateway_name,
            demultiplexer.clone(),
            submission_results.clone(),
            relay_results.clone(),
        ));

        if let Err(err) = transport.register_inbound_handler(context.clone()).await {
            error!(
                "{name}:{GATEWAY_FN_NEW_TAG} transport '{}' refused inbound registration: {err}",
                transport.identifier()
            );
            stop_correlators(&submission_results, &relay_results).await;
            return Err(err);
        }

        let pipeline = match OutboundPipeline::start(transport.clone()) {
            Ok(pipeline) => pipeline,
            Err(err) => {
                if let Err(shutdown_err) = transport.shutdown(&context).await {
                    error!("{name}:{GATEWAY_FN_NEW_TAG} transport shutdown failed: {shutdown_err}");
                }
                stop_correlators(&submission_results, &relay_results).await;
                return Err(err);
            }
        };

        info!(
            event = events::GATEWAY_CREATED,
            component = COMPONENT,
            gateway = %config.gateway_name,
            transport_id = transport.identifier(),
            ttl_secs = config.correlation.ttl_secs,
            sweep_period_secs = config.correlation.sweep_period_secs,
            "gateway created"
        );

        Ok(Self {
            name,
            transport,
            context,
            demultiplexer,
            submission_results,
            relay_results,
            pipeline,
            stopped: AtomicBool::new(false),
        })
    }

    /// Accepts `message` for asynchronous transmission to `descriptor`.
    pub fn enqueue_outbound(&self, message: Message, descriptor: RoutingDescriptor) -> Result<()> {
        self.pipeline.enqueue(message, descriptor)
    }

    pub fn register_inbound_request_handler(
        &self,
        handler: Arc<dyn IncomingRequestHandler>,
    ) -> Result<()> {
        self.demultiplexer.register_request_handler(handler)
    }

    pub fn register_inbound_response_handler(
        &self,
        handler: Arc<dyn IncomingResponseHandler>,
    ) -> Result<()> {
        self.demultiplexer.register_response_handler(handler)
    }

    /// Waits for the submission acknowledgement of `message_id`. Zero waits without bound.
    pub async fn await_submission_result(
        &self,
        message_id: &str,
        timeout_millis: u64,
    ) -> Result<Notification> {
        self.submission_results
            .await_notification(message_id, Duration::from_millis(timeout_millis))
            .await
    }

    /// Waits for the relay acknowledgement of `message_id`. Zero waits without bound.
    pub async fn await_relay_result(
        &self,
        message_id: &str,
        timeout_millis: u64,
    ) -> Result<Notification> {
        self.relay_results
            .await_notification(message_id, Duration::from_millis(timeout_millis))
            .await
    }

    pub fn register_submission_result_callback(
        &self,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<()> {
        self.submission_results.register_listener(listener)
    }

    pub fn register_relay_result_callback(
        &self,
        listener: Arc<dyn NotificationListener>,
    ) -> Result<()> {
        self.relay_results.register_listener(listener)
    }

    /// Inbound entry points, as registered with the transport.
    pub fn context(&self) -> Arc<TransportContext> {
        self.context.clone()
    }

    pub fn transport_id(&self) -> &str {
        self.transport.identifier()
    }

    pub fn submission_results(&self) -> &NotificationCorrelator {
        &self.submission_results
    }

    pub fn relay_results(&self) -> &NotificationCorrelator {
        &self.relay_results
    }

    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    /// Drains the outbound pipeline, shuts the transport down and releases
    /// every pending waiter. Later calls only return the final stats.
    pub async fn shutdown(&self) -> Result<PipelineStats> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Ok(self.pipeline.stats());
        }
        debug!("{}:{GATEWAY_FN_SHUTDOWN_TAG} stopping intake and draining", self.name);

        let stats = self.pipeline.shutdown(Duration::ZERO).await;
        let transport_result = self.transport.shutdown(&self.context).await;
        if let Err(err) = &transport_result {
            error!(
                "{}:{GATEWAY_FN_SHUTDOWN_TAG} transport '{}' failed to shut down: {err}",
                self.name,
                self.transport.identifier()
            );
        }
        stop_correlators(&self.submission_results, &self.relay_results).await;

        info!(
            event = events::GATEWAY_SHUTDOWN,
            component = COMPONENT,
            gateway = %self.context.gateway_name(),
            sent = stats.sent,
            failed = stats.failed,
            dropped = stats.dropped,
            "gateway stopped"
        );
        transport_result.map(|()| stats)
    }
}

async fn stop_correlators(
    submission_results: &NotificationCorrelator,
    relay_results: &NotificationCorrelator,
) {
    submission_results.shutdown().await;
    relay_results.shutdown().await;
}

impl Debug for Gateway {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("name", &self.name)
            .field("transport_id", &self.transport.identifier())
            .field("stats", &self.pipeline.stats())
            .finish()
    }
}
