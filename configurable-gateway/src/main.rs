/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
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

mod loopback;

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Parser;
use endpoint_discovery_static_file::EndpointDiscoveryStaticFile;
use gateway_core::{
    build_descriptors, Gateway, GatewayConfig, GatewayError, IncomingRequestHandler,
    IncomingResponseHandler, InboundDelivery, Message, Notification, NotificationListener,
    Payload, PeerRole, RouteQuery, StaticTransportCatalog, TransportRegistry,
};
use loopback::LoopbackTransport;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_TRANSPORT_PROFILE: &str = "bdxr-transport-ebms3-as4-v1p0";

#[derive(Debug, Parser)]
#[command(name = "configurable-gateway")]
#[command(about = "Message exchange gateway driven by a JSON5 configuration file")]
struct Cli {
    /// Path to the JSON5 gateway configuration.
    #[arg(short, long, default_value = "DEFAULT_CONFIG.json5")]
    config: PathBuf,

    /// Participant to send one demo document to, resolved through the
    /// configured static discovery file.
    #[arg(long)]
    demo_receiver: Option<String>,

    /// Milliseconds to wait for the demo document's relay receipt.
    #[arg(long, default_value_t = 5000)]
    demo_timeout_ms: u64,
}

struct LoggingHandler;

#[async_trait]
impl IncomingRequestHandler for LoggingHandler {
    async fn handle_incoming_request(
        &self,
        delivery: InboundDelivery,
    ) -> gateway_core::Result<()> {
        info!(
            "incoming request from {} ({}, {} attachments)",
            delivery.sender_id,
            delivery.document.document_type_id,
            delivery.attachments.len()
        );
        Ok(())
    }
}

#[async_trait]
impl IncomingResponseHandler for LoggingHandler {
    async fn handle_incoming_response(
        &self,
        delivery: InboundDelivery,
    ) -> gateway_core::Result<()> {
        info!(
            "incoming response from {} ({})",
            delivery.sender_id, delivery.document.document_type_id
        );
        Ok(())
    }
}

#[async_trait]
impl NotificationListener for LoggingHandler {
    async fn on_notification(&self, notification: Notification) {
        info!(
            "{} result for {}: {}",
            notification.kind(),
            notification.ref_to_message_id(),
            notification.result()
        );
    }
}

fn load_config(path: &Path) -> anyhow::Result<GatewayConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    let config: GatewayConfig =
        json5::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &GatewayConfig) {
    let filter = match &config.logging.filter {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("ignoring invalid logging.filter '{directive}': {err}");
            EnvFilter::new("info")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn send_demo(
    gateway: &Gateway,
    config: &GatewayConfig,
    receiver: &str,
    timeout_ms: u64,
) -> anyhow::Result<()> {
    let Some(static_file) = &config.discovery.static_file else {
        bail!("--demo-receiver requires discovery.static_file in the config");
    };
    let discovery = EndpointDiscoveryStaticFile::new(static_file.clone());
    let query = RouteQuery {
        sender_id: config.gateway_name.clone(),
        receiver_id: receiver.to_string(),
        document_type_id: "urn:demo:document::1.0".to_string(),
        process_id: "urn:demo:process".to_string(),
        transport_profile_id: DEMO_TRANSPORT_PROFILE.to_string(),
        peer_role: PeerRole::ConsumerSide,
    };
    let report = |err: GatewayError| warn!("discovery: {err}");

    let descriptors = build_descriptors(&discovery, "demo", &query, &report).await;
    let Some(descriptor) = descriptors.into_iter().next() else {
        bail!("no {DEMO_TRANSPORT_PROFILE} endpoint found for '{receiver}'");
    };

    let payload = Payload::new("application/xml", b"<DemoRequest/>".to_vec())?;
    let message_id = payload.id().to_string();
    gateway.enqueue_outbound(Message::new().with_payload(payload), descriptor)?;
    info!("demo document {message_id} queued for {receiver}");

    let relay = gateway.await_relay_result(&message_id, timeout_ms).await?;
    info!("demo document {message_id}: relay {}", relay.result());
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.config)?;
    init_tracing(&config);
    info!("starting gateway '{}'", config.gateway_name);

    let catalog = StaticTransportCatalog::default().with(Arc::new(LoopbackTransport::new()));
    let registry = TransportRegistry::new(Arc::new(catalog), config.transport.clone()).await?;
    let gateway = Gateway::new(config.clone(), &registry).await?;

    let handler = Arc::new(LoggingHandler);
    gateway.register_inbound_request_handler(handler.clone())?;
    gateway.register_inbound_response_handler(handler.clone())?;
    gateway.register_submission_result_callback(handler)?;

    if let Some(receiver) = &cli.demo_receiver {
        if let Err(err) = send_demo(&gateway, &config, receiver, cli.demo_timeout_ms).await {
            error!("demo send failed: {err:#}");
        }
    }

    info!(
        "gateway running on transport '{}', press Ctrl-C to stop",
        gateway.transport_id()
    );
    tokio::signal::ctrl_c()
        .await
        .context("unable to listen for Ctrl-C")?;

    let stats = gateway.shutdown().await?;
    info!(
        "gateway stopped: {} enqueued, {} sent, {} failed, {} dropped",
        stats.enqueued, stats.sent, stats.failed, stats.dropped
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("configurable-gateway failed: {error:#}");
            ExitCode::from(2)
        }
    }
}
