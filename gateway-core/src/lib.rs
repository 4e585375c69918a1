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

//! # gateway-core
//!
//! `gateway-core` is the message exchange core of a cross-organization gateway
//! connector. A local backend hands it business documents addressed by a
//! [`RoutingDescriptor`]; the core queues them for a pluggable [`Transport`],
//! and correlates the submission and relay acknowledgements that arrive later
//! back to the original send. Inbound deliveries from remote parties are
//! demultiplexed to local request and response handlers.
//!
//! ## Quick start
//!
//! ```
//! use async_trait::async_trait;
//! use gateway_core::{
//!     Gateway, GatewayConfig, Message, Notification, NotificationKind, Result,
//!     RoutingDescriptor, StaticTransportCatalog, Transport, TransportContext, TransportRegistry,
//! };
//! use std::sync::Arc;
//!
//! struct Loopback;
//!
//! #[async_trait]
//! impl Transport for Loopback {
//!     fn identifier(&self) -> &str { "loopback" }
//!     async fn register_inbound_handler(&self, _: Arc<TransportContext>) -> Result<()> { Ok(()) }
//!     async fn send_consumer_side(&self, _: &RoutingDescriptor, _: &Message) -> Result<()> { Ok(()) }
//!     async fn send_provider_side(&self, _: &RoutingDescriptor, _: &Message) -> Result<()> { Ok(()) }
//!     async fn shutdown(&self, _: &TransportContext) -> Result<()> { Ok(()) }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = GatewayConfig::new("quick-start", "loopback");
//! let catalog = StaticTransportCatalog::default().with(Arc::new(Loopback));
//! let registry = TransportRegistry::new(Arc::new(catalog), config.transport.clone())
//!     .await
//!     .unwrap();
//! let gateway = Gateway::new(config, &registry).await.unwrap();
//!
//! // the transport reports an acknowledgement before anyone asks for it
//! gateway
//!     .context()
//!     .on_notification(Notification::receipt(NotificationKind::Submission, "n1", "m1", "ok"))
//!     .await
//!     .unwrap();
//!
//! let receipt = gateway.await_submission_result("m1", 1000).await.unwrap();
//! assert!(receipt.is_receipt());
//! gateway.shutdown().await.unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`Gateway`] plus the [`Transport`] contract and its [`TransportContext`]
//! - Model: payloads, messages, notifications and parsed inbound deliveries
//! - Routing: routing descriptors and their derivation from endpoint discovery
//! - Control plane: transport catalog scanning and configured selection
//! - Data plane: outbound FIFO pipeline with its worker, inbound demultiplexer
//! - Correlation: keyed rendezvous tables with TTL sweep, one engine per notification kind
//! - Runtime: dedicated worker thread boundaries
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not unconditionally initialize a global
//! subscriber. Binaries/tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

mod api;
pub use api::transport::{InboundRegistration, Transport, TransportContext};

mod config;
pub use config::{CorrelationConfig, DiscoveryConfig, GatewayConfig, LoggingConfig, TransportConfig};

mod control_plane;
pub use control_plane::transport_registry::{
    StaticTransportCatalog, TransportCatalog, TransportRegistry,
};

pub mod correlation;
pub use correlation::{NotificationCorrelator, NotificationListener};

mod data_plane;
pub use data_plane::inbound_demux::{
    IncomingRequestHandler, IncomingResponseHandler, InboundDemultiplexer,
};
pub use data_plane::outbound_pipeline::{DispatchState, OutboundPipeline, PipelineStats};

mod error;
pub use error::{Direction, GatewayError, Result};

mod gateway;
pub use gateway::Gateway;

mod model;
pub use model::{
    generate_payload_id, is_generated_payload_id, BusinessDocument, DocumentClass,
    InboundDelivery, Message, Notification, NotificationKind, NotificationResult, Payload,
    NOTIFICATION_TTL,
};

#[doc(hidden)]
pub mod observability;

mod routing;
pub use routing::{
    build_descriptors, Certificate, Endpoint, EndpointDiscovery, PeerRole, RouteQuery,
    RoutingDescriptor, RoutingDescriptorBuilder,
};

mod runtime;
