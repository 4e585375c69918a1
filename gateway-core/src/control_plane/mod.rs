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

//! Control-plane layer.
//!
//! Owns transport discovery and selection. The registry is an explicit object
//! built once at startup and shared by reference; rescans replace the whole
//! identifier map under a write lock while lookups proceed under read locks.
//!
//! ```
//! use async_trait::async_trait;
//! use gateway_core::{
//!     Message, Result, RoutingDescriptor, StaticTransportCatalog, Transport, TransportConfig,
//!     TransportContext, TransportRegistry,
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
//! let catalog = StaticTransportCatalog::default().with(Arc::new(Loopback));
//! let config = TransportConfig { selected: Some("as4".to_string()), default: "loopback".to_string() };
//! let registry = TransportRegistry::new(Arc::new(catalog), config).await.unwrap();
//!
//! // "as4" is not registered, so the default is used
//! assert_eq!(registry.resolve_configured().await.unwrap().identifier(), "loopback");
//! # });
//! ```

pub(crate) mod transport_registry;
