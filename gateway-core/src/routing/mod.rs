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

//! Routing layer.
//!
//! Owns the routing descriptor model and the derivation of descriptors from an
//! external discovery service, including the transport-profile filter applied
//! to whatever endpoints discovery returns.
//!
//! ```
//! use gateway_core::{Certificate, PeerRole, RoutingDescriptor};
//!
//! let descriptor = RoutingDescriptor::builder()
//!     .sender_id("9915:sender")
//!     .endpoint_url("https://gw.example.org/as4")
//!     .document_type_id("urn:doc:request::1.0")
//!     .process_id("urn:process:request-response")
//!     .transport_profile_id("bdxr-transport-ebms3-as4-v1p0")
//!     .peer_role(PeerRole::ConsumerSide)
//!     .certificate(Certificate::from_der(vec![0x30, 0x82]).unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(descriptor.peer_role(), PeerRole::ConsumerSide);
//! ```

pub(crate) mod descriptor;
pub(crate) mod discovery;

pub use descriptor::{Certificate, PeerRole, RoutingDescriptor, RoutingDescriptorBuilder};
pub use discovery::{build_descriptors, Endpoint, EndpointDiscovery, RouteQuery};
