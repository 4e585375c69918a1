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

//! Data-plane layer.
//!
//! Owns message movement in both directions. Outbound, callers enqueue onto a
//! FIFO pipeline drained by a single worker thread, so enqueue never waits on
//! the network and a failing send never stalls later messages. Inbound, the
//! demultiplexer routes parsed deliveries to the local request or response
//! handler and drops what it cannot classify.

pub(crate) mod inbound_demux;
pub(crate) mod outbound_pipeline;
pub(crate) mod outbound_worker;
