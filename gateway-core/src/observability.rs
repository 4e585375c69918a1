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

//! Stable event names and field formatting used by structured `tracing` output.
//!
//! Every event emitted by this crate carries an `event` field taken from
//! [`events`] and a `component` field naming the emitting module, so logs can be
//! filtered and asserted on without matching free-form text.

pub mod events {
    pub const REGISTRY_REINITIALIZED: &str = "registry_reinitialized";
    pub const REGISTRY_DUPLICATE_TRANSPORT: &str = "registry_duplicate_transport";
    pub const REGISTRY_NO_TRANSPORTS: &str = "registry_no_transports";
    pub const REGISTRY_FALLBACK_TO_DEFAULT: &str = "registry_fallback_to_default";
    pub const REGISTRY_RESOLVE_FAILED: &str = "registry_resolve_failed";

    pub const PIPELINE_ENQUEUED: &str = "pipeline_enqueued";
    pub const PIPELINE_REJECTED: &str = "pipeline_rejected";
    pub const PIPELINE_DISPATCHED: &str = "pipeline_dispatched";
    pub const PIPELINE_SEND_OK: &str = "pipeline_send_ok";
    pub const PIPELINE_SEND_FAILED: &str = "pipeline_send_failed";
    pub const PIPELINE_WORKER_STOPPED: &str = "pipeline_worker_stopped";
    pub const PIPELINE_SHUTDOWN: &str = "pipeline_shutdown";

    pub const CORRELATION_DELIVERED: &str = "correlation_delivered";
    pub const CORRELATION_STORED: &str = "correlation_stored";
    pub const CORRELATION_LATE_DELIVERY: &str = "correlation_late_delivery";
    pub const CORRELATION_CLAIMED: &str = "correlation_claimed";
    pub const CORRELATION_TIMEOUT: &str = "correlation_timeout";
    pub const CORRELATION_SWEPT: &str = "correlation_swept";
    pub const CORRELATION_CALLBACK: &str = "correlation_callback";

    pub const INBOUND_RECEIVE: &str = "inbound_receive";
    pub const INBOUND_DROP_UNCLASSIFIED: &str = "inbound_drop_unclassified";
    pub const INBOUND_DROP_MISSING_ATTACHMENT: &str = "inbound_drop_missing_attachment";
    pub const INBOUND_DROP_NO_HANDLER: &str = "inbound_drop_no_handler";
    pub const INBOUND_HANDLER_FAILED: &str = "inbound_handler_failed";

    pub const DISCOVERY_ENDPOINT_SKIPPED: &str = "discovery_endpoint_skipped";

    pub const GATEWAY_CREATED: &str = "gateway_created";
    pub const GATEWAY_SHUTDOWN: &str = "gateway_shutdown";
}

pub mod fields {
    use crate::model::{Message, Notification};
    use crate::routing::RoutingDescriptor;

    /// Identifier of the head payload, or `-` for an empty message.
    pub fn format_message_id(message: &Message) -> String {
        message
            .head()
            .map(|payload| payload.id().to_string())
            .unwrap_or_else(|_| "-".to_string())
    }

    pub fn format_route(descriptor: &RoutingDescriptor) -> String {
        format!(
            "{} -> {} [{} / {}]",
            descriptor.sender_id(),
            descriptor.endpoint_url(),
            descriptor.document_type_id(),
            descriptor.process_id()
        )
    }

    pub fn format_notification(notification: &Notification) -> String {
        format!(
            "{}:{}->{}:{}",
            notification.kind(),
            notification.message_id(),
            notification.ref_to_message_id(),
            notification.result()
        )
    }
}
