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

//! Error taxonomy shared by every layer of the gateway.

use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Which inbound path a handler failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    IncomingRequest,
    IncomingResponse,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::IncomingRequest => write!(f, "incoming-request"),
            Direction::IncomingResponse => write!(f, "incoming-response"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Duplicate or missing transport, double handler registration, invalid config.
    /// Surfaced at startup; the process should not proceed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport-level send failure, tagged with a protocol specific code.
    #[error("exchange error [{code}]: {message}")]
    Exchange { code: String, message: String },

    /// No notification arrived for `message_id` within `waited`.
    #[error("no notification for message '{message_id}' after {waited:?}")]
    CorrelationTimeout { message_id: String, waited: Duration },

    /// Inbound document could not be classified or is incomplete.
    #[error("classification error: {0}")]
    Classification(String),

    /// The outbound pipeline no longer accepts work.
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("message contains no payload")]
    NoPayload,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A local inbound handler failed; the transport decides the wire-level fault.
    #[error("{direction} handler failed: {source}")]
    Handler {
        direction: Direction,
        #[source]
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    pub fn configuration(message: impl Into<String>) -> Self {
        GatewayError::Configuration(message.into())
    }

    pub fn exchange(code: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Exchange {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        GatewayError::InvalidArgument(message.into())
    }

    /// Errors after which the process cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Configuration(_))
    }

    /// Protocol error code carried by an [`GatewayError::Exchange`].
    pub fn exchange_code(&self) -> Option<&str> {
        match self {
            GatewayError::Exchange { code, .. } => Some(code),
            GatewayError::Handler { source, .. } => source.exchange_code(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
