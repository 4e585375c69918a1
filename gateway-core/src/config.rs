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

//! Gateway configuration model.
//!
//! Loading is left to the embedding process; this module only defines the
//! deserializable shape, its defaults and validation.

use crate::error::{GatewayError, Result};
use crate::model::NOTIFICATION_TTL;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub gateway_name: String,
    pub transport: TransportConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Identifier of the transport to use; the default is used when unset or unknown.
    #[serde(default)]
    pub selected: Option<String>,
    pub default: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorrelationConfig {
    #[serde(default = "CorrelationConfig::default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "CorrelationConfig::default_sweep_period_secs")]
    pub sweep_period_secs: u64,
}

impl CorrelationConfig {
    fn default_ttl_secs() -> u64 {
        NOTIFICATION_TTL.as_secs()
    }

    fn default_sweep_period_secs() -> u64 {
        NOTIFICATION_TTL.as_secs()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_period_secs)
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Self::default_ttl_secs(),
            sweep_period_secs: Self::default_sweep_period_secs(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub static_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `gateway_core=debug`.
    #[serde(default)]
    pub filter: Option<String>,
}

impl GatewayConfig {
    pub fn new(gateway_name: impl Into<String>, default_transport: impl Into<String>) -> Self {
        Self {
            gateway_name: gateway_name.into(),
            transport: TransportConfig {
                selected: None,
                default: default_transport.into(),
            },
            correlation: CorrelationConfig::default(),
            discovery: DiscoveryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway_name.trim().is_empty() {
            return Err(GatewayError::configuration("gateway_name must not be empty"));
        }
        if self.transport.default.trim().is_empty() {
            return Err(GatewayError::configuration(
                "transport.default must name a transport",
            ));
        }
        if matches!(&self.transport.selected, Some(selected) if selected.trim().is_empty()) {
            return Err(GatewayError::configuration(
                "transport.selected must not be blank when present",
            ));
        }
        if self.correlation.ttl_secs == 0 || self.correlation.sweep_period_secs == 0 {
            return Err(GatewayError::configuration(
                "correlation ttl and sweep period must be positive",
            ));
        }
        Ok(())
    }
}
