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

//! Read-only [`EndpointDiscovery`] backed by a static JSON file.
//!
//! The file maps participant identifiers to the endpoints serving them:
//!
//! ```json
//! {
//!   "9915:receiver": [
//!     {
//!       "transport_profile": "bdxr-transport-ebms3-as4-v1p0",
//!       "endpoint_url": "https://gw.example.org/as4",
//!       "certificate": "MIIBCgKCAQEA"
//!     }
//!   ]
//! }
//! ```
//!
//! Certificates are base64 encoded DER. The file is read on every lookup, so
//! edits take effect without a restart. Document type and process are not
//! part of the static model; every endpoint of a participant is returned.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use gateway_core::{Certificate, Endpoint, EndpointDiscovery, GatewayError};
use serde_json::Value;
use std::fs::{self, canonicalize};
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct EndpointDiscoveryStaticFile {
    static_file: PathBuf,
}

impl EndpointDiscoveryStaticFile {
    pub fn new(static_file: impl Into<PathBuf>) -> Self {
        Self {
            static_file: static_file.into(),
        }
    }

    fn read_static_config_json(&self) -> Result<Value, GatewayError> {
        let endpoint_json_file = canonicalize(&self.static_file).map_err(|error| {
            GatewayError::configuration(format!(
                "Static endpoint file {} not found: {error}",
                self.static_file.display()
            ))
        })?;
        debug!("endpoint_json_file: {endpoint_json_file:?}");

        let data = fs::read_to_string(&endpoint_json_file).map_err(|error| {
            GatewayError::configuration(format!("Unable to read file: {error}"))
        })?;

        serde_json::from_str(&data)
            .map_err(|error| GatewayError::configuration(format!("Unable to parse JSON: {error}")))
    }

    fn parse_endpoint(
        participant_id: &str,
        entry: &Value,
    ) -> Result<Endpoint, GatewayError> {
        let field = |name: &str| {
            entry
                .get(name)
                .and_then(Value::as_str)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    GatewayError::invalid_argument(format!(
                        "endpoint of '{participant_id}' is missing '{name}'"
                    ))
                })
        };

        let der = general_purpose::STANDARD
            .decode(field("certificate")?)
            .map_err(|error| {
                GatewayError::invalid_argument(format!(
                    "certificate of '{participant_id}' must be base64 encoded: {error}"
                ))
            })?;

        Ok(Endpoint {
            participant_id: participant_id.to_string(),
            transport_profile: field("transport_profile")?.to_string(),
            endpoint_url: field("endpoint_url")?.to_string(),
            certificate: Certificate::from_der(der)?,
        })
    }
}

#[async_trait]
impl EndpointDiscovery for EndpointDiscoveryStaticFile {
    async fn resolve_endpoints(
        &self,
        log_prefix: &str,
        participant_id: &str,
        document_type_id: &str,
        process_id: &str,
        transport_profile_id: &str,
        error_handler: &(dyn Fn(GatewayError) + Send + Sync),
    ) -> Vec<Endpoint> {
        debug!(
            "{log_prefix} resolving {participant_id} for {document_type_id} / {process_id} / {transport_profile_id}"
        );

        let value = match self.read_static_config_json() {
            Ok(value) => value,
            Err(err) => {
                error_handler(err);
                return Vec::new();
            }
        };

        let Some(entries) = value.get(participant_id) else {
            debug!("{log_prefix} no static endpoints for {participant_id}");
            return Vec::new();
        };
        let Some(entries) = entries.as_array() else {
            warn!("{log_prefix} ignoring non-array endpoint list for '{participant_id}'");
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| match Self::parse_endpoint(participant_id, entry) {
                Ok(endpoint) => Some(endpoint),
                Err(err) => {
                    warn!("{log_prefix} skipping endpoint: {err}");
                    error_handler(err);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::EndpointDiscoveryStaticFile;
    use gateway_core::{
        build_descriptors, EndpointDiscovery, GatewayError, PeerRole, RouteQuery,
    };
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    const AS4: &str = "bdxr-transport-ebms3-as4-v1p0";

    fn write_static_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("static test config written");
        file
    }

    fn query(receiver_id: &str) -> RouteQuery {
        RouteQuery {
            sender_id: "9915:sender".to_string(),
            receiver_id: receiver_id.to_string(),
            document_type_id: "urn:doc".to_string(),
            process_id: "urn:process".to_string(),
            transport_profile_id: AS4.to_string(),
            peer_role: PeerRole::ConsumerSide,
        }
    }

    #[tokio::test]
    async fn shipped_testdata_resolves_to_descriptors() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static-configs/testdata.json");
        let discovery = EndpointDiscoveryStaticFile::new(path);
        let errors = Mutex::new(Vec::new());
        let handler = |err: GatewayError| errors.lock().expect("lock").push(err.to_string());

        let descriptors =
            build_descriptors(&discovery, "test", &query("9915:receiver-a"), &handler).await;

        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].endpoint_url(), "https://gw-a.example.org/as4");
        assert!(errors.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn malformed_entries_are_reported_and_skipped() {
        let file = write_static_config(
            r#"{
                "9915:receiver": [
                    { "transport_profile": "bdxr-transport-ebms3-as4-v1p0",
                      "endpoint_url": "https://ok.example.org/as4",
                      "certificate": "MIIBCg==" },
                    { "transport_profile": "bdxr-transport-ebms3-as4-v1p0",
                      "endpoint_url": "https://bad.example.org/as4",
                      "certificate": "not base64!" },
                    { "transport_profile": "bdxr-transport-ebms3-as4-v1p0",
                      "certificate": "MIIBCg==" }
                ]
            }"#,
        );
        let discovery = EndpointDiscoveryStaticFile::new(file.path());
        let errors = Mutex::new(Vec::new());
        let handler = |err: GatewayError| errors.lock().expect("lock").push(err.to_string());

        let endpoints = discovery
            .resolve_endpoints("test", "9915:receiver", "urn:doc", "urn:process", AS4, &handler)
            .await;

        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].endpoint_url, "https://ok.example.org/as4");
        assert_eq!(endpoints[0].certificate.der(), &[0x30, 0x82, 0x01, 0x0a]);
        assert_eq!(errors.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_a_configuration_error() {
        let discovery = EndpointDiscoveryStaticFile::new("/nonexistent/endpoints.json");
        let errors = Mutex::new(Vec::new());
        let handler = |err: GatewayError| errors.lock().expect("lock").push(err.is_fatal());

        let endpoints = discovery
            .resolve_endpoints("test", "9915:receiver", "urn:doc", "urn:process", AS4, &handler)
            .await;

        assert!(endpoints.is_empty());
        assert_eq!(*errors.lock().expect("lock"), vec![true]);
    }

    #[tokio::test]
    async fn unknown_participant_yields_nothing() {
        let file = write_static_config(r#"{ "9915:receiver": [] }"#);
        let discovery = EndpointDiscoveryStaticFile::new(file.path());
        let handler = |_: GatewayError| panic!("no error expected");

        let endpoints = discovery
            .resolve_endpoints("test", "9915:someone-else", "urn:doc", "urn:process", AS4, &handler)
            .await;
        assert!(endpoints.is_empty());
    }
}
