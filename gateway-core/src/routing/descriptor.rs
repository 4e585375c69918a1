//! Resolved delivery target for exactly one send.

use crate::error::{GatewayError, Result};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use tracing::debug;

const ROUTING_DESCRIPTOR_TAG: &str = "RoutingDescriptor:";
const ROUTING_DESCRIPTOR_FN_BUILD_TAG: &str = "build():";

/// The side of the four-corner model that is sending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PeerRole {
    /// Sends requests, receives responses.
    ConsumerSide,
    /// Receives requests, sends responses.
    ProviderSide,
}

impl Display for PeerRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerRole::ConsumerSide => write!(f, "consumer-side"),
            PeerRole::ProviderSide => write!(f, "provider-side"),
        }
    }
}

/// DER encoded X.509 certificate of a receiving gateway.
///
/// Kept opaque: validating it is the transport's business.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Arc<[u8]>,
}

impl Certificate {
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = der.into();
        if der.is_empty() {
            return Err(GatewayError::invalid_argument("certificate must not be empty"));
        }
        Ok(Self {
            der: Arc::from(der),
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl Debug for Certificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("der_len", &self.der.len())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingDescriptor {
    sender_id: String,
    endpoint_url: String,
    document_type_id: String,
    process_id: String,
    transport_profile_id: String,
    peer_role: PeerRole,
    certificate: Certificate,
}

impl RoutingDescriptor {
    pub fn builder() -> RoutingDescriptorBuilder {
        RoutingDescriptorBuilder::default()
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn document_type_id(&self) -> &str {
        &self.document_type_id
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn transport_profile_id(&self) -> &str {
        &self.transport_profile_id
    }

    pub fn peer_role(&self) -> PeerRole {
        self.peer_role
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}

#[derive(Clone, Debug, Default)]
pub struct RoutingDescriptorBuilder {
    sender_id: Option<String>,
    endpoint_url: Option<String>,
    document_type_id: Option<String>,
    process_id: Option<String>,
    transport_profile_id: Option<String>,
    peer_role: Option<PeerRole>,
    certificate: Option<Certificate>,
}

impl RoutingDescriptorBuilder {
    pub fn sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn document_type_id(mut self, document_type_id: impl Into<String>) -> Self {
        self.document_type_id = Some(document_type_id.into());
        self
    }

    pub fn process_id(mut self, process_id: impl Into<String>) -> Self {
        self.process_id = Some(process_id.into());
        self
    }

    pub fn transport_profile_id(mut self, transport_profile_id: impl Into<String>) -> Self {
        self.transport_profile_id = Some(transport_profile_id.into());
        self
    }

    pub fn peer_role(mut self, peer_role: PeerRole) -> Self {
        self.peer_role = Some(peer_role);
        self
    }

    pub fn certificate(mut self, certificate: Certificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Validates that every field is present and non-blank.
    pub fn build(self) -> Result<RoutingDescriptor> {
        let descriptor = RoutingDescriptor {
            sender_id: required_text("sender_id", self.sender_id)?,
            endpoint_url: required_text("endpoint_url", self.endpoint_url)?,
            document_type_id: required_text("document_type_id", self.document_type_id)?,
            process_id: required_text("process_id", self.process_id)?,
            transport_profile_id: required_text("transport_profile_id", self.transport_profile_id)?,
            peer_role: self
                .peer_role
                .ok_or_else(|| GatewayError::invalid_argument("peer_role is required"))?,
            certificate: self
                .certificate
                .ok_or_else(|| GatewayError::invalid_argument("certificate is required"))?,
        };

        debug!(
            "{}:{} Built descriptor for {} via {}",
            ROUTING_DESCRIPTOR_TAG,
            ROUTING_DESCRIPTOR_FN_BUILD_TAG,
            descriptor.endpoint_url,
            descriptor.transport_profile_id
        );

        Ok(descriptor)
    }
}

fn required_text(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(GatewayError::invalid_argument(format!(
            "{field} must not be empty"
        ))),
        None => Err(GatewayError::invalid_argument(format!("{field} is required"))),
    }
}
