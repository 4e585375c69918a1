//! Endpoint discovery seam and descriptor derivation.

use crate::error::GatewayError;
use crate::observability::events;
use crate::routing::descriptor::{Certificate, PeerRole, RoutingDescriptor};
use async_trait::async_trait;
use tracing::{debug, warn};

const COMPONENT: &str = "discovery";

/// A technical endpoint as returned by a discovery service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub participant_id: String,
    pub transport_profile: String,
    pub endpoint_url: String,
    pub certificate: Certificate,
}

#[async_trait]
pub trait EndpointDiscovery: Send + Sync {
    /// Resolves the endpoints serving `participant_id` for the given
    /// document type, process and transport profile. Lookup failures go to
    /// `error_handler` instead of aborting the whole resolution.
    async fn resolve_endpoints(
        &self,
        log_prefix: &str,
        participant_id: &str,
        document_type_id: &str,
        process_id: &str,
        transport_profile_id: &str,
        error_handler: &(dyn Fn(GatewayError) + Send + Sync),
    ) -> Vec<Endpoint>;
}

/// Everything needed to route one document to one receiver.
#[derive(Clone, Debug)]
pub struct RouteQuery {
    pub sender_id: String,
    pub receiver_id: String,
    pub document_type_id: String,
    pub process_id: String,
    pub transport_profile_id: String,
    pub peer_role: PeerRole,
}

/// Resolves endpoints for `query` and turns the ones speaking the requested
/// transport profile into routing descriptors.
///
/// Endpoints that cannot produce a valid descriptor are reported to
/// `error_handler` and skipped.
pub async fn build_descriptors(
    discovery: &dyn EndpointDiscovery,
    log_prefix: &str,
    query: &RouteQuery,
    error_handler: &(dyn Fn(GatewayError) + Send + Sync),
) -> Vec<RoutingDescriptor> {
    let endpoints = discovery
        .resolve_endpoints(
            log_prefix,
            &query.receiver_id,
            &query.document_type_id,
            &query.process_id,
            &query.transport_profile_id,
            error_handler,
        )
        .await;

    debug!(
        component = COMPONENT,
        log_prefix,
        receiver = %query.receiver_id,
        endpoints = endpoints.len(),
        "resolved endpoints"
    );

    endpoints
        .into_iter()
        .filter(|endpoint| {
            let matches = endpoint.transport_profile == query.transport_profile_id;
            if !matches {
                debug!(
                    event = events::DISCOVERY_ENDPOINT_SKIPPED,
                    component = COMPONENT,
                    log_prefix,
                    endpoint_url = %endpoint.endpoint_url,
                    transport_profile = %endpoint.transport_profile,
                    reason = "transport_profile_mismatch",
                    "skipping endpoint"
                );
            }
            matches
        })
        .filter_map(|endpoint| {
            match RoutingDescriptor::builder()
                .sender_id(&query.sender_id)
                .endpoint_url(endpoint.endpoint_url)
                .document_type_id(&query.document_type_id)
                .process_id(&query.process_id)
                .transport_profile_id(endpoint.transport_profile)
                .peer_role(query.peer_role)
                .certificate(endpoint.certificate)
                .build()
            {
                Ok(descriptor) => Some(descriptor),
                Err(err) => {
                    warn!(
                        event = events::DISCOVERY_ENDPOINT_SKIPPED,
                        component = COMPONENT,
                        log_prefix,
                        err = %err,
                        reason = "invalid_descriptor",
                        "skipping endpoint"
                    );
                    error_handler(err);
                    None
                }
            }
        })
        .collect()
}
