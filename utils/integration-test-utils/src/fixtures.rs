//! Builders for the values integration tests pass around.

use gateway_core::{
    BusinessDocument, Certificate, CorrelationConfig, DocumentClass, GatewayConfig,
    InboundDelivery, Message, Notification, NotificationKind, Payload, PeerRole,
    RoutingDescriptor,
};
use uuid::Uuid;

pub const SENDER_ID: &str = "iso6523-actorid-upis::9915:sender";
pub const ENDPOINT_URL: &str = "https://gw.example.org/as4";
pub const DOCUMENT_TYPE_ID: &str = "urn:example:document:request::1.0";
pub const PROCESS_ID: &str = "urn:example:process:request-response";
pub const TRANSPORT_PROFILE_ID: &str = "bdxr-transport-ebms3-as4-v1p0";

/// Placeholder DER bytes; transports under test never validate them.
pub fn certificate() -> Certificate {
    Certificate::from_der(vec![0x30, 0x82, 0x01, 0x0a]).expect("non-empty der")
}

pub fn descriptor(peer_role: PeerRole) -> RoutingDescriptor {
    RoutingDescriptor::builder()
        .sender_id(SENDER_ID)
        .endpoint_url(ENDPOINT_URL)
        .document_type_id(DOCUMENT_TYPE_ID)
        .process_id(PROCESS_ID)
        .transport_profile_id(TRANSPORT_PROFILE_ID)
        .peer_role(peer_role)
        .certificate(certificate())
        .build()
        .expect("valid descriptor")
}

/// Single-payload message whose head carries `message_id`.
pub fn message(message_id: &str) -> Message {
    Message::new().with_payload(
        Payload::with_id(message_id, "application/xml", format!("<Doc id=\"{message_id}\"/>"))
            .expect("valid payload"),
    )
}

pub fn submission_receipt(ref_to_message_id: &str) -> Notification {
    Notification::receipt(
        NotificationKind::Submission,
        Uuid::new_v4().to_string(),
        ref_to_message_id,
        "accepted for relay",
    )
}

pub fn relay_receipt(ref_to_message_id: &str) -> Notification {
    Notification::receipt(
        NotificationKind::Relay,
        Uuid::new_v4().to_string(),
        ref_to_message_id,
        "relayed to recipient",
    )
}

pub fn relay_error(ref_to_message_id: &str, code: &str) -> Notification {
    Notification::error(
        NotificationKind::Relay,
        Uuid::new_v4().to_string(),
        ref_to_message_id,
        code,
        "relay failed",
    )
}

pub fn delivery(class: DocumentClass) -> InboundDelivery {
    InboundDelivery::new(
        SENDER_ID,
        BusinessDocument::new(DOCUMENT_TYPE_ID, class, b"<Doc/>".to_vec()),
    )
}

/// Gateway config for `transport_id` with the given correlation timings.
pub fn gateway_config(transport_id: &str, ttl_secs: u64, sweep_period_secs: u64) -> GatewayConfig {
    let mut config = GatewayConfig::new("gw-test", transport_id);
    config.correlation = CorrelationConfig {
        ttl_secs,
        sweep_period_secs,
    };
    config
}
