//! Loopback transport: accepts every send and answers it with synthetic
//! submission and relay receipts through the registered context.
//!
//! Receipts are delivered before `send` returns. A send runs on the outbound
//! worker's own runtime, which is dropped once the pipeline drains, so
//! nothing is left running in the background.

use async_trait::async_trait;
use gateway_core::{
    InboundRegistration, Message, Notification, NotificationKind, Result, RoutingDescriptor,
    Transport, TransportContext,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const LOOPBACK_TRANSPORT_ID: &str = "loopback";

const LOOPBACK_TAG: &str = "LoopbackTransport:";
const LOOPBACK_FN_SEND_TAG: &str = "send():";

#[derive(Default)]
pub struct LoopbackTransport {
    inbound: InboundRegistration,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acknowledge(
        &self,
        side: &str,
        descriptor: &RoutingDescriptor,
        message: &Message,
    ) -> Result<()> {
        let message_id = message.head()?.id().to_string();
        info!(
            "{LOOPBACK_TAG}:{LOOPBACK_FN_SEND_TAG} {side} send of {message_id} to {} ({} payloads)",
            descriptor.endpoint_url(),
            message.len()
        );

        let Some(context) = self.inbound.current() else {
            warn!(
                "{LOOPBACK_TAG}:{LOOPBACK_FN_SEND_TAG} no context registered, not acknowledging {message_id}"
            );
            return Ok(());
        };

        for kind in [NotificationKind::Submission, NotificationKind::Relay] {
            let receipt = Notification::receipt(
                kind,
                Uuid::new_v4().to_string(),
                &message_id,
                "loopback receipt",
            );
            if let Err(err) = context.on_notification(receipt).await {
                warn!(
                    "{LOOPBACK_TAG}:{LOOPBACK_FN_SEND_TAG} unable to acknowledge {message_id}: {err}"
                );
            }
        }
        debug!("{LOOPBACK_TAG}:{LOOPBACK_FN_SEND_TAG} acknowledged {message_id}");
        Ok(())
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn identifier(&self) -> &str {
        LOOPBACK_TRANSPORT_ID
    }

    async fn register_inbound_handler(&self, context: Arc<TransportContext>) -> Result<()> {
        self.inbound.register(LOOPBACK_TRANSPORT_ID, context)
    }

    async fn send_consumer_side(
        &self,
        descriptor: &RoutingDescriptor,
        message: &Message,
    ) -> Result<()> {
        self.acknowledge("consumer-side", descriptor, message).await
    }

    async fn send_provider_side(
        &self,
        descriptor: &RoutingDescriptor,
        message: &Message,
    ) -> Result<()> {
        self.acknowledge("provider-side", descriptor, message).await
    }

    async fn shutdown(&self, _context: &TransportContext) -> Result<()> {
        self.inbound.release();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LoopbackTransport, LOOPBACK_TRANSPORT_ID};
    use async_trait::async_trait;
    use gateway_core::{
        Certificate, Gateway, GatewayConfig, Message, Notification, NotificationListener,
        Payload, PeerRole, RoutingDescriptor, StaticTransportCatalog, TransportRegistry,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingListener {
        received: AtomicUsize,
    }

    #[async_trait]
    impl NotificationListener for CountingListener {
        async fn on_notification(&self, _notification: Notification) {
            self.received.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn descriptor() -> RoutingDescriptor {
        RoutingDescriptor::builder()
            .sender_id("9915:demo-gateway")
            .endpoint_url("https://gw.example.org/as4")
            .document_type_id("urn:demo:document::1.0")
            .process_id("urn:demo:process")
            .transport_profile_id("bdxr-transport-ebms3-as4-v1p0")
            .peer_role(PeerRole::ConsumerSide)
            .certificate(Certificate::from_der(vec![0x30]).expect("der"))
            .build()
            .expect("descriptor")
    }

    #[tokio::test]
    async fn every_send_is_acknowledged_before_shutdown_returns() {
        let config = GatewayConfig::new("loopback-test", LOOPBACK_TRANSPORT_ID);
        let catalog = StaticTransportCatalog::default().with(Arc::new(LoopbackTransport::new()));
        let registry = TransportRegistry::new(Arc::new(catalog), config.transport.clone())
            .await
            .expect("registry");
        let gateway = Gateway::new(config, &registry).await.expect("gateway");

        let submissions = Arc::new(CountingListener::default());
        let relays = Arc::new(CountingListener::default());
        gateway
            .register_submission_result_callback(submissions.clone())
            .expect("submission callback");
        gateway
            .register_relay_result_callback(relays.clone())
            .expect("relay callback");

        for _ in 0..20 {
            let payload = Payload::new("application/xml", b"<Demo/>".to_vec()).expect("payload");
            gateway
                .enqueue_outbound(Message::new().with_payload(payload), descriptor())
                .expect("enqueue");
        }
        let stats = gateway.shutdown().await.expect("shutdown");

        assert_eq!(stats.sent, 20);
        assert_eq!(submissions.received.load(Ordering::SeqCst), 20);
        assert_eq!(relays.received.load(Ordering::SeqCst), 20);
    }
}
