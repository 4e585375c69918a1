//! Pluggable transport contract and the context a transport feeds inbound traffic into.

use crate::correlation::NotificationCorrelator;
use crate::data_plane::inbound_demux::InboundDemultiplexer;
use crate::error::{GatewayError, Result};
use crate::model::{InboundDelivery, Message, Notification, NotificationKind};
use crate::routing::{PeerRole, RoutingDescriptor};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const INBOUND_REGISTRATION_TAG: &str = "InboundRegistration:";
const INBOUND_REGISTRATION_FN_RELEASE_TAG: &str = "release():";

/// Wire-protocol binding used by the gateway to exchange messages.
///
/// Implementations perform exactly one transmission attempt per send. A
/// successful send only means the transport accepted the message; delivery
/// outcomes arrive later as notifications through the registered
/// [`TransportContext`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stable identifier, unique across all transports of a registry.
    fn identifier(&self) -> &str;

    /// Attaches the gateway's inbound context. A second registration before
    /// [`Transport::shutdown`] must fail with [`GatewayError::Configuration`].
    async fn register_inbound_handler(&self, context: Arc<TransportContext>) -> Result<()>;

    async fn send_consumer_side(
        &self,
        descriptor: &RoutingDescriptor,
        message: &Message,
    ) -> Result<()>;

    async fn send_provider_side(
        &self,
        descriptor: &RoutingDescriptor,
        message: &Message,
    ) -> Result<()>;

    /// Releases transport resources. Must succeed when no context is registered.
    async fn shutdown(&self, context: &TransportContext) -> Result<()>;

    /// Sends on behalf of the peer role recorded in `descriptor`.
    async fn send(&self, descriptor: &RoutingDescriptor, message: &Message) -> Result<()> {
        match descriptor.peer_role() {
            PeerRole::ConsumerSide => self.send_consumer_side(descriptor, message).await,
            PeerRole::ProviderSide => self.send_provider_side(descriptor, message).await,
        }
    }
}

/// Entry points a transport uses to hand inbound traffic to the gateway.
pub struct TransportContext {
    gateway_name: String,
    demultiplexer: Arc<InboundDemultiplexer>,
    submission_results: Arc<NotificationCorrelator>,
    relay_results: Arc<NotificationCorrelator>,
}

impl TransportContext {
    pub(crate) fn new(
        gateway_name: &str,
        demultiplexer: Arc<InboundDemultiplexer>,
        submission_results: Arc<NotificationCorrelator>,
        relay_results: Arc<NotificationCorrelator>,
    ) -> Self {
        Self {
            gateway_name: gateway_name.to_string(),
            demultiplexer,
            submission_results,
            relay_results,
        }
    }

    pub fn gateway_name(&self) -> &str {
        &self.gateway_name
    }

    /// Routes a parsed business delivery to the local request or response
    /// handler. Errors are handler failures the transport must turn into a
    /// protocol-level fault.
    pub async fn on_delivery(&self, delivery: InboundDelivery) -> Result<()> {
        self.demultiplexer.dispatch(delivery).await
    }

    /// Feeds an asynchronous acknowledgement into the correlator of its kind.
    pub async fn on_notification(&self, notification: Notification) -> Result<()> {
        match notification.kind() {
            NotificationKind::Submission => self.submission_results.deliver(notification).await,
            NotificationKind::Relay => self.relay_results.deliver(notification).await,
        }
    }
}

impl Debug for TransportContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportContext")
            .field("gateway_name", &self.gateway_name)
            .field("pending_submission_results", &self.submission_results.pending())
            .field("pending_relay_results", &self.relay_results.pending())
            .finish()
    }
}

/// Exactly-once holder for the context registered with a transport.
#[derive(Default)]
pub struct InboundRegistration {
    slot: Mutex<Option<Arc<TransportContext>>>,
}

impl InboundRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, transport_id: &str, context: Arc<TransportContext>) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(GatewayError::configuration(format!(
                "transport '{transport_id}' already has an inbound handler registered"
            )));
        }
        *slot = Some(context);
        Ok(())
    }

    pub fn current(&self) -> Option<Arc<TransportContext>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clears the slot. Releasing an empty slot is not an error.
    pub fn release(&self) -> Option<Arc<TransportContext>> {
        let released = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_none() {
            debug!(
                "{INBOUND_REGISTRATION_TAG}:{INBOUND_REGISTRATION_FN_RELEASE_TAG} nothing registered"
            );
        }
        released
    }

    pub fn is_registered(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
