//! In-memory transport that records every send in dispatch order.

use async_trait::async_trait;
use futures::future::join_all;
use gateway_core::{
    GatewayError, InboundDelivery, InboundRegistration, Message, Notification, PeerRole, Result,
    RoutingDescriptor, Transport, TransportContext,
};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

const RECORDING_TRANSPORT_TAG: &str = "RecordingTransport:";
const RECORDING_TRANSPORT_FN_SEND_TAG: &str = "send():";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedSend {
    pub message_id: String,
    pub peer_role: PeerRole,
    pub endpoint_url: String,
    pub payloads: usize,
}

#[derive(Default)]
struct Faults {
    delays: HashMap<String, Duration>,
    failures: HashMap<String, String>,
    max_jitter: Option<Duration>,
}

/// Transport double for integration tests.
///
/// Sends are keyed by the id of the message head payload, which is also the
/// id used for delay and failure injection.
pub struct RecordingTransport {
    id: String,
    sends: Mutex<Vec<RecordedSend>>,
    faults: Mutex<Faults>,
    attempted: Mutex<HashSet<String>>,
    inbound: InboundRegistration,
    shutdowns: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            sends: Mutex::new(Vec::new()),
            faults: Mutex::new(Faults::default()),
            attempted: Mutex::new(HashSet::new()),
            inbound: InboundRegistration::new(),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// Holds the send of `message_id` for `delay` before recording it.
    pub fn delay_message(&self, message_id: &str, delay: Duration) {
        self.faults
            .lock()
            .expect("faults lock")
            .delays
            .insert(message_id.to_string(), delay);
    }

    /// Makes the send of `message_id` fail with an exchange error carrying `code`.
    pub fn fail_message(&self, message_id: &str, code: &str) {
        self.faults
            .lock()
            .expect("faults lock")
            .failures
            .insert(message_id.to_string(), code.to_string());
    }

    /// Adds a random delay of up to `max_jitter` to every send.
    pub fn with_jitter(self, max_jitter: Duration) -> Self {
        self.faults.lock().expect("faults lock").max_jitter = Some(max_jitter);
        self
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().expect("sends lock").clone()
    }

    pub fn sent_ids(&self) -> Vec<String> {
        self.sends()
            .into_iter()
            .map(|send| send.message_id)
            .collect()
    }

    /// Whether a send of `message_id` was attempted, successful or not.
    pub fn attempted(&self, message_id: &str) -> bool {
        self.attempted
            .lock()
            .expect("attempted lock")
            .contains(message_id)
    }

    /// Polls until `count` sends were recorded or `timeout` elapses.
    pub async fn wait_for_sends(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.sends.lock().expect("sends lock").len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.sends.lock().expect("sends lock").len() >= count
    }

    pub fn is_registered(&self) -> bool {
        self.inbound.is_registered()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn context(&self) -> Result<Arc<TransportContext>> {
        self.inbound.current().ok_or_else(|| {
            GatewayError::configuration(format!("transport '{}' has no inbound handler", self.id))
        })
    }

    /// Feeds `delivery` into the registered gateway as if it arrived on the wire.
    pub async fn push_delivery(&self, delivery: InboundDelivery) -> Result<()> {
        self.context()?.on_delivery(delivery).await
    }

    pub async fn push_notification(&self, notification: Notification) -> Result<()> {
        self.context()?.on_notification(notification).await
    }

    /// Pushes all `notifications` concurrently.
    pub async fn push_notifications(&self, notifications: Vec<Notification>) -> Vec<Result<()>> {
        let context = match self.context() {
            Ok(context) => context,
            Err(err) => return vec![Err(err)],
        };
        join_all(
            notifications
                .into_iter()
                .map(|notification| context.on_notification(notification)),
        )
        .await
    }

    async fn record(
        &self,
        peer_role: PeerRole,
        descriptor: &RoutingDescriptor,
        message: &Message,
    ) -> Result<()> {
        let message_id = message.head()?.id().to_string();
        self.attempted
            .lock()
            .expect("attempted lock")
            .insert(message_id.clone());

        let (delay, failure) = {
            let faults = self.faults.lock().expect("faults lock");
            let jitter = faults
                .max_jitter
                .map(|max| rand::thread_rng().gen_range(Duration::ZERO..=max))
                .unwrap_or_default();
            let delay = faults.delays.get(&message_id).copied().unwrap_or_default() + jitter;
            (delay, faults.failures.get(&message_id).cloned())
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(code) = failure {
            debug!(
                "{RECORDING_TRANSPORT_TAG}:{RECORDING_TRANSPORT_FN_SEND_TAG} failing {message_id} with {code}"
            );
            return Err(GatewayError::exchange(code, format!("injected failure for {message_id}")));
        }

        debug!(
            "{RECORDING_TRANSPORT_TAG}:{RECORDING_TRANSPORT_FN_SEND_TAG} recorded {message_id} as {peer_role}"
        );
        self.sends.lock().expect("sends lock").push(RecordedSend {
            message_id,
            peer_role,
            endpoint_url: descriptor.endpoint_url().to_string(),
            payloads: message.len(),
        });
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn identifier(&self) -> &str {
        &self.id
    }

    async fn register_inbound_handler(&self, context: Arc<TransportContext>) -> Result<()> {
        self.inbound.register(&self.id, context)
    }

    async fn send_consumer_side(
        &self,
        descriptor: &RoutingDescriptor,
        message: &Message,
    ) -> Result<()> {
        self.record(PeerRole::ConsumerSide, descriptor, message).await
    }

    async fn send_provider_side(
        &self,
        descriptor: &RoutingDescriptor,
        message: &Message,
    ) -> Result<()> {
        self.record(PeerRole::ProviderSide, descriptor, message).await
    }

    async fn shutdown(&self, _context: &TransportContext) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.inbound.release();
        Ok(())
    }
}
