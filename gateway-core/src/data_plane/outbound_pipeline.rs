//! FIFO hand-off queue between callers and the outbound worker.

use crate::api::transport::Transport;
use crate::data_plane::outbound_worker::OutboundWorker;
use crate::error::{GatewayError, Result};
use crate::model::Message;
use crate::observability::{events, fields};
use crate::routing::RoutingDescriptor;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const COMPONENT: &str = "outbound_pipeline";

/// Lifecycle of one message: `Queued -> Dispatched -> (Sent | Failed)`, or
/// `Queued -> Dropped` when a bounded shutdown gives up on the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Queued,
    Dispatched,
    Sent,
    Failed,
    Dropped,
}

impl Display for DispatchState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            DispatchState::Queued => "queued",
            DispatchState::Dispatched => "dispatched",
            DispatchState::Sent => "sent",
            DispatchState::Failed => "failed",
            DispatchState::Dropped => "dropped",
        };
        f.write_str(state)
    }
}

/// Point-in-time pipeline counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub enqueued: u64,
    pub sent: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl PipelineStats {
    /// Messages accepted but not yet accounted as sent, failed or dropped.
    pub fn in_flight(&self) -> u64 {
        self.enqueued
            .saturating_sub(self.sent + self.failed + self.dropped)
    }
}

#[derive(Default)]
pub(crate) struct PipelineCounters {
    enqueued: AtomicU64,
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl PipelineCounters {
    pub(crate) fn record(&self, state: DispatchState) {
        let counter = match state {
            DispatchState::Queued => &self.enqueued,
            DispatchState::Sent => &self.sent,
            DispatchState::Failed => &self.failed,
            DispatchState::Dropped => &self.dropped,
            DispatchState::Dispatched => return,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            enqueued: self.enqueued.load(Ordering::SeqCst),
            sent: self.sent.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
        }
    }
}

pub(crate) struct OutboundItem {
    pub(crate) sequence: u64,
    pub(crate) message: Message,
    pub(crate) descriptor: RoutingDescriptor,
}

struct WorkerSignals {
    abort: oneshot::Sender<()>,
    done: oneshot::Receiver<()>,
}

/// Single-worker outbound queue. Messages reach the transport in enqueue order.
pub struct OutboundPipeline {
    transport_id: String,
    intake: Mutex<Option<UnboundedSender<OutboundItem>>>,
    signals: tokio::sync::Mutex<Option<WorkerSignals>>,
    counters: Arc<PipelineCounters>,
    sequence: AtomicU64,
}

impl OutboundPipeline {
    /// Starts the worker that dispatches onto `transport`.
    pub fn start(transport: Arc<dyn Transport>) -> Result<Self> {
        let transport_id = transport.identifier().to_string();
        let (intake, receiver) = mpsc::unbounded_channel();
        let (abort_tx, abort_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let counters = Arc::new(PipelineCounters::default());

        OutboundWorker::spawn(transport, counters.clone(), receiver, abort_rx, done_tx).map_err(
            |err| {
                GatewayError::configuration(format!(
                    "unable to start outbound worker for '{transport_id}': {err}"
                ))
            },
        )?;

        Ok(Self {
            transport_id,
            intake: Mutex::new(Some(intake)),
            signals: tokio::sync::Mutex::new(Some(WorkerSignals {
                abort: abort_tx,
                done: done_rx,
            })),
            counters,
            sequence: AtomicU64::new(0),
        })
    }

    /// Queues `message` for `descriptor` without waiting on the network.
    pub fn enqueue(&self, message: Message, descriptor: RoutingDescriptor) -> Result<()> {
        message.head()?;

        let intake = self.intake.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(intake) = intake.as_ref() else {
            debug!(
                event = events::PIPELINE_REJECTED,
                component = COMPONENT,
                transport_id = %self.transport_id,
                msg_id = %fields::format_message_id(&message),
                "pipeline no longer accepts work"
            );
            return Err(GatewayError::Rejected(
                "outbound pipeline is shutting down".to_string(),
            ));
        };

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let msg_id = fields::format_message_id(&message);
        intake
            .send(OutboundItem {
                sequence,
                message,
                descriptor,
            })
            .map_err(|_| GatewayError::Rejected("outbound worker has stopped".to_string()))?;
        self.counters.record(DispatchState::Queued);

        debug!(
            event = events::PIPELINE_ENQUEUED,
            component = COMPONENT,
            transport_id = %self.transport_id,
            seq = sequence,
            msg_id = %msg_id,
            state = %DispatchState::Queued,
            "message queued"
        );
        Ok(())
    }

    pub fn is_accepting(&self) -> bool {
        self.intake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Stops intake and waits for the worker to drain the queue and exit.
    ///
    /// With a non-zero `drain_timeout`, messages still queued when it elapses
    /// are dropped and counted once the in-flight dispatch finishes. A zero
    /// timeout drains everything. Calling it again returns the final stats.
    pub async fn shutdown(&self, drain_timeout: Duration) -> PipelineStats {
        self.intake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let mut signals = self.signals.lock().await;
        if let Some(WorkerSignals { abort, mut done }) = signals.take() {
            if drain_timeout.is_zero() {
                let _ = done.await;
            } else if tokio::time::timeout(drain_timeout, &mut done).await.is_err() {
                warn!(
                    event = events::PIPELINE_SHUTDOWN,
                    component = COMPONENT,
                    transport_id = %self.transport_id,
                    drain_timeout_ms = drain_timeout.as_millis() as u64,
                    "drain timed out, dropping remaining messages"
                );
                let _ = abort.send(());
                let _ = done.await;
            }
        }

        let stats = self.stats();
        info!(
            event = events::PIPELINE_SHUTDOWN,
            component = COMPONENT,
            transport_id = %self.transport_id,
            enqueued = stats.enqueued,
            sent = stats.sent,
            failed = stats.failed,
            dropped = stats.dropped,
            "outbound pipeline stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::{OutboundPipeline, PipelineStats};
    use crate::api::transport::{Transport, TransportContext};
    use crate::error::{GatewayError, Result};
    use crate::model::{Message, Payload};
    use crate::routing::{Certificate, PeerRole, RoutingDescriptor};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Records the first payload id of every send; `slow` delays that id.
    struct OrderedTransport {
        sent: Mutex<Vec<String>>,
        slow: Option<(&'static str, Duration)>,
        failing: Option<&'static str>,
        panicking: Option<&'static str>,
    }

    impl OrderedTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                slow: None,
                failing: None,
                panicking: None,
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Transport for OrderedTransport {
        fn identifier(&self) -> &str {
            "ordered"
        }

        async fn register_inbound_handler(&self, _context: Arc<TransportContext>) -> Result<()> {
            Ok(())
        }

        async fn send_consumer_side(
            &self,
            _descriptor: &RoutingDescriptor,
            message: &Message,
        ) -> Result<()> {
            let id = message.head()?.id().to_string();
            if let Some((slow_id, delay)) = self.slow {
                if slow_id == id {
                    tokio::time::sleep(delay).await;
                }
            }
            if self.panicking == Some(id.as_str()) {
                panic!("malformed message {id}");
            }
            self.sent.lock().expect("lock").push(id.clone());
            if self.failing == Some(id.as_str()) {
                return Err(GatewayError::exchange("EBMS:0005", "connection refused"));
            }
            Ok(())
        }

        async fn send_provider_side(
            &self,
            descriptor: &RoutingDescriptor,
            message: &Message,
        ) -> Result<()> {
            self.send_consumer_side(descriptor, message).await
        }

        async fn shutdown(&self, _context: &TransportContext) -> Result<()> {
            Ok(())
        }
    }

    fn descriptor() -> RoutingDescriptor {
        RoutingDescriptor::builder()
            .sender_id("9915:sender")
            .endpoint_url("https://gw.example.org/as4")
            .document_type_id("urn:doc")
            .process_id("urn:process")
            .transport_profile_id("profile")
            .peer_role(PeerRole::ConsumerSide)
            .certificate(Certificate::from_der(vec![0x30]).expect("der"))
            .build()
            .expect("descriptor")
    }

    fn message(id: &str) -> Message {
        Message::new().with_payload(
            Payload::with_id(id, "application/xml", b"<a/>".to_vec()).expect("payload"),
        )
    }

    #[tokio::test]
    async fn slow_head_does_not_reorder_queue() {
        let transport = Arc::new(OrderedTransport {
            slow: Some(("A", Duration::from_millis(150))),
            ..OrderedTransport::new()
        });
        let pipeline = OutboundPipeline::start(transport.clone()).expect("pipeline");

        for id in ["A", "B", "C"] {
            pipeline.enqueue(message(id), descriptor()).expect("enqueue");
        }
        let stats = pipeline.shutdown(Duration::ZERO).await;

        assert_eq!(transport.sent(), vec!["A", "B", "C"]);
        assert_eq!(
            stats,
            PipelineStats {
                enqueued: 3,
                sent: 3,
                failed: 0,
                dropped: 0
            }
        );
    }

    #[tokio::test]
    async fn failed_send_does_not_stop_worker() {
        let transport = Arc::new(OrderedTransport {
            failing: Some("B"),
            ..OrderedTransport::new()
        });
        let pipeline = OutboundPipeline::start(transport.clone()).expect("pipeline");

        for id in ["A", "B", "C"] {
            pipeline.enqueue(message(id), descriptor()).expect("enqueue");
        }
        let stats = pipeline.shutdown(Duration::ZERO).await;

        assert_eq!(transport.sent(), vec!["A", "B", "C"]);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.sent, 2);
    }

    #[tokio::test]
    async fn panicking_send_is_counted_and_worker_keeps_going() {
        let transport = Arc::new(OrderedTransport {
            panicking: Some("B"),
            ..OrderedTransport::new()
        });
        let pipeline = OutboundPipeline::start(transport.clone()).expect("pipeline");

        for id in ["A", "B", "C"] {
            pipeline.enqueue(message(id), descriptor()).expect("enqueue");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        pipeline
            .enqueue(message("D"), descriptor())
            .expect("worker still accepts work");
        let stats = pipeline.shutdown(Duration::ZERO).await;

        assert_eq!(transport.sent(), vec!["A", "C", "D"]);
        assert_eq!(
            stats,
            PipelineStats {
                enqueued: 4,
                sent: 3,
                failed: 1,
                dropped: 0
            }
        );
        assert_eq!(stats.in_flight(), 0);
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_is_rejected() {
        let pipeline =
            OutboundPipeline::start(Arc::new(OrderedTransport::new())).expect("pipeline");
        pipeline.shutdown(Duration::ZERO).await;

        assert!(!pipeline.is_accepting());
        assert!(matches!(
            pipeline.enqueue(message("late"), descriptor()),
            Err(GatewayError::Rejected(_))
        ));
        assert_eq!(pipeline.shutdown(Duration::ZERO).await.enqueued, 0);
    }

    #[tokio::test]
    async fn empty_message_is_refused_at_intake() {
        let pipeline =
            OutboundPipeline::start(Arc::new(OrderedTransport::new())).expect("pipeline");

        assert!(matches!(
            pipeline.enqueue(Message::new(), descriptor()),
            Err(GatewayError::NoPayload)
        ));
        assert_eq!(pipeline.stats().enqueued, 0);
        pipeline.shutdown(Duration::ZERO).await;
    }

    #[tokio::test]
    async fn bounded_shutdown_accounts_for_every_message() {
        let transport = Arc::new(OrderedTransport {
            slow: Some(("A", Duration::from_millis(300))),
            ..OrderedTransport::new()
        });
        let pipeline = OutboundPipeline::start(transport.clone()).expect("pipeline");

        for id in ["A", "B", "C"] {
            pipeline.enqueue(message(id), descriptor()).expect("enqueue");
        }
        let stats = pipeline.shutdown(Duration::from_millis(50)).await;

        // A was in flight and completes; B and C are dropped
        assert_eq!(transport.sent(), vec!["A"]);
        assert_eq!(stats.sent, 1);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.in_flight(), 0);
    }
}
