//! Outbound worker that drains the pipeline queue onto the selected transport.

use crate::api::transport::Transport;
use crate::data_plane::outbound_pipeline::{DispatchState, OutboundItem, PipelineCounters};
use crate::observability::{events, fields};
use crate::runtime::worker_runtime::spawn_worker_thread;
use futures::FutureExt;
use std::any::Any;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

const OUTBOUND_WORKER_TAG: &str = "OutboundWorker:";
const OUTBOUND_WORKER_FN_DISPATCH_LOOP_TAG: &str = "dispatch_loop():";

const COMPONENT: &str = "outbound_worker";

pub(crate) struct OutboundWorker {
    transport: Arc<dyn Transport>,
    counters: Arc<PipelineCounters>,
}

impl OutboundWorker {
    /// Starts the worker thread. `abort` makes the worker drop whatever is
    /// still queued once the in-flight dispatch completes; `done` fires when
    /// the loop has exited.
    pub(crate) fn spawn(
        transport: Arc<dyn Transport>,
        counters: Arc<PipelineCounters>,
        receiver: UnboundedReceiver<OutboundItem>,
        abort: oneshot::Receiver<()>,
        done: oneshot::Sender<()>,
    ) -> io::Result<()> {
        let thread_name = format!("outbound-{}", transport.identifier());
        let worker = Self {
            transport,
            counters,
        };

        spawn_worker_thread(&thread_name, move || async move {
            trace!(
                "{OUTBOUND_WORKER_TAG}:{OUTBOUND_WORKER_FN_DISPATCH_LOOP_TAG} within worker runtime"
            );
            worker.dispatch_loop(receiver, abort).await;
            let _ = done.send(());
        })?;
        Ok(())
    }

    async fn dispatch_loop(
        &self,
        mut receiver: UnboundedReceiver<OutboundItem>,
        mut abort: oneshot::Receiver<()>,
    ) {
        let transport_id = self.transport.identifier();
        let mut abort_armed = true;

        loop {
            tokio::select! {
                biased;
                signal = &mut abort, if abort_armed => {
                    if signal.is_err() {
                        // pipeline dropped its handle; keep draining
                        abort_armed = false;
                        continue;
                    }
                    receiver.close();
                    while let Ok(item) = receiver.try_recv() {
                        self.counters.record(DispatchState::Dropped);
                        warn!(
                            event = events::PIPELINE_SHUTDOWN,
                            component = COMPONENT,
                            transport_id,
                            seq = item.sequence,
                            msg_id = %fields::format_message_id(&item.message),
                            state = %DispatchState::Dropped,
                            "dropping queued message on shutdown"
                        );
                    }
                    break;
                }
                next = receiver.recv() => match next {
                    Some(item) => self.dispatch(transport_id, item).await,
                    None => break,
                },
            }
        }

        info!(
            event = events::PIPELINE_WORKER_STOPPED,
            component = COMPONENT,
            transport_id,
            "outbound worker stopped"
        );
    }

    async fn dispatch(&self, transport_id: &str, item: OutboundItem) {
        let msg_id = fields::format_message_id(&item.message);

        debug!(
            event = events::PIPELINE_DISPATCHED,
            component = COMPONENT,
            transport_id,
            seq = item.sequence,
            msg_id = %msg_id,
            route = %fields::format_route(&item.descriptor),
            peer_role = %item.descriptor.peer_role(),
            state = %DispatchState::Dispatched,
            "dispatching message"
        );

        let sent = AssertUnwindSafe(self.transport.send(&item.descriptor, &item.message))
            .catch_unwind()
            .await;

        match sent {
            Ok(Ok(())) => {
                self.counters.record(DispatchState::Sent);
                debug!(
                    event = events::PIPELINE_SEND_OK,
                    component = COMPONENT,
                    transport_id,
                    seq = item.sequence,
                    msg_id = %msg_id,
                    state = %DispatchState::Sent,
                    "transport accepted message"
                );
            }
            Ok(Err(err)) => {
                // no retry; the caller owns any re-submission policy
                self.counters.record(DispatchState::Failed);
                warn!(
                    event = events::PIPELINE_SEND_FAILED,
                    component = COMPONENT,
                    transport_id,
                    seq = item.sequence,
                    msg_id = %msg_id,
                    code = err.exchange_code().unwrap_or("-"),
                    err = %err,
                    state = %DispatchState::Failed,
                    "sending on transport failed"
                );
            }
            Err(panic) => {
                self.counters.record(DispatchState::Failed);
                warn!(
                    event = events::PIPELINE_SEND_FAILED,
                    component = COMPONENT,
                    transport_id,
                    seq = item.sequence,
                    msg_id = %msg_id,
                    panic = panic_message(panic.as_ref()),
                    state = %DispatchState::Failed,
                    "transport panicked while sending"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
