//! Inbound demultiplexer that routes parsed deliveries to local handlers.

use crate::error::{Direction, GatewayError, Result};
use crate::model::{DocumentClass, InboundDelivery};
use crate::observability::events;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

const COMPONENT: &str = "inbound_demux";

/// Local handler for newly submitted requests (provider-side path).
#[async_trait]
pub trait IncomingRequestHandler: Send + Sync {
    async fn handle_incoming_request(&self, delivery: InboundDelivery) -> Result<()>;
}

/// Local handler for answers to previously sent requests (consumer-side path).
#[async_trait]
pub trait IncomingResponseHandler: Send + Sync {
    async fn handle_incoming_response(&self, delivery: InboundDelivery) -> Result<()>;
}

#[derive(Default)]
pub struct InboundDemultiplexer {
    request_handler: OnceLock<Arc<dyn IncomingRequestHandler>>,
    response_handler: OnceLock<Arc<dyn IncomingResponseHandler>>,
}

impl InboundDemultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_request_handler(&self, handler: Arc<dyn IncomingRequestHandler>) -> Result<()> {
        self.request_handler.set(handler).map_err(|_| {
            GatewayError::configuration("incoming request handler already registered")
        })
    }

    pub fn register_response_handler(
        &self,
        handler: Arc<dyn IncomingResponseHandler>,
    ) -> Result<()> {
        self.response_handler.set(handler).map_err(|_| {
            GatewayError::configuration("incoming response handler already registered")
        })
    }

    /// Forwards `delivery` to the handler matching its document class.
    ///
    /// Unclassifiable or incomplete deliveries are logged and dropped with
    /// `Ok(())`. Only a failing handler produces an error, tagged with the
    /// direction it was routed to.
    pub async fn dispatch(&self, delivery: InboundDelivery) -> Result<()> {
        let sender_id = delivery.sender_id.clone();
        let document_type_id = delivery.document.document_type_id.clone();

        debug!(
            event = events::INBOUND_RECEIVE,
            component = COMPONENT,
            sender_id = %sender_id,
            document_type_id = %document_type_id,
            class = %delivery.document.class,
            attachments = delivery.attachments.len(),
            "received inbound delivery"
        );

        if let Some(missing) = delivery.missing_attachment() {
            let err = GatewayError::Classification(format!(
                "document references attachment '{missing}' which was not delivered"
            ));
            error!(
                event = events::INBOUND_DROP_MISSING_ATTACHMENT,
                component = COMPONENT,
                sender_id = %sender_id,
                document_type_id = %document_type_id,
                err = %err,
                "dropping incomplete delivery"
            );
            return Ok(());
        }

        let direction = match &delivery.document.class {
            DocumentClass::Response => Direction::IncomingResponse,
            DocumentClass::Request => Direction::IncomingRequest,
            DocumentClass::Other(raw) => {
                let err = GatewayError::Classification(format!(
                    "document class '{raw}' is neither request nor response"
                ));
                error!(
                    event = events::INBOUND_DROP_UNCLASSIFIED,
                    component = COMPONENT,
                    sender_id = %sender_id,
                    document_type_id = %document_type_id,
                    err = %err,
                    "dropping unclassifiable delivery"
                );
                return Ok(());
            }
        };

        let outcome = match direction {
            Direction::IncomingResponse => match self.response_handler.get() {
                Some(handler) => handler.handle_incoming_response(delivery).await,
                None => return Self::drop_without_handler(direction, &sender_id),
            },
            Direction::IncomingRequest => match self.request_handler.get() {
                Some(handler) => handler.handle_incoming_request(delivery).await,
                None => return Self::drop_without_handler(direction, &sender_id),
            },
        };

        outcome.map_err(|source| {
            warn!(
                event = events::INBOUND_HANDLER_FAILED,
                component = COMPONENT,
                direction = %direction,
                sender_id = %sender_id,
                err = %source,
                "inbound handler failed"
            );
            GatewayError::Handler {
                direction,
                source: Box::new(source),
            }
        })
    }

    fn drop_without_handler(direction: Direction, sender_id: &str) -> Result<()> {
        error!(
            event = events::INBOUND_DROP_NO_HANDLER,
            component = COMPONENT,
            direction = %direction,
            sender_id,
            "no handler registered, dropping delivery"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{IncomingRequestHandler, IncomingResponseHandler, InboundDemultiplexer};
    use crate::error::{Direction, GatewayError, Result};
    use crate::model::{BusinessDocument, DocumentClass, InboundDelivery, Payload};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingHandler {
        requests: AtomicUsize,
        responses: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl IncomingRequestHandler for CountingHandler {
        async fn handle_incoming_request(&self, _delivery: InboundDelivery) -> Result<()> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GatewayError::exchange("EBMS:0004", "request rejected"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl IncomingResponseHandler for CountingHandler {
        async fn handle_incoming_response(&self, _delivery: InboundDelivery) -> Result<()> {
            self.responses.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn demux_with(handler: &Arc<CountingHandler>) -> InboundDemultiplexer {
        let demux = InboundDemultiplexer::new();
        demux
            .register_request_handler(handler.clone())
            .expect("request handler");
        demux
            .register_response_handler(handler.clone())
            .expect("response handler");
        demux
    }

    fn delivery(class: DocumentClass) -> InboundDelivery {
        InboundDelivery::new(
            "9915:sender",
            BusinessDocument::new("urn:doc", class, b"<Doc/>".to_vec()),
        )
    }

    #[tokio::test]
    async fn response_reaches_only_response_handler() {
        let handler = Arc::new(CountingHandler::default());
        let demux = demux_with(&handler);

        demux
            .dispatch(delivery(DocumentClass::Response))
            .await
            .expect("dispatch");

        assert_eq!(handler.responses.load(Ordering::SeqCst), 1);
        assert_eq!(handler.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unclassified_and_incomplete_deliveries_are_dropped() {
        let handler = Arc::new(CountingHandler::default());
        let demux = demux_with(&handler);

        demux
            .dispatch(delivery(DocumentClass::Other("Notice".to_string())))
            .await
            .expect("dropped, not failed");

        let mut incomplete = delivery(DocumentClass::Request);
        incomplete.document.attachment_refs.push("att-1".to_string());
        demux.dispatch(incomplete).await.expect("dropped, not failed");

        assert_eq!(handler.requests.load(Ordering::SeqCst), 0);
        assert_eq!(handler.responses.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn referenced_attachment_present_is_forwarded() {
        let handler = Arc::new(CountingHandler::default());
        let demux = demux_with(&handler);

        let attachment =
            Payload::with_id("att-1", "application/pdf", vec![1, 2, 3]).expect("valid");
        let mut complete = delivery(DocumentClass::Request).with_attachment(attachment);
        complete.document.attachment_refs.push("att-1".to_string());

        demux.dispatch(complete).await.expect("dispatch");
        assert_eq!(handler.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_failure_is_tagged_with_direction() {
        let handler = Arc::new(CountingHandler {
            fail: true,
            ..Default::default()
        });
        let demux = demux_with(&handler);

        let err = demux
            .dispatch(delivery(DocumentClass::Request))
            .await
            .unwrap_err();

        match err {
            GatewayError::Handler { direction, source } => {
                assert_eq!(direction, Direction::IncomingRequest);
                assert_eq!(source.exchange_code(), Some("EBMS:0004"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_registration_is_rejected() {
        let handler = Arc::new(CountingHandler::default());
        let demux = demux_with(&handler);

        assert!(demux
            .register_request_handler(handler.clone())
            .unwrap_err()
            .is_fatal());
        assert!(demux
            .register_response_handler(handler)
            .unwrap_err()
            .is_fatal());
    }
}
