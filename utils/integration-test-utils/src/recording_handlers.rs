//! Inbound handlers and notification listeners that collect what they receive.

use async_trait::async_trait;
use gateway_core::{
    GatewayError, IncomingRequestHandler, IncomingResponseHandler, InboundDelivery, Notification,
    NotificationListener, Result,
};
use std::sync::Mutex;

/// Collects requests and responses separately; can be told to fail requests.
#[derive(Default)]
pub struct RecordingHandler {
    requests: Mutex<Vec<InboundDelivery>>,
    responses: Mutex<Vec<InboundDelivery>>,
    request_failure: Option<String>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler whose request path fails with an exchange error carrying `code`.
    pub fn failing_requests(code: &str) -> Self {
        Self {
            request_failure: Some(code.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<InboundDelivery> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn responses(&self) -> Vec<InboundDelivery> {
        self.responses.lock().expect("responses lock").clone()
    }
}

#[async_trait]
impl IncomingRequestHandler for RecordingHandler {
    async fn handle_incoming_request(&self, delivery: InboundDelivery) -> Result<()> {
        self.requests.lock().expect("requests lock").push(delivery);
        match &self.request_failure {
            Some(code) => Err(GatewayError::exchange(code.clone(), "request handler refused")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IncomingResponseHandler for RecordingHandler {
    async fn handle_incoming_response(&self, delivery: InboundDelivery) -> Result<()> {
        self.responses.lock().expect("responses lock").push(delivery);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingListener {
    received: Mutex<Vec<Notification>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<Notification> {
        self.received.lock().expect("listener lock").clone()
    }
}

#[async_trait]
impl NotificationListener for RecordingListener {
    async fn on_notification(&self, notification: Notification) {
        self.received.lock().expect("listener lock").push(notification);
    }
}
