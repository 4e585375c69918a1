//! Ordered collection of payloads handed to the outbound pipeline as one unit.

use crate::error::{GatewayError, Result};
use crate::model::Payload;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    payloads: Vec<Payload>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append used while assembling a message.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payloads.push(payload);
        self
    }

    pub fn push(&mut self, payload: Payload) {
        self.payloads.push(payload);
    }

    /// The first payload added, which carries the business document.
    pub fn head(&self) -> Result<&Payload> {
        self.payloads.first().ok_or(GatewayError::NoPayload)
    }

    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl FromIterator<Payload> for Message {
    fn from_iter<T: IntoIterator<Item = Payload>>(iter: T) -> Self {
        Self {
            payloads: iter.into_iter().collect(),
        }
    }
}
