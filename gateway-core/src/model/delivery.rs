//! Parsed inbound deliveries, already unpacked from their transport envelope.

use crate::model::Payload;
use std::fmt::{Display, Formatter};

/// Classification of a business document as seen by the demultiplexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentClass {
    Request,
    Response,
    /// Anything the gateway does not route, with the raw classifier for logging.
    Other(String),
}

impl Display for DocumentClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentClass::Request => write!(f, "request"),
            DocumentClass::Response => write!(f, "response"),
            DocumentClass::Other(raw) => write!(f, "other({raw})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusinessDocument {
    pub document_type_id: String,
    pub class: DocumentClass,
    pub body: Vec<u8>,
    /// Payload ids of attachments the document refers to.
    pub attachment_refs: Vec<String>,
}

impl BusinessDocument {
    pub fn new(document_type_id: impl Into<String>, class: DocumentClass, body: Vec<u8>) -> Self {
        Self {
            document_type_id: document_type_id.into(),
            class,
            body,
            attachment_refs: Vec::new(),
        }
    }

    pub fn referencing(mut self, attachment_id: impl Into<String>) -> Self {
        self.attachment_refs.push(attachment_id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundDelivery {
    pub sender_id: String,
    pub document: BusinessDocument,
    pub attachments: Vec<Payload>,
}

impl InboundDelivery {
    pub fn new(sender_id: impl Into<String>, document: BusinessDocument) -> Self {
        Self {
            sender_id: sender_id.into(),
            document,
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Payload) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// First attachment reference with no matching attachment in this delivery.
    pub fn missing_attachment(&self) -> Option<&str> {
        self.document
            .attachment_refs
            .iter()
            .find(|reference| !self.attachments.iter().any(|a| a.id() == reference.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::{BusinessDocument, DocumentClass, InboundDelivery};
    use crate::model::Payload;

    #[test]
    fn missing_attachment_reports_first_unresolved_reference() {
        let document = BusinessDocument::new("doc-type", DocumentClass::Response, Vec::new())
            .referencing("att-1")
            .referencing("att-2");
        let delivery = InboundDelivery::new("sender", document).with_attachment(
            Payload::with_id("att-1", "application/pdf", vec![0u8; 4]).expect("valid"),
        );

        assert_eq!(delivery.missing_attachment(), Some("att-2"));
    }

    #[test]
    fn unreferenced_delivery_needs_no_attachments() {
        let document = BusinessDocument::new("doc-type", DocumentClass::Request, Vec::new());
        assert_eq!(InboundDelivery::new("sender", document).missing_attachment(), None);
    }
}
