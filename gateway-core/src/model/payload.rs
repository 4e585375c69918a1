//! One deliverable unit of content.

use crate::error::{GatewayError, Result};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// A named, typed chunk of opaque content.
///
/// The content is shared behind an [`Arc`], so a transport can clone a payload
/// cheaply but can never mutate what the sender assembled.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    id: String,
    mime_type: String,
    content: Arc<[u8]>,
}

impl Payload {
    /// Creates a payload with a freshly generated identifier.
    pub fn new(mime_type: impl Into<String>, content: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_id(generate_payload_id(), mime_type, content)
    }

    /// Creates a payload with a caller-chosen identifier.
    pub fn with_id(
        id: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let id = id.into();
        let mime_type = mime_type.into();

        if id.trim().is_empty() {
            return Err(GatewayError::invalid_argument("payload id must not be empty"));
        }
        if mime_type.trim().is_empty() {
            return Err(GatewayError::invalid_argument(
                "payload mime type must not be empty",
            ));
        }

        Ok(Self {
            id,
            mime_type,
            content: Arc::from(content.into()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Generated identifiers are lowercase hyphenated UUID v4 tokens.
pub fn generate_payload_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Checks that `id` has the shape produced by [`generate_payload_id`].
pub fn is_generated_payload_id(id: &str) -> bool {
    id.len() == 36
        && id == id.to_ascii_lowercase()
        && Uuid::try_parse(id)
            .map(|uuid| uuid.get_version_num() == 4)
            .unwrap_or(false)
}
