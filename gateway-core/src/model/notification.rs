//! Out-of-band acknowledgements describing the fate of a previously sent message.

use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// How long an unclaimed notification is retained.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5 * 60);

/// The two acknowledgement levels of the four-corner model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// The sending gateway accepted the message for relay.
    Submission,
    /// The receiving gateway relayed the message to its recipient.
    Relay,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Submission => write!(f, "submission"),
            NotificationKind::Relay => write!(f, "relay"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationResult {
    Receipt,
    Error { code: String },
}

impl Display for NotificationResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationResult::Receipt => write!(f, "receipt"),
            NotificationResult::Error { code } => write!(f, "error({code})"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    kind: NotificationKind,
    message_id: String,
    ref_to_message_id: String,
    result: NotificationResult,
    description: String,
    created: DateTime<Utc>,
}

impl Notification {
    pub fn receipt(
        kind: NotificationKind,
        message_id: impl Into<String>,
        ref_to_message_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            kind,
            message_id,
            ref_to_message_id,
            NotificationResult::Receipt,
            description,
        )
    }

    pub fn error(
        kind: NotificationKind,
        message_id: impl Into<String>,
        ref_to_message_id: impl Into<String>,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(
            kind,
            message_id,
            ref_to_message_id,
            NotificationResult::Error { code: code.into() },
            description,
        )
    }

    fn new(
        kind: NotificationKind,
        message_id: impl Into<String>,
        ref_to_message_id: impl Into<String>,
        result: NotificationResult,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message_id: message_id.into(),
            ref_to_message_id: ref_to_message_id.into(),
            result,
            description: description.into(),
            created: Utc::now(),
        }
    }

    /// Overrides the creation time, for replayed or transport-stamped notifications.
    pub fn created_at(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Identifier of the submitted message this notification answers.
    pub fn ref_to_message_id(&self) -> &str {
        &self.ref_to_message_id
    }

    pub fn result(&self) -> &NotificationResult {
        &self.result
    }

    pub fn is_receipt(&self) -> bool {
        self.result == NotificationResult::Receipt
    }

    pub fn error_code(&self) -> Option<&str> {
        match &self.result {
            NotificationResult::Receipt => None,
            NotificationResult::Error { code } => Some(code),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_older_than(now, NOTIFICATION_TTL)
    }

    pub fn is_older_than(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.created) > ttl,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Notification, NotificationKind, NotificationResult, NOTIFICATION_TTL};
    use chrono::{Duration, Utc};

    #[test]
    fn error_code_present_only_for_errors() {
        let receipt = Notification::receipt(NotificationKind::Submission, "n1", "m1", "ok");
        let error = Notification::error(NotificationKind::Relay, "n2", "m1", "EBMS:0301", "lost");

        assert!(receipt.is_receipt());
        assert_eq!(receipt.error_code(), None);
        assert_eq!(error.error_code(), Some("EBMS:0301"));
        assert_eq!(
            error.result(),
            &NotificationResult::Error {
                code: "EBMS:0301".to_string()
            }
        );
    }

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let created = Utc::now();
        let notification = Notification::receipt(NotificationKind::Submission, "n1", "m1", "ok")
            .created_at(created);
        let ttl = Duration::from_std(NOTIFICATION_TTL).expect("ttl fits");

        assert!(!notification.is_expired(created));
        assert!(!notification.is_expired(created + ttl));
        assert!(notification.is_expired(created + ttl + Duration::milliseconds(1)));
    }
}
