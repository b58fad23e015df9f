use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Message fields selected for listings.
pub const MESSAGE_SELECT: &str = "id,subject,from,receivedDateTime,isRead,hasAttachments";

/// One message in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<Recipient>,
    #[serde(default)]
    pub received_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub has_attachments: bool,
}

impl MessageSummary {
    /// Sender address, or its display name when no address is present.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        let email = &self.from.as_ref()?.email_address;
        email.address.as_deref().or(email.name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Collection envelope (`{"value": [...]}`).
#[derive(Debug, Deserialize)]
pub(crate) struct MessagePage {
    #[serde(default)]
    pub value: Vec<MessageSummary>,
}

/// Error envelope (`{"error": {"code": ..., "message": ...}}`).
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_graph_message() {
        let json = r#"{
            "id": "AAMkAD",
            "subject": "Quarterly report",
            "from": {"emailAddress": {"name": "Ada", "address": "ada@example.com"}},
            "receivedDateTime": "2026-04-02T09:15:00Z",
            "isRead": false,
            "hasAttachments": true
        }"#;

        let message: MessageSummary = serde_json::from_str(json).unwrap();
        assert_eq!(message.sender(), Some("ada@example.com"));
        assert!(message.has_attachments);
        assert!(!message.is_read);
        assert!(message.received_date_time.is_some());
    }

    #[test]
    fn test_missing_fields_default() {
        let message: MessageSummary = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert_eq!(message.subject, None);
        assert_eq!(message.sender(), None);
    }
}
