//! Message identifiers and the header fields the classifier reads

use serde::Serialize;
use std::fmt;

/// Opaque per-folder identifier of a message (an IMAP UID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sender and subject of a fetched message.
///
/// A header that is missing, or present but blank, is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessageHeaders {
    pub sender: Option<String>,
    pub subject: Option<String>,
}

impl MessageHeaders {
    #[must_use]
    pub fn new(sender: Option<String>, subject: Option<String>) -> Self {
        Self {
            sender: sender.filter(|s| !s.trim().is_empty()),
            subject: subject.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Both headers, if both are present.
    #[must_use]
    pub fn complete(&self) -> Option<(&str, &str)> {
        Some((self.sender.as_deref()?, self.subject.as_deref()?))
    }
}

/// The label assigned to one message. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub message: MessageId,
    pub label: String,
}
