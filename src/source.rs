//! The mail source the poll loop reads from

use crate::error::Result;
use crate::message::{MessageHeaders, MessageId};
use async_trait::async_trait;

/// Access to an unread-message queue.
///
/// Authentication and session lifetime belong to the implementation;
/// the poll loop only sees these three calls.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Identifiers of unread messages, in processing order. May be a
    /// bounded page rather than the whole queue.
    async fn list_unread(&self) -> Result<Vec<MessageId>>;

    /// Sender and subject of one message. Fetching must not change its
    /// read state.
    async fn get_message(&self, id: MessageId) -> Result<MessageHeaders>;

    /// Flip the message from unread to read.
    async fn mark_read(&self, id: MessageId) -> Result<()>;
}
