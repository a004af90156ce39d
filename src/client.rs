//! IMAP-backed mail source

use crate::config::ImapConfig;
use crate::connection::{ImapSession, connect, logout, select};
use crate::error::{Error, Result};
use crate::message::{MessageHeaders, MessageId};
use crate::source::MailSource;
use async_trait::async_trait;
use futures::StreamExt;
use mail_parser::MessageParser;
use tracing::{debug, info};

/// Mail source that reads unseen messages from one IMAP folder.
///
/// Every call opens its own session and logs out afterwards, so a
/// dropped connection never outlives a single poll step.
pub struct ImapMailSource {
    config: ImapConfig,
    batch_size: usize,
}

impl ImapMailSource {
    #[must_use]
    pub const fn new(config: ImapConfig, batch_size: usize) -> Self {
        Self { config, batch_size }
    }

    #[must_use]
    pub fn folder(&self) -> &str {
        &self.config.folder
    }

    async fn open(&self) -> Result<ImapSession> {
        let mut session = connect(&self.config).await?;
        if let Err(e) = select(&mut session, &self.config.folder).await {
            logout(session).await;
            return Err(e);
        }
        Ok(session)
    }
}

#[async_trait]
impl MailSource for ImapMailSource {
    /// `UID SEARCH UNSEEN`, oldest first, truncated to the batch size.
    async fn list_unread(&self) -> Result<Vec<MessageId>> {
        let mut session = self.open().await?;

        let result = session
            .uid_search("UNSEEN")
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")));
        logout(session).await;

        let mut uids: Vec<u32> = result?.into_iter().collect();
        uids.sort_unstable();
        if uids.len() > self.batch_size {
            info!(
                "{} unseen messages in {}, taking the first {}",
                uids.len(),
                self.config.folder,
                self.batch_size
            );
            uids.truncate(self.batch_size);
        }

        Ok(uids.into_iter().map(MessageId).collect())
    }

    /// `UID FETCH (BODY.PEEK[])` so the fetch itself leaves `\Seen`
    /// untouched.
    async fn get_message(&self, id: MessageId) -> Result<MessageHeaders> {
        let mut session = self.open().await?;
        let result = fetch_headers(&mut session, id).await;
        logout(session).await;
        result
    }

    /// `UID STORE +FLAGS (\Seen)`.
    async fn mark_read(&self, id: MessageId) -> Result<()> {
        let mut session = self.open().await?;
        let result = store_seen(&mut session, id).await;
        logout(session).await;
        result
    }
}

async fn fetch_headers(session: &mut ImapSession, id: MessageId) -> Result<MessageHeaders> {
    let uid_set = id.to_string();
    let mut messages = session
        .uid_fetch(&uid_set, "(BODY.PEEK[])")
        .await
        .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?;

    while let Some(msg_result) = messages.next().await {
        let msg = msg_result.map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;
        if let Some(body) = msg.body() {
            return parse_headers(body);
        }
    }

    Err(Error::Imap(format!("No body found for UID {id}")))
}

async fn store_seen(session: &mut ImapSession, id: MessageId) -> Result<()> {
    let uid_set = id.to_string();
    let mut updates = session
        .uid_store(&uid_set, "+FLAGS (\\Seen)")
        .await
        .map_err(|e| Error::Imap(format!("Store failed: {e}")))?;

    while let Some(update) = updates.next().await {
        update.map_err(|e| Error::Imap(format!("Store error: {e}")))?;
    }

    debug!("Marked UID {} as seen", id);
    Ok(())
}

/// Pull `From` and `Subject` out of a raw RFC 2822 message.
///
/// The sender is rendered as `Name <address>` when a display name is
/// present, otherwise as the bare address.
///
/// # Errors
///
/// Returns an error if the message has no parseable header block.
pub fn parse_headers(raw: &[u8]) -> Result<MessageHeaders> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| Error::Parse("Message has no parseable headers".into()))?;

    let sender = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|addr| match (addr.name(), addr.address()) {
            (Some(name), Some(address)) if !name.trim().is_empty() => {
                Some(format!("{} <{address}>", name.trim()))
            }
            (_, Some(address)) => Some(address.to_string()),
            (Some(name), None) => Some(name.to_string()),
            (None, None) => None,
        });
    let subject = parsed.subject().map(ToString::to_string);

    Ok(MessageHeaders::new(sender, subject))
}
