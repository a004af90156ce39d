//! UID FETCH command handler.
//!
//! Always answers with the whole message as a counted literal, whatever
//! data items were requested. The fetch never sets `\Seen`, which is
//! what `BODY.PEEK[]` promises.
//!
//! ```text
//! * <seq> FETCH (UID <uid> BODY[] {<len>}
//! <len bytes of RFC 2822 message>
//! )
//! ```

use super::expand_uids;
use crate::fake_imap::io::{write_bytes, write_line};
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::sequence::SequenceSet;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_uid_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder) = selected_folder.and_then(|name| mailbox.get_folder(name)) else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    let max_uid = folder.emails.iter().map(|e| e.uid).max().unwrap_or(0);
    for uid in expand_uids(sequence_set, max_uid) {
        let Some(seq) = folder.emails.iter().position(|e| e.uid == uid) else {
            continue;
        };
        let raw = &folder.emails[seq].raw;

        let header = format!("* {} FETCH (UID {uid} BODY[] {{{}}}\r\n", seq + 1, raw.len());
        if write_line(stream, &header).await.is_err()
            || write_bytes(stream, raw).await.is_err()
            || write_line(stream, ")\r\n").await.is_err()
        {
            return;
        }
    }

    let resp = format!("{tag} OK FETCH completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::handlers::uid_set;
    use crate::fake_imap::io::{pipe, read_all};
    use crate::fake_imap::mailbox::MailboxBuilder;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    async fn run(uid: u32, mailbox: &Mailbox) -> String {
        let (client, mut stream) = pipe();
        handle_uid_fetch("A1", &uid_set(uid), mailbox, Some("INBOX"), &mut stream).await;
        drop(stream);
        read_all(client).await
    }

    #[tokio::test]
    async fn returns_literal_with_sequence_number() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(3, true, RAW)
            .email(42, false, RAW)
            .build();

        let output = run(42, &mailbox).await;

        let header = format!("* 2 FETCH (UID 42 BODY[] {{{}}}\r\n", RAW.len());
        assert!(output.starts_with(&header));
        assert!(output.contains("Subject: Test"));
        assert!(output.ends_with("A1 OK FETCH completed\r\n"));
    }

    #[tokio::test]
    async fn unknown_uid_is_empty_ok() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let output = run(99, &mailbox).await;
        assert_eq!(output, "A1 OK FETCH completed\r\n");
    }
}
