//! SELECT command handler.
//!
//! Sends the untagged folder metadata async-imap expects (FLAGS,
//! EXISTS, RECENT, UIDVALIDITY, UIDNEXT) and returns the name of the
//! folder that is now selected.

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_select<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> Option<String> {
    let Some(folder) = mailbox.get_folder(folder_name) else {
        let resp = format!("{tag} NO Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return None;
    };

    let uidnext = folder.emails.iter().map(|e| e.uid).max().map_or(1, |max| max + 1);
    let lines = [
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n".to_string(),
        format!("* {} EXISTS\r\n", folder.emails.len()),
        "* 0 RECENT\r\n".to_string(),
        "* OK [UIDVALIDITY 1]\r\n".to_string(),
        format!("* OK [UIDNEXT {uidnext}]\r\n"),
        "* OK [PERMANENTFLAGS (\\Seen)] Limited\r\n".to_string(),
        format!("{tag} OK [READ-WRITE] SELECT completed\r\n"),
    ];
    for line in &lines {
        if write_line(stream, line).await.is_err() {
            return None;
        }
    }

    Some(folder_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::{pipe, read_all};
    use crate::fake_imap::mailbox::MailboxBuilder;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    async fn run(folder_name: &str, mailbox: &Mailbox) -> (String, Option<String>) {
        let (client, mut stream) = pipe();
        let selected = handle_select("A1", folder_name, mailbox, &mut stream).await;
        drop(stream);
        (read_all(client).await, selected)
    }

    #[tokio::test]
    async fn reports_exists_and_uidnext() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(5, false, RAW)
            .email(10, true, RAW)
            .build();

        let (output, selected) = run("INBOX", &mailbox).await;

        assert_eq!(selected.as_deref(), Some("INBOX"));
        assert!(output.contains("* 2 EXISTS"));
        assert!(output.contains("* OK [UIDNEXT 11]"));
        assert!(output.ends_with("A1 OK [READ-WRITE] SELECT completed\r\n"));
    }

    #[tokio::test]
    async fn unknown_folder_is_no() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();

        let (output, selected) = run("Archive", &mailbox).await;

        assert!(selected.is_none());
        assert_eq!(output, "A1 NO Folder not found\r\n");
    }
}
