//! LOGIN command handler.
//!
//! Credentials are not checked; a mailbox built with
//! `reject_logins()` answers every LOGIN with `NO` instead.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle LOGIN. Returns whether the session may continue.
pub async fn handle_login<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    accept: bool,
    stream: &mut BufReader<S>,
) -> bool {
    let resp = if accept {
        format!("{tag} OK LOGIN completed\r\n")
    } else {
        format!("{tag} NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
    };
    write_line(stream, &resp).await.is_ok() && accept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::{pipe, read_all};

    async fn run(tag: &str, accept: bool) -> (String, bool) {
        let (client, mut stream) = pipe();
        let ok = handle_login(tag, accept, &mut stream).await;
        drop(stream);
        (read_all(client).await, ok)
    }

    #[tokio::test]
    async fn accepts_with_tagged_ok() {
        let (output, ok) = run("A0001", true).await;
        assert!(ok);
        assert_eq!(output, "A0001 OK LOGIN completed\r\n");
    }

    #[tokio::test]
    async fn rejects_with_tagged_no() {
        let (output, ok) = run("A0001", false).await;
        assert!(!ok);
        assert!(output.starts_with("A0001 NO "));
    }
}
