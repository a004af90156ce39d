//! In-process fake IMAP server
//!
//! Each connection runs the same short script a real STARTTLS server
//! (Proton Bridge, for instance) would:
//!
//! ```text
//!   S: * OK IMAP4rev1 Fake server ready
//!   C: A0001 STARTTLS
//!   S: A0001 OK Begin TLS negotiation now
//!   <TLS handshake, self-signed certificate>
//!   C: A0002 LOGIN "user" "pass"
//!   C: A0003 SELECT "INBOX"
//!   C: A0004 UID SEARCH UNSEEN           -> * SEARCH 2 4
//!   C: A0005 UID FETCH 2 (BODY.PEEK[])   -> counted literal
//!   C: A0006 UID STORE 2 +FLAGS (\Seen)  -> * 1 FETCH (UID 2 FLAGS (\Seen))
//!   C: A0007 LOGOUT
//! ```
//!
//! After the handshake every line is decoded with `imap-codec` and
//! dispatched on its `CommandBody`. Anything outside that subset gets
//! `BAD`.

use super::handlers::{
    StoreArgs, handle_login, handle_logout, handle_select, handle_uid_fetch, handle_uid_search,
    handle_uid_store,
};
use super::io::write_line;
use super::mailbox::Mailbox;
use imap_codec::CommandCodec;
use imap_codec::decode::Decoder;
use imap_codec::imap_types::command::CommandBody;
use imap_codec::imap_types::mailbox::Mailbox as ImapMailbox;
use rcgen::generate_simple_self_signed;
use rustls::pki_types::PrivatePkcs8KeyDer;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

/// A fake IMAP server on `127.0.0.1` with an OS-assigned port.
///
/// The mailbox is shared with the test, so flag changes made by the
/// client can be asserted on after the fact. The accept loop is
/// aborted when the server is dropped.
pub struct FakeImapServer {
    port: u16,
    mailbox: Arc<Mutex<Mailbox>>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeImapServer {
    pub async fn start(mailbox: Mailbox) -> Self {
        // Several tests may race to install the provider.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let cert = generate_simple_self_signed(vec!["127.0.0.1".to_string()])
            .expect("generate self-signed cert");
        let cert_der = cert.cert.der().clone();
        let key_der = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());
        let tls_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der], key_der.into())
            .expect("build server TLS config");
        let acceptor = TlsAcceptor::from(Arc::new(tls_config));

        let mailbox = Arc::new(Mutex::new(mailbox));
        let shared = mailbox.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _addr)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let mailbox = shared.clone();
                tokio::spawn(async move {
                    handle_connection(stream, acceptor, &mailbox).await;
                });
            }
        });

        Self {
            port,
            mailbox,
            handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// `\Seen` state of a message as the server currently holds it.
    pub fn is_seen(&self, folder: &str, uid: u32) -> Option<bool> {
        self.mailbox.lock().unwrap().is_seen(folder, uid)
    }

    /// UIDs still unread in `folder`, in mailbox order.
    pub fn unseen(&self, folder: &str) -> Vec<u32> {
        self.mailbox
            .lock()
            .unwrap()
            .get_folder(folder)
            .map(|f| f.emails.iter().filter(|e| !e.seen).map(|e| e.uid).collect())
            .unwrap_or_default()
    }
}

impl Drop for FakeImapServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Greeting and STARTTLS on the plain socket, then the command loop
/// over TLS.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    acceptor: TlsAcceptor,
    mailbox: &Mutex<Mailbox>,
) {
    let mut reader = BufReader::new(stream);

    if write_line(&mut reader, "* OK IMAP4rev1 Fake server ready\r\n")
        .await
        .is_err()
    {
        return;
    }

    let mut line = String::new();
    if reader.read_line(&mut line).await.is_err() {
        return;
    }
    let Some((tag, command)) = line.trim().split_once(' ') else {
        return;
    };
    if !command.eq_ignore_ascii_case("STARTTLS") {
        let _ = write_line(&mut reader, &format!("{tag} BAD Expected STARTTLS\r\n")).await;
        return;
    }
    if write_line(&mut reader, &format!("{tag} OK Begin TLS negotiation now\r\n"))
        .await
        .is_err()
    {
        return;
    }

    let Ok(tls_stream) = acceptor.accept(reader.into_inner()).await else {
        return;
    };
    handle_session(tls_stream, mailbox).await;
}

fn mailbox_name(mb: &ImapMailbox<'_>) -> String {
    match mb {
        ImapMailbox::Inbox => "INBOX".to_string(),
        ImapMailbox::Other(other) => {
            let bytes: &[u8] = other.as_ref();
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Command loop. Read-only handlers get a snapshot of the mailbox;
/// UID STORE gets the mutex.
async fn handle_session<S: AsyncRead + AsyncWrite + Unpin>(stream: S, mailbox: &Mutex<Mailbox>) {
    let mut reader = BufReader::new(stream);
    let mut selected: Option<String> = None;
    let codec = CommandCodec::default();

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Ok((_, command)) = codec.decode(line.as_bytes()) else {
            let tag = trimmed.split_whitespace().next().unwrap_or("*");
            if write_line(&mut reader, &format!("{tag} BAD Parse error\r\n"))
                .await
                .is_err()
            {
                break;
            }
            continue;
        };

        let tag = command.tag.inner();
        let snap = mailbox.lock().unwrap().clone();

        match command.body {
            CommandBody::Login { .. } => {
                if !handle_login(tag, !snap.reject_logins, &mut reader).await {
                    break;
                }
            }
            CommandBody::Select { mailbox: mb, .. } => {
                selected = handle_select(tag, &mailbox_name(&mb), &snap, &mut reader).await;
            }
            CommandBody::Search {
                criteria,
                uid: true,
                ..
            } => {
                handle_uid_search(
                    tag,
                    criteria.as_ref(),
                    &snap,
                    selected.as_deref(),
                    &mut reader,
                )
                .await;
            }
            CommandBody::Fetch {
                sequence_set,
                uid: true,
                ..
            } => {
                handle_uid_fetch(tag, &sequence_set, &snap, selected.as_deref(), &mut reader)
                    .await;
            }
            CommandBody::Store {
                ref sequence_set,
                ref kind,
                ref response,
                ref flags,
                uid: true,
                ..
            } => {
                let args = StoreArgs {
                    sequence_set,
                    kind,
                    response,
                    flags,
                };
                handle_uid_store(tag, &args, mailbox, selected.as_deref(), &mut reader).await;
            }
            CommandBody::Logout => {
                handle_logout(tag, &mut reader).await;
                break;
            }
            _ => {
                if write_line(&mut reader, &format!("{tag} BAD Unsupported command\r\n"))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}
