//! Mailbox state served by the fake IMAP server
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .email(1, false, raw_rfc2822_bytes)
//!         .email(2, true, raw_rfc2822_bytes)
//!     .build();
//! ```
//!
//! The server keeps the `Mailbox` behind `Arc<Mutex<_>>`; UID STORE is
//! the only command that changes it.

#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
    /// Answer every LOGIN with `NO`.
    pub reject_logins: bool,
}

impl Mailbox {
    /// Folder by exact name.
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    /// `\Seen` state of one message, `None` if it does not exist.
    pub fn is_seen(&self, folder: &str, uid: u32) -> Option<bool> {
        self.get_folder(folder)?
            .emails
            .iter()
            .find(|e| e.uid == uid)
            .map(|e| e.seen)
    }
}

#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub emails: Vec<TestEmail>,
}

/// One stored message. `uid` is stable, `raw` is the full RFC 2822
/// text returned by FETCH.
#[derive(Debug, Clone)]
pub struct TestEmail {
    pub uid: u32,
    pub seen: bool,
    pub raw: Vec<u8>,
}

pub struct MailboxBuilder {
    folders: Vec<Folder>,
    reject_logins: bool,
}

impl MailboxBuilder {
    pub const fn new() -> Self {
        Self {
            folders: Vec::new(),
            reject_logins: false,
        }
    }

    /// Start a folder; following `.email()` calls add to it.
    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            emails: Vec::new(),
        });
        self
    }

    /// Add a message to the most recent folder.
    ///
    /// # Panics
    ///
    /// Panics if no folder has been started.
    pub fn email(mut self, uid: u32, seen: bool, raw: &[u8]) -> Self {
        self.folders
            .last_mut()
            .expect("call .folder() before .email()")
            .emails
            .push(TestEmail {
                uid,
                seen,
                raw: raw.to_vec(),
            });
        self
    }

    pub const fn reject_logins(mut self) -> Self {
        self.reject_logins = true;
        self
    }

    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
            reject_logins: self.reject_logins,
        }
    }
}
