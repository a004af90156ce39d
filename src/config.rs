//! Runtime configuration
//!
//! Every section is read from environment variables (a `.env` file is
//! loaded first if present). The CLI may override individual values
//! after loading.

use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How the IMAP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain TCP upgraded with `STARTTLS` (Proton Bridge, port 1143).
    StartTls,
    /// TLS from the first byte (port 993).
    Implicit,
}

impl FromStr for TlsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "implicit" | "tls" => Ok(Self::Implicit),
            other => Err(Error::Config(format!("Invalid IMAP_TLS: {other}"))),
        }
    }
}

/// IMAP connection configuration for the polled mailbox
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub folder: String,
    pub tls: TlsMode,
    pub accept_invalid_certs: bool,
}

impl ImapConfig {
    /// Load IMAP configuration from environment variables
    ///
    /// Required variables:
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_HOST` (default: `127.0.0.1`)
    /// - `IMAP_PORT` (default: `1143`)
    /// - `IMAP_FOLDER` (default: `INBOX`)
    /// - `IMAP_TLS` (default: `starttls`)
    /// - `IMAP_ACCEPT_INVALID_CERTS` (default: `false`)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: env::var("IMAP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("IMAP_PORT", 1143)?,
            username: env::var("IMAP_USERNAME")
                .map_err(|_| Error::Config("IMAP_USERNAME not set".into()))?,
            password: env::var("IMAP_PASSWORD")
                .map_err(|_| Error::Config("IMAP_PASSWORD not set".into()))?,
            folder: env::var("IMAP_FOLDER").unwrap_or_else(|_| "INBOX".to_string()),
            tls: parse_var("IMAP_TLS", TlsMode::StartTls)?,
            accept_invalid_certs: parse_flag("IMAP_ACCEPT_INVALID_CERTS", false)?,
        })
    }
}

/// SMTP settings for the alert transport
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

impl SmtpConfig {
    /// Load SMTP configuration from environment variables
    ///
    /// `SMTP_USERNAME` is required. The password is read from
    /// `SMTP_PASSWORD`, falling back to `EMAIL_PASSWORD`. `NOTIFY_FROM`
    /// defaults to the username and `NOTIFY_TO` to `NOTIFY_FROM`, so
    /// alerts go to the account itself unless told otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if `SMTP_USERNAME` or both passwords are missing,
    /// or `SMTP_PORT` is invalid.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let username = env::var("SMTP_USERNAME")
            .map_err(|_| Error::Config("SMTP_USERNAME not set".into()))?;
        let password = env::var("SMTP_PASSWORD")
            .or_else(|_| env::var("EMAIL_PASSWORD"))
            .map_err(|_| Error::Config("SMTP_PASSWORD not set".into()))?;
        let from = env::var("NOTIFY_FROM").unwrap_or_else(|_| username.clone());
        let to = env::var("NOTIFY_TO").unwrap_or_else(|_| from.clone());

        Ok(Self {
            host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port: parse_var("SMTP_PORT", 587)?,
            username,
            password,
            from,
            to,
        })
    }
}

/// Whether a message is marked read when its notification failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkReadPolicy {
    /// Mark read after classification no matter what the notifier did.
    #[default]
    Always,
    /// Leave the message unread if the notification failed, so the next
    /// tick retries it.
    OnSuccess,
}

impl FromStr for MarkReadPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "on-success" | "on_success" => Ok(Self::OnSuccess),
            other => Err(Error::Config(format!("Invalid MARK_READ_POLICY: {other}"))),
        }
    }
}

/// Poll loop settings
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub spam_label: String,
    pub batch_size: usize,
    pub mark_read: MarkReadPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            spam_label: "spam".to_string(),
            batch_size: 100,
            mark_read: MarkReadPolicy::Always,
        }
    }
}

impl PollConfig {
    /// Load poll settings from `POLL_INTERVAL_SECS`, `SPAM_LABEL`,
    /// `POLL_BATCH_SIZE` and `MARK_READ_POLICY`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or the interval or
    /// batch size is zero.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let secs: u64 = parse_var("POLL_INTERVAL_SECS", defaults.interval.as_secs())?;
        if secs == 0 {
            return Err(Error::Config("POLL_INTERVAL_SECS must be positive".into()));
        }
        let batch_size: usize = parse_var("POLL_BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(Error::Config("POLL_BATCH_SIZE must be positive".into()));
        }

        Ok(Self {
            interval: Duration::from_secs(secs),
            spam_label: env::var("SPAM_LABEL").unwrap_or(defaults.spam_label),
            batch_size,
            mark_read: parse_var("MARK_READ_POLICY", defaults.mark_read)?,
        })
    }
}

/// Locations of the training dataset and persisted model pair
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    pub dataset_path: PathBuf,
}

impl ModelConfig {
    /// Load paths from `MODEL_DIR` (default `model`) and `DATASET_PATH`
    /// (default `email_snu.csv`).
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            model_dir: env::var("MODEL_DIR").map_or_else(|_| PathBuf::from("model"), PathBuf::from),
            dataset_path: env::var("DATASET_PATH")
                .map_or_else(|_| PathBuf::from("email_snu.csv"), PathBuf::from),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env::var(name).map_or_else(
        |_| Ok(default),
        |raw| {
            raw.parse()
                .map_err(|e| Error::Config(format!("Invalid {name}: {e}")))
        },
    )
}

fn parse_flag(name: &str, default: bool) -> Result<bool> {
    env::var(name).map_or_else(
        |_| Ok(default),
        |raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => Err(Error::Config(format!("Invalid {name}: {other}"))),
        },
    )
}
