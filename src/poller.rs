//! Timer-driven poll loop
//!
//! The loop is either idle (waiting for the next tick) or processing a
//! batch. A batch is drained strictly in list order, one blocking call
//! at a time, and always runs to completion before the next tick.
//!
//! Per message:
//!
//! ```text
//! get_message ──err──> TransientError            (left unread)
//!      │
//!  sender & subject? ──no──> Skipped             (left unread)
//!      │
//!  classify ── label == spam ──────────────┐
//!      │                                   │
//!  notify ──err──> (logged)                │
//!      │                                   │
//!  mark_read (unless policy = on-success and notify failed)
//! ```

use crate::config::{MarkReadPolicy, PollConfig};
use crate::message::{ClassificationResult, MessageId};
use crate::model::ModelPair;
use crate::notify::{Alert, Notifier};
use crate::source::MailSource;
use std::fmt;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Processing,
}

/// What happened to the alert for a classified message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The label was the spam label; nothing was sent.
    NotRequired,
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingSender,
    MissingSubject,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSender => f.write_str("missing sender"),
            Self::MissingSubject => f.write_str("missing subject"),
        }
    }
}

/// Result of processing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Processed {
        classification: ClassificationResult,
        notification: Notification,
        marked_read: bool,
    },
    /// Malformed message, left unread for the next tick.
    Skipped { id: MessageId, reason: SkipReason },
    /// The mail source failed before classification.
    TransientError { id: MessageId, error: String },
}

/// Aggregate of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Set when the unread list itself could not be fetched.
    pub list_error: Option<String>,
    pub fetched: usize,
    pub processed: usize,
    pub notified: usize,
    pub notify_failed: usize,
    pub left_unread: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl TickReport {
    fn record(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Processed {
                notification,
                marked_read,
                ..
            } => {
                self.processed += 1;
                match notification {
                    Notification::Sent => self.notified += 1,
                    Notification::Failed(_) => self.notify_failed += 1,
                    Notification::NotRequired => {}
                }
                if !marked_read {
                    self.left_unread += 1;
                }
            }
            MessageOutcome::Skipped { .. } => self.skipped += 1,
            MessageOutcome::TransientError { .. } => self.errors += 1,
        }
    }
}

/// Drives classification and notification for one mailbox.
pub struct Poller<'m, S, N> {
    model: &'m ModelPair,
    source: S,
    notifier: N,
    config: PollConfig,
    state: PollState,
}

impl<'m, S: MailSource, N: Notifier> Poller<'m, S, N> {
    pub const fn new(model: &'m ModelPair, source: S, notifier: N, config: PollConfig) -> Self {
        Self {
            model,
            source,
            notifier,
            config,
            state: PollState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> PollState {
        self.state
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Poll forever. The first batch is processed one interval after
    /// start; there is no shutdown signal besides process exit.
    pub async fn run(&mut self) {
        info!(
            "Polling every {}s (spam label {:?}, mark-read policy {:?})",
            self.config.interval.as_secs(),
            self.config.spam_label,
            self.config.mark_read
        );
        let mut ticker = self.ticker();
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// Run exactly `ticks` timer ticks and return their reports.
    pub async fn run_ticks(&mut self, ticks: usize) -> Vec<TickReport> {
        let mut ticker = self.ticker();
        let mut reports = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            ticker.tick().await;
            reports.push(self.poll_once().await);
        }
        reports
    }

    fn ticker(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// One Idle -> Processing -> Idle cycle.
    pub async fn poll_once(&mut self) -> TickReport {
        self.state = PollState::Processing;
        let report = self.drain().await;
        self.state = PollState::Idle;

        if report.fetched > 0 {
            info!(
                "Tick done: {} fetched, {} processed, {} notified, {} notify failures, {} skipped, {} errors",
                report.fetched,
                report.processed,
                report.notified,
                report.notify_failed,
                report.skipped,
                report.errors
            );
        }
        report
    }

    async fn drain(&self) -> TickReport {
        let mut report = TickReport::default();

        let ids = match self.source.list_unread().await {
            Ok(ids) => ids,
            Err(e) => {
                error!("An error occurred while checking email: {e}");
                report.list_error = Some(e.to_string());
                return report;
            }
        };

        if ids.is_empty() {
            info!("No new emails.");
            return report;
        }

        report.fetched = ids.len();
        for id in ids {
            let outcome = self.process_message(id).await;
            report.record(&outcome);
        }
        report
    }

    /// Classify, notify and mark one message.
    pub async fn process_message(&self, id: MessageId) -> MessageOutcome {
        let headers = match self.source.get_message(id).await {
            Ok(headers) => headers,
            Err(e) => {
                warn!("Failed to fetch message {id}: {e}");
                return MessageOutcome::TransientError {
                    id,
                    error: e.to_string(),
                };
            }
        };

        let (sender, subject) = match (&headers.sender, &headers.subject) {
            (Some(sender), Some(subject)) => (sender.as_str(), subject.as_str()),
            (None, _) => return skip(id, SkipReason::MissingSender),
            (_, None) => return skip(id, SkipReason::MissingSubject),
        };

        let label = self.model.classify(sender, subject).to_string();
        info!("Email from {sender} with subject '{subject}' classified as: {label}");

        let notification = if label == self.config.spam_label {
            Notification::NotRequired
        } else {
            match self.notifier.notify(&Alert::new(sender, subject, &label)).await {
                Ok(()) => Notification::Sent,
                Err(e) => {
                    warn!("Failed to send notification email: {e}");
                    Notification::Failed(e.to_string())
                }
            }
        };

        let should_mark = match self.config.mark_read {
            MarkReadPolicy::Always => true,
            MarkReadPolicy::OnSuccess => !matches!(notification, Notification::Failed(_)),
        };

        let marked_read = if should_mark {
            match self.source.mark_read(id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to mark message {id} as read: {e}");
                    false
                }
            }
        } else {
            debug!("Leaving message {id} unread for retry");
            false
        };

        MessageOutcome::Processed {
            classification: ClassificationResult { message: id, label },
            notification,
            marked_read,
        }
    }
}

fn skip(id: MessageId, reason: SkipReason) -> MessageOutcome {
    info!("Email missing sender or subject ({reason}); leaving message {id} unread");
    MessageOutcome::Skipped { id, reason }
}
