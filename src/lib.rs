//! Inbox triage over IMAP
//!
//! Polls one IMAP folder for unseen messages, labels each by its sender
//! and subject with a TF-IDF + multinomial naive Bayes model, and sends
//! an SMTP alert for every message that is not labeled as spam.
//!
//! The model is trained from a CSV dataset on first start and persisted
//! as a pair of JSON artifacts (see [`ModelStore`]).

mod classifier;
mod client;
mod config;
mod connection;
mod dataset;
mod error;
mod featurizer;
mod message;
mod metrics;
mod model;
mod notify;
mod poller;
mod source;
mod store;
mod tokenize;
mod training;

pub use classifier::MultinomialNb;
pub use client::{ImapMailSource, parse_headers};
pub use config::{ImapConfig, MarkReadPolicy, ModelConfig, PollConfig, SmtpConfig, TlsMode};
pub use dataset::{LabeledSample, combined_text, load_dataset, read_dataset};
pub use error::{Error, Result};
pub use featurizer::{FeatureVector, TfidfFeaturizer};
pub use message::{ClassificationResult, MessageHeaders, MessageId};
pub use metrics::{ClassReport, ConfusionMatrix, EvaluationReport};
pub use model::ModelPair;
pub use notify::{ALERT_SUBJECT, Alert, Notifier, SmtpNotifier};
pub use poller::{MessageOutcome, Notification, PollState, Poller, SkipReason, TickReport};
pub use source::MailSource;
pub use store::{FORMAT_VERSION, ModelStore};
pub use tokenize::{is_stop_word, tokenize};
pub use training::{
    MIN_SAMPLES_FOR_HOLDOUT, TrainOptions, TrainingOutcome, load_or_train, train, train_and_save,
};
