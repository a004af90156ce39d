#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for training the triage model and polling an inbox

use clap::{Parser, Subcommand};
use mail_triage::{
    ImapConfig, ImapMailSource, ModelConfig, ModelPair, ModelStore, PollConfig, Poller,
    SmtpConfig, SmtpNotifier, TrainOptions, load_or_train, train_and_save,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mail-triage")]
#[command(about = "Classify unread IMAP mail and send alerts for non-spam")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the model artifacts (overrides `MODEL_DIR`)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Labeled CSV dataset (overrides `DATASET_PATH`)
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load or train the model, then poll the inbox forever
    Run {
        /// Seconds between polls (overrides `POLL_INTERVAL_SECS`)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Train the model from the dataset and save it
    Train {
        /// Retrain even if a model is already saved
        #[arg(long)]
        force: bool,
    },

    /// Classify a single sender/subject pair
    Classify {
        #[arg(long)]
        sender: String,

        #[arg(long)]
        subject: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut paths = ModelConfig::from_env();
    if let Some(dir) = &args.model_dir {
        paths.model_dir.clone_from(dir);
    }
    if let Some(dataset) = &args.dataset {
        paths.dataset_path.clone_from(dataset);
    }
    let store = ModelStore::new(&paths.model_dir);

    match &args.command {
        Command::Run { interval_secs } => {
            cmd_run(&store, &paths, *interval_secs).await?;
        }
        Command::Train { force } => {
            cmd_train(&store, &paths, *force)?;
        }
        Command::Classify {
            sender,
            subject,
            json,
        } => {
            cmd_classify(&store, &paths, sender, subject, *json)?;
        }
    }

    Ok(())
}

async fn cmd_run(
    store: &ModelStore,
    paths: &ModelConfig,
    interval_secs: Option<u64>,
) -> anyhow::Result<()> {
    let mut poll = PollConfig::from_env()?;
    if let Some(secs) = interval_secs {
        anyhow::ensure!(secs > 0, "--interval-secs must be positive");
        poll.interval = Duration::from_secs(secs);
    }
    let imap = ImapConfig::from_env()?;
    let smtp = SmtpConfig::from_env()?;

    let model = load_or_train(store, &paths.dataset_path, &TrainOptions::default())?;
    let source = ImapMailSource::new(imap, poll.batch_size);
    let notifier = SmtpNotifier::new(&smtp)?;

    if !model.has_label(&poll.spam_label) {
        warn!(
            "SPAM_LABEL {:?} is not a model label ({}); every message will trigger an alert",
            poll.spam_label,
            model.labels().join(", ")
        );
    }

    info!(
        "Watching {} with model {} (labels: {})",
        source.folder(),
        model.id,
        model.labels().join(", ")
    );

    let mut poller = Poller::new(&model, source, notifier, poll);
    poller.run().await;
    Ok(())
}

fn cmd_train(store: &ModelStore, paths: &ModelConfig, force: bool) -> anyhow::Result<()> {
    if store.exists() && !force {
        println!(
            "Model already exists in {} (use --force to retrain)",
            store.dir().display()
        );
        return Ok(());
    }

    let outcome = train_and_save(store, &paths.dataset_path, &TrainOptions::default())?;

    println!("Model:    {}", outcome.model.id);
    println!("Labels:   {}", outcome.model.labels().join(", "));
    println!("Features: {}", outcome.model.featurizer().dim());
    println!(
        "Samples:  {} train, {} holdout",
        outcome.train_size, outcome.holdout_size
    );
    match &outcome.report {
        Some(report) => println!("\n{report}"),
        None => println!("\nToo few samples for a holdout evaluation."),
    }
    println!("\nSaved to {}", store.dir().display());

    Ok(())
}

fn cmd_classify(
    store: &ModelStore,
    paths: &ModelConfig,
    sender: &str,
    subject: &str,
    json: bool,
) -> anyhow::Result<()> {
    let model: ModelPair = load_or_train(store, &paths.dataset_path, &TrainOptions::default())?;
    let label = model.classify(sender, subject);

    if json {
        let out = serde_json::json!({
            "sender": sender,
            "subject": subject,
            "label": label,
            "model_id": model.id,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{label}");
    }

    Ok(())
}
