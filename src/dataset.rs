//! Labeled training dataset (`Sender,Subject,Label` CSV)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// One labeled historical message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub sender: String,
    pub subject: String,
    pub label: String,
}

impl LabeledSample {
    #[must_use]
    pub fn new(sender: impl Into<String>, subject: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            label: label.into(),
        }
    }

    /// The classifier input: `sender + " " + subject`.
    #[must_use]
    pub fn text(&self) -> String {
        combined_text(&self.sender, &self.subject)
    }
}

/// Join sender and subject the same way for training and prediction.
#[must_use]
pub fn combined_text(sender: &str, subject: &str) -> String {
    format!("{sender} {subject}")
}

/// Load a dataset file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a valid
/// dataset (see [`read_dataset`]).
pub fn load_dataset(path: &Path) -> Result<Vec<LabeledSample>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Dataset(format!("Cannot open {}: {e}", path.display())))?;
    let samples = read_dataset(file)?;
    info!("Loaded {} labeled samples from {}", samples.len(), path.display());
    Ok(samples)
}

/// Read CSV with a header row naming `Sender`, `Subject` and `Label`
/// (any order, extra columns ignored).
///
/// Short rows and empty cells yield empty sender/subject strings. Rows
/// without a label cannot be trained on and are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the header row is missing a required column or
/// the CSV is malformed.
pub fn read_dataset<R: Read>(reader: R) -> Result<Vec<LabeledSample>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| Error::Dataset(format!("Cannot read header row: {e}")))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
            .ok_or_else(|| Error::Dataset(format!("Missing {name} column in header")))
    };
    let sender_col = column("Sender")?;
    let subject_col = column("Subject")?;
    let label_col = column("Label")?;

    let mut samples = Vec::new();
    for (row, record) in csv.records().enumerate() {
        let record =
            record.map_err(|e| Error::Dataset(format!("Malformed row {}: {e}", row + 2)))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();

        let label = cell(label_col);
        if label.is_empty() {
            warn!("Skipping row {} without a label", row + 2);
            continue;
        }
        samples.push(LabeledSample {
            sender: cell(sender_col),
            subject: cell(subject_col),
            label,
        });
    }

    Ok(samples)
}
