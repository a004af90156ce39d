//! The featurizer + classifier pair used for prediction

use crate::classifier::MultinomialNb;
use crate::dataset::combined_text;
use crate::error::{Error, Result};
use crate::featurizer::TfidfFeaturizer;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A featurizer and classifier produced by the same training run.
///
/// Loaded once at startup and only ever read afterwards; the poll loop
/// borrows it for its whole lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPair {
    pub id: Uuid,
    pub trained_at: DateTime<Utc>,
    featurizer: TfidfFeaturizer,
    classifier: MultinomialNb,
}

impl ModelPair {
    /// Pair a featurizer with a classifier trained on its output.
    ///
    /// # Errors
    ///
    /// Returns an error if either part fails validation or their feature
    /// dimensions differ.
    pub fn new(
        id: Uuid,
        trained_at: DateTime<Utc>,
        featurizer: TfidfFeaturizer,
        classifier: MultinomialNb,
    ) -> Result<Self> {
        featurizer.validate()?;
        classifier.validate()?;
        if featurizer.dim() != classifier.n_features() {
            return Err(Error::Model(format!(
                "Featurizer has {} features but classifier expects {}",
                featurizer.dim(),
                classifier.n_features()
            )));
        }
        Ok(Self {
            id,
            trained_at,
            featurizer,
            classifier,
        })
    }

    /// Label for a `(sender, subject)` pair.
    #[must_use]
    pub fn classify(&self, sender: &str, subject: &str) -> &str {
        self.classify_text(&combined_text(sender, subject))
    }

    #[must_use]
    pub fn classify_text(&self, text: &str) -> &str {
        self.classifier.predict(&self.featurizer.transform(text))
    }

    #[must_use]
    pub const fn featurizer(&self) -> &TfidfFeaturizer {
        &self.featurizer
    }

    #[must_use]
    pub const fn classifier(&self) -> &MultinomialNb {
        &self.classifier
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        self.classifier.classes()
    }

    /// Whether `label` is one of the classes this pair can predict.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l == label)
    }
}
