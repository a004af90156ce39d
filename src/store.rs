//! On-disk storage for the model pair
//!
//! Two JSON artifacts live side by side in the model directory:
//!
//! ```text
//! model/
//!   featurizer.json   { format_version, pair_id, trained_at, payload }
//!   classifier.json   { format_version, pair_id, trained_at, payload }
//! ```
//!
//! Both envelopes must carry the same `pair_id`. A directory with
//! neither file means "not trained yet"; any other inconsistency is an
//! error.

use crate::classifier::MultinomialNb;
use crate::error::{Error, Result};
use crate::featurizer::TfidfFeaturizer;
use crate::model::ModelPair;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Bumped whenever the artifact layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

const FEATURIZER_FILE: &str = "featurizer.json";
const CLASSIFIER_FILE: &str = "classifier.json";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    pair_id: Uuid,
    trained_at: DateTime<Utc>,
    payload: T,
}

/// Reads and writes the model pair under one directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn featurizer_path(&self) -> PathBuf {
        self.dir.join(FEATURIZER_FILE)
    }

    #[must_use]
    pub fn classifier_path(&self) -> PathBuf {
        self.dir.join(CLASSIFIER_FILE)
    }

    /// Whether both artifacts are on disk (without validating them).
    #[must_use]
    pub fn exists(&self) -> bool {
        self.featurizer_path().is_file() && self.classifier_path().is_file()
    }

    /// Load the pair.
    ///
    /// Returns `Ok(None)` when neither artifact exists. Returns an error
    /// when only one exists, either cannot be parsed, or the two do not
    /// belong together.
    ///
    /// # Errors
    ///
    /// Returns an error for a half-written pair, an unreadable or
    /// unparseable artifact, a format version other than
    /// [`FORMAT_VERSION`], mismatched pair ids, or mismatched dimensions.
    pub fn load(&self) -> Result<Option<ModelPair>> {
        let featurizer_path = self.featurizer_path();
        let classifier_path = self.classifier_path();

        match (featurizer_path.is_file(), classifier_path.is_file()) {
            (false, false) => return Ok(None),
            (true, false) => {
                return Err(Error::Model(format!(
                    "Incomplete model pair: {} is missing",
                    classifier_path.display()
                )));
            }
            (false, true) => {
                return Err(Error::Model(format!(
                    "Incomplete model pair: {} is missing",
                    featurizer_path.display()
                )));
            }
            (true, true) => {}
        }

        let featurizer: Envelope<TfidfFeaturizer> = read_artifact(&featurizer_path)?;
        let classifier: Envelope<MultinomialNb> = read_artifact(&classifier_path)?;

        for (path, version) in [
            (&featurizer_path, featurizer.format_version),
            (&classifier_path, classifier.format_version),
        ] {
            if version != FORMAT_VERSION {
                return Err(Error::Model(format!(
                    "{} has format version {version}, expected {FORMAT_VERSION}",
                    path.display()
                )));
            }
        }
        if featurizer.pair_id != classifier.pair_id {
            return Err(Error::Model(format!(
                "Featurizer {} and classifier {} come from different training runs",
                featurizer.pair_id, classifier.pair_id
            )));
        }

        let pair = ModelPair::new(
            featurizer.pair_id,
            featurizer.trained_at,
            featurizer.payload,
            classifier.payload,
        )?;
        debug!("Loaded model pair {} from {}", pair.id, self.dir.display());
        Ok(Some(pair))
    }

    /// Persist the pair, replacing any previous one.
    ///
    /// Both artifacts are staged as temp files before either is renamed
    /// into place, so a failed write leaves the previous pair untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or either
    /// artifact cannot be serialised, written or renamed.
    pub fn save(&self, pair: &ModelPair) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let classifier = stage_artifact(
            &self.classifier_path(),
            &Envelope {
                format_version: FORMAT_VERSION,
                pair_id: pair.id,
                trained_at: pair.trained_at,
                payload: pair.classifier(),
            },
        )?;
        let featurizer = stage_artifact(
            &self.featurizer_path(),
            &Envelope {
                format_version: FORMAT_VERSION,
                pair_id: pair.id,
                trained_at: pair.trained_at,
                payload: pair.featurizer(),
            },
        )
        .inspect_err(|_| {
            fs::remove_file(&classifier).ok();
        })?;

        fs::rename(&classifier, self.classifier_path())?;
        fs::rename(&featurizer, self.featurizer_path())?;

        info!("Saved model pair {} to {}", pair.id, self.dir.display());
        Ok(())
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Model(format!("Corrupt artifact {}: {e}", path.display())))
}

/// Serialise to a sibling temp file and return its path.
fn stage_artifact<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec(value)?)?;
    Ok(tmp)
}
