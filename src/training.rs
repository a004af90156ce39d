//! Training pipeline: fit, hold out, evaluate
//!
//! The featurizer is fit on every sample, the vectors are shuffled with
//! a fixed seed and split 80/20, and the classifier is fit on the larger
//! part and scored on the rest.

use crate::classifier::MultinomialNb;
use crate::dataset::{LabeledSample, load_dataset};
use crate::error::{Error, Result};
use crate::featurizer::TfidfFeaturizer;
use crate::metrics::EvaluationReport;
use crate::model::ModelPair;
use crate::store::ModelStore;
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Below this many samples there is no meaningful holdout: the model is
/// fit on everything and no report is produced.
pub const MIN_SAMPLES_FOR_HOLDOUT: usize = 5;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub holdout_fraction: f64,
    pub seed: u64,
    pub max_df: f64,
    pub alpha: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            seed: 42,
            max_df: crate::featurizer::DEFAULT_MAX_DF,
            alpha: crate::classifier::DEFAULT_ALPHA,
        }
    }
}

/// A trained pair and, when a holdout was possible, its evaluation.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: ModelPair,
    pub report: Option<EvaluationReport>,
    pub train_size: usize,
    pub holdout_size: usize,
}

/// Fit a model pair on `samples`.
///
/// # Errors
///
/// Returns an error if `samples` is empty, if `holdout_fraction` is
/// outside `[0, 1)`, or if the featurizer or classifier cannot be fit.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn train(samples: &[LabeledSample], options: &TrainOptions) -> Result<TrainingOutcome> {
    if samples.is_empty() {
        return Err(Error::Dataset("No labeled samples to train on".into()));
    }
    if !(0.0..1.0).contains(&options.holdout_fraction) {
        return Err(Error::Dataset(format!(
            "holdout_fraction must be in [0, 1), got {}",
            options.holdout_fraction
        )));
    }

    let texts: Vec<String> = samples.iter().map(LabeledSample::text).collect();
    let featurizer = TfidfFeaturizer::fit_with_max_df(&texts, options.max_df)?;
    if featurizer.dim() == 0 {
        warn!("Vocabulary is empty after pruning; every prediction will use class priors");
    }
    let vectors = featurizer.transform_all(&texts);

    let holdout_size = if samples.len() < MIN_SAMPLES_FOR_HOLDOUT {
        warn!(
            "Only {} samples; training on all of them without a holdout",
            samples.len()
        );
        0
    } else {
        ((samples.len() as f64) * options.holdout_fraction).ceil() as usize
    };

    let mut order: Vec<usize> = (0..samples.len()).collect();
    if holdout_size > 0 {
        let mut rng = StdRng::seed_from_u64(options.seed);
        order.shuffle(&mut rng);
    }
    let (holdout_idx, train_idx) = order.split_at(holdout_size);
    // Classes are enumerated in dataset order, so ties resolve the same
    // way whatever the shuffle drew.
    let mut train_idx = train_idx.to_vec();
    train_idx.sort_unstable();

    let x_train: Vec<_> = train_idx.iter().map(|&i| vectors[i].clone()).collect();
    let y_train: Vec<String> = train_idx.iter().map(|&i| samples[i].label.clone()).collect();
    let classifier = MultinomialNb::fit_with_alpha(&x_train, &y_train, options.alpha)?;

    let report = if holdout_idx.is_empty() {
        None
    } else {
        let truth: Vec<String> = holdout_idx.iter().map(|&i| samples[i].label.clone()).collect();
        let predicted: Vec<String> = holdout_idx
            .iter()
            .map(|&i| classifier.predict(&vectors[i]).to_string())
            .collect();
        Some(EvaluationReport::from_predictions(
            classifier.classes(),
            &truth,
            &predicted,
        ))
    };

    let model = ModelPair::new(Uuid::new_v4(), Utc::now(), featurizer, classifier)?;
    info!(
        "Trained model {} ({} features at max_df {}, {} classes) on {} samples, {} held out",
        model.id,
        model.featurizer().dim(),
        model.featurizer().max_df(),
        model.labels().len(),
        train_idx.len(),
        holdout_idx.len()
    );
    if let Some(report) = &report {
        info!("Holdout accuracy: {:.4}", report.accuracy);
    }

    Ok(TrainingOutcome {
        model,
        report,
        train_size: train_idx.len(),
        holdout_size: holdout_idx.len(),
    })
}

/// Train from the dataset file and persist the pair.
///
/// # Errors
///
/// Returns an error if the dataset cannot be read, training fails, or
/// the artifacts cannot be written.
pub fn train_and_save(
    store: &ModelStore,
    dataset: &Path,
    options: &TrainOptions,
) -> Result<TrainingOutcome> {
    let samples = load_dataset(dataset)?;
    let outcome = train(&samples, options)?;
    store.save(&outcome.model)?;
    Ok(outcome)
}

/// Startup step: load the persisted pair, or train one if none exists.
///
/// A present-but-broken pair is an error; the caller is expected to
/// treat it as fatal.
///
/// # Errors
///
/// Returns an error if a saved pair is incomplete or corrupt, or if
/// training from `dataset` fails.
pub fn load_or_train(
    store: &ModelStore,
    dataset: &Path,
    options: &TrainOptions,
) -> Result<ModelPair> {
    if let Some(model) = store.load()? {
        info!(
            "Loaded model {} trained at {}",
            model.id,
            model.trained_at.to_rfc3339()
        );
        return Ok(model);
    }

    info!(
        "No model found in {}; training from {}",
        store.dir().display(),
        dataset.display()
    );
    let outcome = train_and_save(store, dataset, options)?;
    if let Some(report) = &outcome.report {
        info!("Evaluation on holdout split:\n{report}");
    }
    Ok(outcome.model)
}
