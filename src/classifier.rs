//! Multinomial naive Bayes over weighted token features

use crate::error::{Error, Result};
use crate::featurizer::FeatureVector;
use serde::{Deserialize, Serialize};

/// Additive (Laplace) smoothing applied to every token count.
pub const DEFAULT_ALPHA: f64 = 1.0;

/// A fitted multinomial naive Bayes model.
///
/// Classes are kept in the order they first appear in the training
/// labels; that order also breaks ties in [`MultinomialNb::predict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultinomialNb {
    classes: Vec<String>,
    class_log_prior: Vec<f64>,
    /// `[class][feature]` log-likelihoods.
    feature_log_prob: Vec<Vec<f64>>,
    n_features: usize,
    alpha: f64,
}

impl MultinomialNb {
    /// Fit with the default smoothing.
    ///
    /// # Errors
    ///
    /// See [`MultinomialNb::fit_with_alpha`].
    pub fn fit(x: &[FeatureVector], y: &[String]) -> Result<Self> {
        Self::fit_with_alpha(x, y, DEFAULT_ALPHA)
    }

    /// Fit on vectors `x` with labels `y` and Laplace smoothing `alpha`.
    ///
    /// # Errors
    ///
    /// Returns an error if `x` is empty, if `x` and `y` differ in length,
    /// if `alpha` is not positive, or if the vectors disagree on dimension.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit_with_alpha(x: &[FeatureVector], y: &[String], alpha: f64) -> Result<Self> {
        if x.is_empty() {
            return Err(Error::Model("Empty training set".into()));
        }
        if x.len() != y.len() {
            return Err(Error::Model(format!(
                "Mismatched training inputs/labels ({} vs {})",
                x.len(),
                y.len()
            )));
        }
        if alpha <= 0.0 || !alpha.is_finite() {
            return Err(Error::Model(format!("alpha must be positive, got {alpha}")));
        }
        let n_features = x[0].dim();
        if let Some(bad) = x.iter().find(|v| v.dim() != n_features) {
            return Err(Error::Model(format!(
                "Inconsistent feature dimension {} (expected {n_features})",
                bad.dim()
            )));
        }

        let mut classes: Vec<String> = Vec::new();
        let mut class_count: Vec<f64> = Vec::new();
        let mut feature_count: Vec<Vec<f64>> = Vec::new();

        for (vector, label) in x.iter().zip(y) {
            let class_idx = classes.iter().position(|c| c == label).unwrap_or_else(|| {
                classes.push(label.clone());
                class_count.push(0.0);
                feature_count.push(vec![0.0; n_features]);
                classes.len() - 1
            });
            class_count[class_idx] += 1.0;
            for &(idx, weight) in vector.entries() {
                feature_count[class_idx][idx] += weight;
            }
        }

        let total = x.len() as f64;
        let class_log_prior = class_count.iter().map(|c| (c / total).ln()).collect();

        let smoothed_dim = alpha * n_features as f64;
        let feature_log_prob = feature_count
            .iter()
            .map(|counts| {
                let denom = (counts.iter().sum::<f64>() + smoothed_dim).ln();
                counts.iter().map(|c| (c + alpha).ln() - denom).collect()
            })
            .collect();

        Ok(Self {
            classes,
            class_log_prior,
            feature_log_prob,
            n_features,
            alpha,
        })
    }

    /// Joint log-likelihood of each class, in class order.
    #[must_use]
    pub fn joint_log_likelihood(&self, v: &FeatureVector) -> Vec<f64> {
        self.class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, log_prob)| {
                prior
                    + v.entries()
                        .iter()
                        .filter(|(idx, _)| *idx < self.n_features)
                        .map(|&(idx, weight)| weight * log_prob[idx])
                        .sum::<f64>()
            })
            .collect()
    }

    /// Label with the highest posterior. An empty vector reduces to the
    /// class with the highest prior; ties go to the earlier class.
    #[must_use]
    pub fn predict(&self, v: &FeatureVector) -> &str {
        let scores = self.joint_log_likelihood(v);
        let mut best = 0;
        for (idx, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = idx;
            }
        }
        &self.classes[best]
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Check internal consistency after deserialisation.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no classes or the prior and
    /// likelihood tables do not match the class and feature counts.
    pub fn validate(&self) -> Result<()> {
        let k = self.classes.len();
        if k == 0 {
            return Err(Error::Model("Classifier has no classes".into()));
        }
        if self.class_log_prior.len() != k || self.feature_log_prob.len() != k {
            return Err(Error::Model(format!(
                "Classifier has {k} classes but {} priors and {} likelihood rows",
                self.class_log_prior.len(),
                self.feature_log_prob.len()
            )));
        }
        if self
            .feature_log_prob
            .iter()
            .any(|row| row.len() != self.n_features)
        {
            return Err(Error::Model(format!(
                "Classifier likelihood rows do not match {} features",
                self.n_features
            )));
        }
        let finite = self.class_log_prior.iter().all(|p| p.is_finite())
            && self
                .feature_log_prob
                .iter()
                .flatten()
                .all(|p| p.is_finite());
        if !finite {
            return Err(Error::Model("Classifier weights are not finite".into()));
        }
        Ok(())
    }
}
