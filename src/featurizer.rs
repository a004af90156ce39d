//! TF-IDF featurizer
//!
//! Fitting builds a vocabulary (stop words removed, near-universal
//! tokens pruned) and smoothed IDF weights. Transforming maps text to an
//! L2-normalised sparse vector over that fixed vocabulary; tokens not
//! seen at fit time are dropped.

use crate::error::{Error, Result};
use crate::tokenize::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tokens present in more than this fraction of documents are pruned.
pub const DEFAULT_MAX_DF: f64 = 0.95;

/// Sparse feature vector: `(index, weight)` pairs sorted by index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    /// Build from unsorted entries. Duplicated indices are summed and
    /// entries outside `dim` are dropped.
    #[must_use]
    pub fn from_entries(dim: usize, entries: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (idx, weight) in entries {
            if idx < dim {
                *merged.entry(idx).or_insert(0.0) += weight;
            }
        }
        Self {
            dim,
            entries: merged.into_iter().collect(),
        }
    }

    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    #[must_use]
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A fitted TF-IDF vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfFeaturizer {
    /// token -> column index, indices assigned in token order.
    vocabulary: BTreeMap<String, usize>,
    /// IDF weight per column.
    idf: Vec<f64>,
    max_df: f64,
}

impl TfidfFeaturizer {
    /// Fit on a corpus with the default document-frequency ceiling.
    ///
    /// # Errors
    ///
    /// See [`TfidfFeaturizer::fit_with_max_df`].
    pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Result<Self> {
        Self::fit_with_max_df(corpus, DEFAULT_MAX_DF)
    }

    /// Fit on a corpus, pruning tokens with `df > max_df * n_documents`.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus is empty or `max_df` is outside
    /// `(0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit_with_max_df<S: AsRef<str>>(corpus: &[S], max_df: f64) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::Model("Cannot fit featurizer on an empty corpus".into()));
        }
        if !(0.0..=1.0).contains(&max_df) || max_df == 0.0 {
            return Err(Error::Model(format!("max_df must be in (0, 1], got {max_df}")));
        }

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus {
            let unique: BTreeSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for token in unique {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }

        let n_documents = corpus.len() as f64;
        let ceiling = max_df * n_documents;

        let kept: Vec<(String, usize)> = document_frequency
            .into_iter()
            .filter(|(_, df)| (*df as f64) <= ceiling)
            .collect();

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (idx, (token, df)) in kept.into_iter().enumerate() {
            idf.push(((1.0 + n_documents) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(token, idx);
        }

        Ok(Self {
            vocabulary,
            idf,
            max_df,
        })
    }

    /// Map text to TF-IDF weights over the fitted vocabulary.
    #[must_use]
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        let normalised = weighted.into_iter().map(|(idx, w)| {
            if norm > 0.0 { (idx, w / norm) } else { (idx, w) }
        });

        FeatureVector::from_entries(self.dim(), normalised)
    }

    /// Transform every document of a corpus.
    #[must_use]
    pub fn transform_all<S: AsRef<str>>(&self, corpus: &[S]) -> Vec<FeatureVector> {
        corpus.iter().map(|doc| self.transform(doc.as_ref())).collect()
    }

    /// Vocabulary size, i.e. the dimension of every produced vector.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.idf.len()
    }

    /// Document-frequency ceiling the vocabulary was pruned with.
    #[must_use]
    pub const fn max_df(&self) -> f64 {
        self.max_df
    }

    #[must_use]
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.vocabulary.get(token).copied()
    }

    /// Check internal consistency after deserialisation.
    ///
    /// # Errors
    ///
    /// Returns an error if the vocabulary and idf table disagree in size
    /// or a vocabulary index is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(Error::Model(format!(
                "Featurizer vocabulary has {} tokens but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        let mut seen = vec![false; self.idf.len()];
        for (token, &idx) in &self.vocabulary {
            if idx >= seen.len() || seen[idx] {
                return Err(Error::Model(format!(
                    "Featurizer index {idx} for token {token:?} is invalid"
                )));
            }
            seen[idx] = true;
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err(Error::Model("Featurizer idf weights are not finite".into()));
        }
        Ok(())
    }
}
