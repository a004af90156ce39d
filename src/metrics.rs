//! Holdout evaluation metrics

use serde::Serialize;
use std::fmt;

/// Confusion matrix for a `K`-class classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    /// Class names, row and column order.
    pub classes: Vec<String>,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    #[must_use]
    pub fn new(classes: Vec<String>) -> Self {
        let k = classes.len();
        Self {
            classes,
            counts: vec![0; k * k],
        }
    }

    /// Record one prediction. Unknown labels are ignored.
    pub fn add(&mut self, truth: &str, predicted: &str) {
        let (Some(t), Some(p)) = (self.index(truth), self.index(predicted)) else {
            return;
        };
        let idx = t * self.classes.len() + p;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    #[must_use]
    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.classes.len() + predicted]
    }

    fn index(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}

/// Precision/recall statistics for a single class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub label: String,
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`.
    pub recall: f64,
    pub f1: f64,
    /// Number of true examples of the class.
    pub support: u32,
}

/// Accuracy, per-class metrics and confusion matrix on a holdout split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub per_class: Vec<ClassReport>,
    pub confusion: ConfusionMatrix,
}

impl EvaluationReport {
    /// Score predictions against the truth.
    ///
    /// Row order is `classes` followed by any label that only appears in
    /// `truth` or `predicted`, in first-appearance order.
    #[must_use]
    pub fn from_predictions(classes: &[String], truth: &[String], predicted: &[String]) -> Self {
        let mut all = classes.to_vec();
        for label in truth.iter().chain(predicted) {
            if !all.contains(label) {
                all.push(label.clone());
            }
        }

        let mut confusion = ConfusionMatrix::new(all);
        for (t, p) in truth.iter().zip(predicted) {
            confusion.add(t, p);
        }

        Self {
            accuracy: accuracy(&confusion),
            per_class: per_class(&confusion),
            confusion,
        }
    }
}

#[allow(clippy::cast_lossless)]
fn per_class(cm: &ConfusionMatrix) -> Vec<ClassReport> {
    let k = cm.classes.len();
    (0..k)
        .map(|class_idx| {
            let tp = f64::from(cm.get(class_idx, class_idx));
            let mut fp = 0.0;
            let mut fn_ = 0.0;
            let mut support = 0u32;
            for j in 0..k {
                let v = cm.get(class_idx, j);
                support = support.saturating_add(v);
                if j != class_idx {
                    fn_ += f64::from(v);
                    fp += f64::from(cm.get(j, class_idx));
                }
            }
            let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
            let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassReport {
                label: cm.classes[class_idx].clone(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect()
}

fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u32 = (0..cm.classes.len()).map(|i| cm.get(i, i)).sum();
    f64::from(correct) / f64::from(total)
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
        writeln!(f)?;
        writeln!(f, "Classification Report:")?;
        writeln!(
            f,
            "{:>16} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for row in &self.per_class {
            writeln!(
                f,
                "{:>16} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                row.label, row.precision, row.recall, row.f1, row.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Confusion Matrix (rows = truth, columns = predicted):")?;
        write!(f, "{:>16}", "")?;
        for label in &self.confusion.classes {
            write!(f, " {label:>10}")?;
        }
        writeln!(f)?;
        let k = self.confusion.classes.len();
        for (t, label) in self.confusion.classes.iter().enumerate() {
            write!(f, "{label:>16}")?;
            for p in 0..k {
                write!(f, " {:>10}", self.confusion.get(t, p))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
