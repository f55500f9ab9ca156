//! Softmax linear model over algorithmic features.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::features::FEATURE_COUNT;
use crate::core::{Error, Result};

/// Complexity classes in model order.
pub const CLASSES: [&str; 5] = ["1", "logn", "n", "nlogn", "n_square"];

/// Big-O description of a class label.
pub fn describe(class: &str) -> &'static str {
    match class {
        "1" => "O(1)",
        "logn" => "O(log n)",
        "n" => "O(n)",
        "nlogn" => "O(n log n)",
        "n_square" => "O(n²)",
        _ => "unknown",
    }
}

/// One row of weights per class, applied to normalized features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<String>,
    pub bias: Vec<f64>,
    pub weights: Vec<Vec<f64>>,
}

// Feature order: ifs, loops, breaks, pq, sort, set, map, recursion, depth, halving.
const BUILTIN_BIAS: [f64; 5] = [1.5, -1.0, -0.2, -1.5, -6.0];
const BUILTIN_WEIGHTS: [[f64; FEATURE_COUNT]; 5] = [
    [0.0, -2.0, 0.0, 0.0, -1.5, 0.0, 0.0, -2.0, -1.5, -0.5],
    [0.0, 0.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5, -0.5, 3.0],
    [0.0, 2.0, 0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 1.5, 3.0, 0.0, 0.0, 0.5, 0.25, 0.0],
    [0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 4.0, 0.0],
];

impl Default for LinearModel {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LinearModel {
    /// Weights shipped with the crate.
    pub fn builtin() -> Self {
        Self {
            classes: CLASSES.iter().map(|c| c.to_string()).collect(),
            bias: BUILTIN_BIAS.to_vec(),
            weights: BUILTIN_WEIGHTS.iter().map(|row| row.to_vec()).collect(),
        }
    }

    /// Parse and validate a model from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(text)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(Error::config("model has no classes"));
        }
        if self.classes.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::config("model has an empty class label"));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = self.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(Error::config(format!("model repeats class label {dup:?}")));
        }
        if self.bias.len() != self.classes.len() || self.weights.len() != self.classes.len() {
            return Err(Error::config(format!(
                "model shape mismatch: {} classes, {} biases, {} weight rows",
                self.classes.len(),
                self.bias.len(),
                self.weights.len()
            )));
        }
        if let Some(row) = self.weights.iter().find(|r| r.len() != FEATURE_COUNT) {
            return Err(Error::config(format!(
                "model weight row has {} entries, expected {FEATURE_COUNT}",
                row.len()
            )));
        }
        let finite = self
            .bias
            .iter()
            .chain(self.weights.iter().flatten())
            .all(|v| v.is_finite());
        if !finite {
            return Err(Error::config("model contains non-finite weights"));
        }
        Ok(())
    }

    /// Class probabilities for a normalized input. Sums to 1.
    pub fn probabilities(&self, input: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| bias + row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>())
            .collect();

        // Shift by the max logit for numerical stability.
        let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / total).collect()
    }
}

/// Read a model file, bounded by `budget`.
pub async fn load_model(path: &Path, budget: Duration) -> Result<LinearModel> {
    let text = tokio::time::timeout(budget, tokio::fs::read_to_string(path))
        .await
        .map_err(|_| Error::timeout("model load", budget))??;
    LinearModel::from_json(&text)
}
