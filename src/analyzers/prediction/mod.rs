//! Algorithmic complexity prediction.
//!
//! A linear softmax model maps ten algorithmic features to one of five
//! complexity classes. When a unit has no function bodies, or too little code,
//! the predictor abstains instead of guessing.

pub mod features;
pub mod model;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PredictorConfig;
use crate::core::Result;

pub use features::{callee_name, extract_features, ComplexityFeatures};
pub use model::{describe, LinearModel, CLASSES};

/// Predictor output: an estimate or the reason it abstained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Estimate {
        predicted_complexity: String,
        complexity_description: String,
        confidence: f64,
        all_probabilities: BTreeMap<String, f64>,
    },
    Abstained {
        error: String,
    },
}

impl Prediction {
    pub fn is_estimate(&self) -> bool {
        matches!(self, Self::Estimate { .. })
    }
}

/// Features and prediction as reported in analysis results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlComplexity {
    pub features: ComplexityFeatures,
    pub prediction: Prediction,
}

/// Complexity predictor.
#[derive(Debug, Clone)]
pub struct ComplexityPredictor {
    model: LinearModel,
    min_code_lines: usize,
}

impl Default for ComplexityPredictor {
    fn default() -> Self {
        Self::new(LinearModel::builtin(), PredictorConfig::default().min_code_lines)
    }
}

impl ComplexityPredictor {
    pub fn new(model: LinearModel, min_code_lines: usize) -> Self {
        Self {
            model,
            min_code_lines,
        }
    }

    /// Build from configuration, loading `model_path` when set.
    ///
    /// Must not be called from inside an async runtime. A model that cannot be
    /// read within `io_budget`, or fails validation, is replaced by the
    /// built-in weights.
    pub fn from_config(config: &PredictorConfig, io_budget: Duration) -> Self {
        let model = match &config.model_path {
            None => LinearModel::builtin(),
            Some(path) => match load_blocking(path, io_budget) {
                Ok(model) => {
                    tracing::info!("Loaded complexity model from {}", path.display());
                    model
                }
                Err(e) => {
                    tracing::warn!(
                        "Falling back to built-in complexity model ({}): {e}",
                        path.display()
                    );
                    LinearModel::builtin()
                }
            },
        };
        Self::new(model, config.min_code_lines)
    }

    /// Active model.
    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    /// Predict, or abstain when the evidence is insufficient.
    pub fn predict(
        &self,
        features: &ComplexityFeatures,
        function_bodies: usize,
        loc: usize,
    ) -> Prediction {
        if function_bodies == 0 {
            return Prediction::Abstained {
                error: "Insufficient features: no function or method bodies found".to_string(),
            };
        }
        if loc < self.min_code_lines {
            return Prediction::Abstained {
                error: format!(
                    "Insufficient features: {loc} lines of code (minimum {})",
                    self.min_code_lines
                ),
            };
        }

        let probabilities = self.model.probabilities(&features.to_vector());
        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = i;
            }
        }

        let class = self.model.classes[best].clone();
        Prediction::Estimate {
            complexity_description: describe(&class).to_string(),
            predicted_complexity: class,
            confidence: probabilities[best],
            all_probabilities: self
                .model
                .classes
                .iter()
                .cloned()
                .zip(probabilities.iter().copied())
                .collect(),
        }
    }
}

fn load_blocking(path: &Path, budget: Duration) -> Result<LinearModel> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(model::load_model(path, budget))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn probabilities(prediction: &Prediction) -> &BTreeMap<String, f64> {
        match prediction {
            Prediction::Estimate {
                all_probabilities, ..
            } => all_probabilities,
            Prediction::Abstained { error } => panic!("unexpected abstention: {error}"),
        }
    }

    fn class_of(prediction: &Prediction) -> &str {
        match prediction {
            Prediction::Estimate {
                predicted_complexity,
                ..
            } => predicted_complexity,
            Prediction::Abstained { error } => panic!("unexpected abstention: {error}"),
        }
    }

    #[test]
    fn test_abstains_without_bodies() {
        let predictor = ComplexityPredictor::default();
        let prediction = predictor.predict(&ComplexityFeatures::default(), 0, 50);
        assert!(!prediction.is_estimate());
        let json = serde_json::to_value(&prediction).unwrap();
        assert!(json["error"].as_str().unwrap().contains("no function"));
    }

    #[test]
    fn test_abstains_on_tiny_input() {
        let predictor = ComplexityPredictor::default();
        let prediction = predictor.predict(&ComplexityFeatures::default(), 1, 2);
        assert!(!prediction.is_estimate());
    }

    #[test]
    fn test_nested_loops_predict_quadratic() {
        let predictor = ComplexityPredictor::default();
        let features = ComplexityFeatures {
            no_of_loop: 2,
            nested_loop_depth: 2,
            no_of_ifs: 1,
            ..Default::default()
        };
        let prediction = predictor.predict(&features, 1, 10);
        assert_eq!(class_of(&prediction), "n_square");
    }

    #[test]
    fn test_single_loop_predicts_linear() {
        let predictor = ComplexityPredictor::default();
        let features = ComplexityFeatures {
            no_of_loop: 1,
            nested_loop_depth: 1,
            ..Default::default()
        };
        let prediction = predictor.predict(&features, 1, 10);
        assert_eq!(class_of(&prediction), "n");
    }

    #[test]
    fn test_sort_predicts_nlogn() {
        let predictor = ComplexityPredictor::default();
        let features = ComplexityFeatures {
            no_of_sort: 1,
            ..Default::default()
        };
        let prediction = predictor.predict(&features, 1, 10);
        assert_eq!(class_of(&prediction), "nlogn");
    }

    #[test]
    fn test_halving_predicts_log() {
        let predictor = ComplexityPredictor::default();
        let features = ComplexityFeatures {
            no_of_loop: 1,
            nested_loop_depth: 1,
            halving_present: 1,
            no_of_ifs: 1,
            ..Default::default()
        };
        let prediction = predictor.predict(&features, 1, 10);
        assert_eq!(class_of(&prediction), "logn");
    }

    #[test]
    fn test_estimate_probabilities_sum_to_one() {
        let predictor = ComplexityPredictor::default();
        let prediction = predictor.predict(&ComplexityFeatures::default(), 1, 10);
        let sum: f64 = probabilities(&prediction).values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["predicted_complexity"], "1");
        assert_eq!(json["complexity_description"], "O(1)");
    }

    #[test]
    fn test_from_config_falls_back_on_bad_model() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        let config = PredictorConfig {
            model_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let predictor = ComplexityPredictor::from_config(&config, Duration::from_secs(1));
        assert_eq!(predictor.model(), &LinearModel::builtin());
    }

    #[test]
    fn test_from_config_loads_custom_model() {
        let mut custom = LinearModel::builtin();
        custom.bias[2] = 50.0;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&custom).unwrap().as_bytes())
            .unwrap();
        let config = PredictorConfig {
            model_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let predictor = ComplexityPredictor::from_config(&config, Duration::from_secs(1));
        let prediction = predictor.predict(&ComplexityFeatures::default(), 1, 10);
        assert_eq!(class_of(&prediction), "n");
    }
}
