//! Scoring model wrapper
//!
//! The classifier is consumed through the [`Scorer`] trait so the predictor
//! can be handed a real model or a stand-in. [`GbdtScorer`] wraps the
//! `gbdt` crate and loads either:
//! - an XGBoost JSON dump (`binary:logistic` objective), or
//! - a gbdt-rs native JSON model.
//!
//! Dump splits may name a feature by index (`"f3"`, `3`) or by column name
//! (`"montant_transaction"`), as XGBoost writes them when trained on a named
//! DataFrame. Both are mapped to the index in [`FEATURE_NAMES`] before the
//! dump reaches gbdt; any split outside the eight columns is rejected.
//!
//! A model is only handed out after it scores one row, so a model that
//! cannot work with the feature vector fails at startup rather than on
//! every request.
//!
//! Note: the gbdt crate works in `f32`, the feature vector in `f64`.
//! Conversions happen at the crate boundary.

use std::io::{BufReader, Cursor};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::encoding::{FEATURE_NAMES, NUM_FEATURES};
use crate::error::{FraudError, Result};

const XGBOOST_OBJECTIVE: &str = "binary:logistic";

/// A pre-trained classifier. Given rows of `NUM_FEATURES` columns, returns
/// one class label per row.
pub trait Scorer: Send + Sync {
    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// XGBoost JSON dump
    #[default]
    Xgboost,
    /// gbdt-rs native JSON
    Native,
}

pub struct GbdtScorer {
    model: GBDT,
    threshold: f64,
}

impl GbdtScorer {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;

    /// Load a model from disk. Any failure is reported as `ModelUnavailable`.
    pub fn load(path: &Path, format: ModelFormat) -> Result<Self> {
        let unavailable = |reason: String| FraudError::ModelUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(unavailable("file not found".to_string()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| unavailable("invalid UTF-8 in model path".to_string()))?;

        let model = match format {
            ModelFormat::Xgboost => {
                let dump = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
                parse_xgboost_dump(&dump).map_err(unavailable)?
            }
            ModelFormat::Native => GBDT::load_model(path_str)
                .map_err(|e| unavailable(format!("failed to load GBDT model: {e}")))?,
        };
        check_scores(&model).map_err(unavailable)?;

        info!(path = %path.display(), ?format, "loaded scoring model");
        Ok(Self::from_trained(model))
    }

    /// Parse a gbdt-rs native JSON model held in memory.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: GBDT = serde_json::from_str(json)
            .map_err(|e| in_memory(format!("failed to parse GBDT JSON: {e}")))?;
        check_scores(&model).map_err(in_memory)?;
        Ok(Self::from_trained(model))
    }

    /// Parse an XGBoost dump held in memory.
    pub fn from_xgboost_json(dump: &str) -> Result<Self> {
        let model = parse_xgboost_dump(dump).map_err(in_memory)?;
        check_scores(&model).map_err(in_memory)?;
        Ok(Self::from_trained(model))
    }

    pub fn from_trained(model: GBDT) -> Self {
        Self {
            model,
            threshold: Self::DEFAULT_THRESHOLD,
        }
    }

    /// Probability at or above which a row is labelled 1. Must lie in (0, 1).
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        Self::check_threshold(threshold)?;
        self.threshold = threshold;
        Ok(self)
    }

    // NaN fails both comparisons, so it is rejected too
    pub fn check_threshold(threshold: f64) -> Result<()> {
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(FraudError::Config(format!(
                "model.threshold must be in (0, 1), got {threshold}"
            )));
        }
        Ok(())
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Raw fraud probabilities, one per row.
    pub fn probabilities(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        if rows.ncols() != NUM_FEATURES {
            return Err(FraudError::InferenceError(format!(
                "expected {NUM_FEATURES} feature columns, got {}",
                rows.ncols()
            )));
        }

        let data: Vec<Data> = rows
            .outer_iter()
            .map(|row| Data::new_test_data(row.iter().map(|&v| v as f32).collect(), None))
            .collect();

        // Loaded models were checked already, but `from_trained` ones were not.
        let preds = panic::catch_unwind(AssertUnwindSafe(|| self.model.predict(&data)))
            .map_err(|_| FraudError::InferenceError("GBDT model panicked during predict".into()))?;

        Ok(preds.into_iter().map(f64::from).collect())
    }
}

// Load errors for models that never came from a file
fn in_memory(reason: String) -> FraudError {
    FraudError::ModelUnavailable {
        path: "<memory>".into(),
        reason,
    }
}

// Resolves a dump split to a column index
fn split_index(split: &Value) -> std::result::Result<usize, String> {
    let index = match split {
        Value::Number(n) => n.as_u64().map(|i| i as usize),
        Value::String(name) => FEATURE_NAMES
            .iter()
            .position(|col| *col == name.as_str())
            .or_else(|| name.strip_prefix('f').and_then(|d| d.parse().ok())),
        _ => None,
    };
    match index {
        Some(i) if i < NUM_FEATURES => Ok(i),
        Some(i) => Err(format!(
            "split on feature {i}, but the model input has {NUM_FEATURES} columns"
        )),
        None => Err(format!("unknown split feature {split}")),
    }
}

// Rewrites every split in a tree to a numeric index, recursing into children
fn normalize_splits(node: &mut Value) -> std::result::Result<(), String> {
    if let Some(split) = node.get("split") {
        let index = split_index(split)?;
        node["split"] = Value::from(index as u64);
    }
    if let Some(children) = node.get_mut("children").and_then(Value::as_array_mut) {
        for child in children {
            normalize_splits(child)?;
        }
    }
    Ok(())
}

/// Parse an XGBoost dump: a base-score line followed by a JSON array of trees.
fn parse_xgboost_dump(dump: &str) -> std::result::Result<GBDT, String> {
    let (base_score, trees) = dump
        .split_once('\n')
        .ok_or_else(|| "expected a base score line followed by the trees".to_string())?;

    let mut trees: Value =
        serde_json::from_str(trees).map_err(|e| format!("failed to parse XGBoost trees: {e}"))?;
    let nodes = trees
        .as_array_mut()
        .ok_or_else(|| "XGBoost trees must be a JSON array".to_string())?;
    for tree in nodes.iter_mut() {
        normalize_splits(tree)?;
    }
    debug!(trees = nodes.len(), "parsed XGBoost dump");

    let normalized = format!("{}\n{}", base_score.trim(), trees);
    GBDT::from_xgboost_reader(BufReader::new(Cursor::new(normalized)), XGBOOST_OBJECTIVE)
        .map_err(|e| format!("failed to load XGBoost dump: {e}"))
}

// Scores a row of zeros; a model that panics or yields nothing is unusable
fn check_scores(model: &GBDT) -> std::result::Result<(), String> {
    let zeros = vec![Data::new_test_data(vec![0.0; NUM_FEATURES], None)];
    let preds = panic::catch_unwind(AssertUnwindSafe(|| model.predict(&zeros)))
        .map_err(|_| "model cannot score a feature vector".to_string())?;
    match preds.first() {
        Some(p) if p.is_finite() => Ok(()),
        Some(p) => Err(format!("model scored a zero row as {p}")),
        None => Err("model returned no score".to_string()),
    }
}

impl Scorer for GbdtScorer {
    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let labels = self
            .probabilities(rows)?
            .into_iter()
            .map(|p| if p >= self.threshold { 1.0 } else { 0.0 })
            .collect::<Vec<_>>();
        Ok(Array1::from(labels))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gbdt::config::Config;

    /// Train a tiny model where a large transaction amount means fraud.
    /// Test-only: the crate itself never trains.
    pub(crate) fn train_amount_model() -> GBDT {
        let mut cfg = Config::new();
        cfg.set_feature_size(NUM_FEATURES);
        cfg.set_max_depth(2);
        cfg.set_iterations(10);
        cfg.set_shrinkage(0.3);
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_min_leaf_size(1);

        let mut training: Vec<Data> = (0..40)
            .map(|i| {
                let fraud = i % 2 == 0;
                let amount = if fraud { 5000.0 + i as f32 } else { 20.0 + i as f32 };
                let features = vec![35.0, 3000.0, 650.0, amount, 5.0, 1.0, 0.28921569, 1.0];
                let label = if fraud { 1.0 } else { -1.0 };
                Data::new_training_data(features, 1.0, label, None)
            })
            .collect();

        let mut model = GBDT::new(&cfg);
        model.fit(&mut training);
        model
    }

    /// One tree splitting montant_transaction at 1000, written the way
    /// XGBoost dumps it: a base-score line, then the trees.
    fn amount_dump(split: &str) -> String {
        format!(
            r#"0.5
[
  {{ "nodeid": 0, "depth": 0, "split": {split}, "split_condition": 1000.0,
     "yes": 1, "no": 2, "missing": 1,
     "children": [
       {{ "nodeid": 1, "leaf": -2.0 }},
       {{ "nodeid": 2, "leaf": 2.0 }}
     ] }}
]
"#
        )
    }

    fn row(amount: f64) -> ndarray::Array2<f64> {
        ndarray::arr2(&[[35.0, 3000.0, 650.0, amount, 5.0, 1.0, 0.28921569, 1.0]])
    }

    #[test]
    fn test_trained_model_labels_rows() {
        let scorer = GbdtScorer::from_trained(train_amount_model());
        let fraud = scorer.predict(row(5010.0).view()).unwrap();
        let legit = scorer.predict(row(25.0).view()).unwrap();
        assert_eq!(fraud.len(), 1);
        assert_eq!(fraud[0], 1.0);
        assert_eq!(legit[0], 0.0);
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let scorer = GbdtScorer::from_trained(train_amount_model());
        for amount in [0.0, 100.0, 2500.0, 9000.0] {
            let p = scorer.probabilities(row(amount).view()).unwrap()[0];
            assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
        }
    }

    #[test]
    fn test_threshold_controls_label() {
        let scorer = GbdtScorer::from_trained(train_amount_model());
        let p = scorer.probabilities(row(5010.0).view()).unwrap()[0];

        let strict = scorer.with_threshold(p + 1e-6).unwrap();
        assert_eq!(strict.predict(row(5010.0).view()).unwrap()[0], 0.0);
        let lenient = strict.with_threshold(p).unwrap();
        assert_eq!(lenient.threshold(), p);
        assert_eq!(lenient.predict(row(5010.0).view()).unwrap()[0], 1.0);
    }

    #[test]
    fn test_wrong_width_is_inference_error() {
        let scorer = GbdtScorer::from_trained(train_amount_model());
        let narrow = ndarray::arr2(&[[1.0, 2.0, 3.0]]);
        assert!(matches!(
            scorer.predict(narrow.view()),
            Err(FraudError::InferenceError(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_model_unavailable() {
        let err = GbdtScorer::load(Path::new("/nonexistent/xgb_model.json"), ModelFormat::Xgboost)
            .err()
            .expect("load should fail");
        assert!(matches!(err, FraudError::ModelUnavailable { .. }));
        assert!(err.to_string().contains("xgb_model.json"));
    }

    #[test]
    fn test_load_garbage_is_model_unavailable() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not a model").unwrap();
        assert!(matches!(
            GbdtScorer::load(tmp.path(), ModelFormat::Native),
            Err(FraudError::ModelUnavailable { .. })
        ));
        assert!(matches!(
            GbdtScorer::from_json("{"),
            Err(FraudError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn test_native_model_roundtrip_through_disk() {
        let model = train_amount_model();
        let tmp = tempfile::NamedTempFile::new().unwrap();
        model.save_model(tmp.path().to_str().unwrap()).unwrap();

        let loaded = GbdtScorer::load(tmp.path(), ModelFormat::Native).unwrap();
        let original = GbdtScorer::from_trained(model);
        let a = original.probabilities(row(5010.0).view()).unwrap()[0];
        let b = loaded.probabilities(row(5010.0).view()).unwrap()[0];
        assert!((a - b).abs() < 1e-6, "loaded model should match: {a} vs {b}");

        let json = serde_json::to_string(&original.model).unwrap();
        let from_json = GbdtScorer::from_json(&json).unwrap();
        assert_eq!(from_json.predict(row(5010.0).view()).unwrap()[0], 1.0);
    }

    #[test]
    fn test_xgboost_dump_from_disk() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), amount_dump("\"f3\"")).unwrap();

        let scorer = GbdtScorer::load(tmp.path(), ModelFormat::Xgboost).unwrap();
        let lo = scorer.probabilities(row(150.0).view()).unwrap()[0];
        let hi = scorer.probabilities(row(5000.0).view()).unwrap()[0];
        assert!(lo < 0.5 && hi > 0.5, "expected lo < 0.5 < hi, got {lo} and {hi}");
        assert_eq!(scorer.predict(row(150.0).view()).unwrap()[0], 0.0);
        assert_eq!(scorer.predict(row(5000.0).view()).unwrap()[0], 1.0);
    }

    #[test]
    fn test_xgboost_dump_with_column_names() {
        for split in ["\"montant_transaction\"", "3"] {
            let scorer = GbdtScorer::from_xgboost_json(&amount_dump(split)).unwrap();
            assert_eq!(scorer.predict(row(150.0).view()).unwrap()[0], 0.0, "split {split}");
            assert_eq!(scorer.predict(row(5000.0).view()).unwrap()[0], 1.0, "split {split}");
        }
    }

    #[test]
    fn test_xgboost_split_outside_feature_vector_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), amount_dump("\"f12\"")).unwrap();
        let err = GbdtScorer::load(tmp.path(), ModelFormat::Xgboost)
            .err()
            .expect("load should fail");
        assert!(matches!(err, FraudError::ModelUnavailable { .. }));
        assert!(err.to_string().contains("feature 12"), "got: {err}");

        assert!(matches!(
            GbdtScorer::from_xgboost_json(&amount_dump("\"merchant_id\"")),
            Err(FraudError::ModelUnavailable { .. })
        ));
        assert!(matches!(
            GbdtScorer::from_xgboost_json("0.5"),
            Err(FraudError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn test_untrained_model_rejected_at_load() {
        let mut cfg = Config::new();
        cfg.set_feature_size(NUM_FEATURES);
        cfg.set_iterations(5);
        let untrained = GBDT::new(&cfg);
        let json = serde_json::to_string(&untrained).unwrap();

        assert!(matches!(
            GbdtScorer::from_json(&json),
            Err(FraudError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn test_with_threshold_rejects_out_of_range() {
        for bad in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let scorer = GbdtScorer::from_trained(train_amount_model());
            assert!(
                matches!(scorer.with_threshold(bad), Err(FraudError::Config(_))),
                "threshold {bad} should be rejected"
            );
        }
        let scorer = GbdtScorer::from_trained(train_amount_model()).with_threshold(0.8).unwrap();
        assert_eq!(scorer.threshold(), 0.8);
    }
}
