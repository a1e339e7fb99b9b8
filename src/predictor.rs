use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::encoding::{encode, FeatureVector};
use crate::error::{FraudError, Result};
use crate::model::Scorer;
use crate::transaction::TransactionInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Legitimate,
    FraudSuspected,
}

impl Verdict {
    /// Label 0 is legitimate, anything else is fraud.
    pub fn from_label(label: f64) -> Self {
        if label == 0.0 {
            Verdict::Legitimate
        } else {
            Verdict::FraudSuspected
        }
    }

    pub fn is_fraud(&self) -> bool {
        matches!(self, Verdict::FraudSuspected)
    }

    /// Machine-readable name, as serialized.
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Legitimate => "legitimate",
            Verdict::FraudSuspected => "fraud_suspected",
        }
    }

    /// Label shown to the user.
    pub fn headline(&self) -> &'static str {
        match self {
            Verdict::Legitimate => "Transaction Légitime",
            Verdict::FraudSuspected => "Fraude Suspectée",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.headline())
    }
}

/// Everything the display needs for one submission.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub verdict: Verdict,
    pub input: TransactionInput,
    pub features: FeatureVector,
}

/// Encodes submissions and scores them with an injected model.
#[derive(Clone)]
pub struct FraudPredictor {
    scorer: Arc<dyn Scorer>,
}

impl FraudPredictor {
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self { scorer }
    }

    /// Score one feature vector.
    pub fn predict(&self, features: &FeatureVector) -> Result<Verdict> {
        let matrix = features.to_matrix();
        let labels = self.scorer.predict(matrix.view())?;

        if labels.len() != 1 {
            return Err(FraudError::InferenceError(format!(
                "scorer returned {} labels for one row",
                labels.len()
            )));
        }
        let label = labels[0];
        if !label.is_finite() {
            return Err(FraudError::InferenceError(format!(
                "scorer returned non-finite label {label}"
            )));
        }

        Ok(Verdict::from_label(label))
    }

    /// Encode then score a submission.
    pub fn assess(&self, input: &TransactionInput) -> Result<Assessment> {
        let features = encode(input).inspect_err(|e| warn!("rejected submission: {e}"))?;
        let verdict = self.predict(&features)?;
        info!(verdict = ?verdict, "scored transaction");

        Ok(Assessment {
            verdict,
            input: input.clone(),
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, ArrayView2};

    struct FixedScorer(Vec<f64>);

    impl Scorer for FixedScorer {
        fn predict(&self, _rows: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
            Ok(Array1::from(self.0.clone()))
        }
    }

    fn predictor(labels: Vec<f64>) -> FraudPredictor {
        FraudPredictor::new(Arc::new(FixedScorer(labels)))
    }

    #[test]
    fn test_label_mapping() {
        assert_eq!(Verdict::from_label(0.0), Verdict::Legitimate);
        assert_eq!(Verdict::from_label(1.0), Verdict::FraudSuspected);
        assert_eq!(Verdict::from_label(2.0), Verdict::FraudSuspected);
        assert!(!Verdict::Legitimate.is_fraud());
        assert_eq!(Verdict::FraudSuspected.to_string(), "Fraude Suspectée");
    }

    #[test]
    fn test_predict_reads_single_label() {
        let features = FeatureVector::new([35.0, 3000.0, 650.0, 150.0, 5.0, 1.0, 0.28921569, 1.0]);
        assert_eq!(predictor(vec![0.0]).predict(&features).unwrap(), Verdict::Legitimate);
        assert_eq!(predictor(vec![1.0]).predict(&features).unwrap(), Verdict::FraudSuspected);
    }

    #[test]
    fn test_predict_rejects_malformed_scorer_output() {
        let features = FeatureVector::new([0.0; 8]);
        assert!(matches!(
            predictor(vec![]).predict(&features),
            Err(FraudError::InferenceError(_))
        ));
        assert!(matches!(
            predictor(vec![0.0, 1.0]).predict(&features),
            Err(FraudError::InferenceError(_))
        ));
        assert!(matches!(
            predictor(vec![f64::NAN]).predict(&features),
            Err(FraudError::InferenceError(_))
        ));
    }

    #[test]
    fn test_assess_carries_input_and_features() {
        let input = TransactionInput::default();
        let assessment = predictor(vec![1.0]).assess(&input).unwrap();
        assert_eq!(assessment.verdict, Verdict::FraudSuspected);
        assert_eq!(assessment.input, input);
        assert_eq!(assessment.features.values[6], 0.39509804);
    }
}
