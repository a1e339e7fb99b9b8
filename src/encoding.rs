//! Feature encoding for the fraud classifier.
//!
//! The classifier was trained on eight columns in a fixed order. Any
//! permutation still scores, just wrongly, so the order lives in one place:
//! [`FEATURE_NAMES`].

use ndarray::{arr2, Array2};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::transaction::{CardType, Gender, Region, TransactionInput};

pub const NUM_FEATURES: usize = 8;

/// Column names, in the order the model expects them.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "age",
    "salaire",
    "score_credit",
    "montant_transaction",
    "anciennete_compte",
    "type_carte",
    "region",
    "genre",
];

/// Share of each region in the training data.
pub const REGION_FREQ_HOUSTON: f64 = 0.39509804;
pub const REGION_FREQ_ORLANDO: f64 = 0.31568627;
pub const REGION_FREQ_MIAMI: f64 = 0.28921569;

impl CardType {
    pub fn code(&self) -> f64 {
        match self {
            CardType::MasterCard => 0.0,
            CardType::VisaCard => 1.0,
        }
    }
}

impl Gender {
    pub fn code(&self) -> f64 {
        match self {
            Gender::Homme => 0.0,
            Gender::Femme => 1.0,
        }
    }
}

impl Region {
    /// Frequency encoding.
    pub fn code(&self) -> f64 {
        match self {
            Region::Houston => REGION_FREQ_HOUSTON,
            Region::Orlando => REGION_FREQ_ORLANDO,
            Region::Miami => REGION_FREQ_MIAMI,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub values: [f64; NUM_FEATURES],
}

impl FeatureVector {
    pub fn new(values: [f64; NUM_FEATURES]) -> Self {
        Self { values }
    }

    /// One-row matrix, the shape the scorer consumes.
    pub fn to_matrix(&self) -> Array2<f64> {
        arr2(&[self.values])
    }

    /// Pairs each value with its column name.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.into_iter().zip(self.values.iter().copied())
    }
}

/// Encode a submission into the model's feature vector.
///
/// Numeric fields pass through unchanged. Fails with `OutOfRange` when a
/// numeric field is outside its domain.
pub fn encode(input: &TransactionInput) -> Result<FeatureVector> {
    input.validate()?;

    let vector = FeatureVector::new([
        input.age as f64,
        input.salaire,
        input.score_credit as f64,
        input.montant_transaction,
        input.anciennete_compte as f64,
        input.type_carte.code(),
        input.region.code(),
        input.genre.code(),
    ]);
    debug!(features = ?vector.values, "encoded transaction");
    Ok(vector)
}
