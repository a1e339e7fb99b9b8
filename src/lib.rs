//! Fraud check for a single card transaction.
//!
//! Encodes the eight attributes of a transaction into the feature vector a
//! pre-trained gradient-boosted classifier expects, scores it, and maps the
//! label to a verdict.

pub mod config;
pub mod encoding;
pub mod error;
pub mod model;
pub mod predictor;
pub mod report;
pub mod transaction;


pub use encoding::{encode, FeatureVector, FEATURE_NAMES, NUM_FEATURES};
pub use error::{FraudError, Result};
pub use model::{GbdtScorer, ModelFormat, Scorer};
pub use predictor::{Assessment, FraudPredictor, Verdict};
pub use transaction::{CardType, Gender, RawTransaction, Region, TransactionInput};
