use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FraudError, Result};

pub const AGE_RANGE: (i64, i64) = (18, 100);
pub const SCORE_CREDIT_RANGE: (i64, i64) = (300, 900);
pub const ANCIENNETE_RANGE: (i64, i64) = (0, 100);

// Closed domains of the three categorical fields. Serialized under the
// form's names so the read-back shows what the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardType {
    #[serde(rename = "Master_card")]
    MasterCard,
    #[serde(rename = "Visa_card")]
    VisaCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Region {
    Houston,
    Orlando,
    Miami,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Homme,
    Femme,
}

impl CardType {
    pub const ALL: [CardType; 2] = [CardType::MasterCard, CardType::VisaCard];

    // Name as offered by the form's select box
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::MasterCard => "Master_card",
            CardType::VisaCard => "Visa_card",
        }
    }
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Houston, Region::Orlando, Region::Miami];

    // Name as offered by the form's select box
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Houston => "Houston",
            Region::Orlando => "Orlando",
            Region::Miami => "Miami",
        }
    }
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Homme, Gender::Femme];

    // Name as offered by the form's select box
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Homme => "Homme",
            Gender::Femme => "Femme",
        }
    }
}

// Category names are matched exactly, the way the form offers them.
fn parse_category<T: Copy>(
    field: &'static str,
    candidates: &[T],
    name: fn(&T) -> &'static str,
    value: &str,
) -> Result<T> {
    candidates
        .iter()
        .find(|c| name(*c) == value)
        .copied()
        .ok_or_else(|| FraudError::UnknownCategory {
            field,
            value: value.to_string(),
        })
}

impl FromStr for CardType {
    type Err = FraudError;

    fn from_str(s: &str) -> Result<Self> {
        parse_category("type_carte", &Self::ALL, Self::as_str, s)
    }
}

impl FromStr for Region {
    type Err = FraudError;

    fn from_str(s: &str) -> Result<Self> {
        parse_category("region", &Self::ALL, Self::as_str, s)
    }
}

impl FromStr for Gender {
    type Err = FraudError;

    fn from_str(s: &str) -> Result<Self> {
        parse_category("genre", &Self::ALL, Self::as_str, s)
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submission as it arrives from the form: categorical fields are
/// still free text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTransaction {
    pub age: i64,
    pub salaire: f64,
    pub score_credit: i64,
    pub montant_transaction: f64,
    pub anciennete_compte: i64,
    pub type_carte: String,
    pub region: String,
    pub genre: String,
}

/// A submission whose categorical fields have been resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionInput {
    pub age: i64,
    pub salaire: f64,
    pub score_credit: i64,
    pub montant_transaction: f64,
    pub anciennete_compte: i64,
    pub type_carte: CardType,
    pub region: Region,
    pub genre: Gender,
}

// Resolves the three categorical fields; numeric fields are copied as is
impl TryFrom<RawTransaction> for TransactionInput {
    type Error = FraudError;

    fn try_from(raw: RawTransaction) -> Result<Self> {
        Ok(TransactionInput {
            age: raw.age,
            salaire: raw.salaire,
            score_credit: raw.score_credit,
            montant_transaction: raw.montant_transaction,
            anciennete_compte: raw.anciennete_compte,
            type_carte: raw.type_carte.parse()?,
            region: raw.region.parse()?,
            genre: raw.genre.parse()?,
        })
    }
}

// Rejects an integer field outside its inclusive range
fn check_int(field: &'static str, value: i64, (lo, hi): (i64, i64), expected: &'static str) -> Result<()> {
    if value < lo || value > hi {
        return Err(FraudError::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        });
    }
    Ok(())
}

// Rejects a money field that is negative, NaN or infinite
fn check_amount(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(FraudError::OutOfRange {
            field,
            value: value.to_string(),
            expected: "a finite value >= 0",
        });
    }
    Ok(())
}

impl TransactionInput {
    /// Re-check the numeric domains. The form constrains them already, but
    /// library callers do not go through the form.
    pub fn validate(&self) -> Result<()> {
        check_int("age", self.age, AGE_RANGE, "[18, 100]")?;
        check_amount("salaire", self.salaire)?;
        check_int("score_credit", self.score_credit, SCORE_CREDIT_RANGE, "[300, 900]")?;
        check_amount("montant_transaction", self.montant_transaction)?;
        check_int("anciennete_compte", self.anciennete_compte, ANCIENNETE_RANGE, "[0, 100]")?;
        Ok(())
    }
}

impl Default for TransactionInput {
    /// The values the form is pre-filled with.
    fn default() -> Self {
        TransactionInput {
            age: 35,
            salaire: 3000.0,
            score_credit: 650,
            montant_transaction: 150.0,
            anciennete_compte: 5,
            type_carte: CardType::MasterCard,
            region: Region::Houston,
            genre: Gender::Homme,
        }
    }
}
