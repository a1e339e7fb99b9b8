// Renders a verdict and the read-back of the submitted values.
use std::io::Write;

use serde::Serialize;

use crate::encoding::FeatureVector;
use crate::predictor::{Assessment, Verdict};
use crate::transaction::TransactionInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

// Shape of the `--format json` output
#[derive(Serialize)]
struct JsonReport<'a> {
    verdict: &'a Verdict,
    label: &'static str,
    input: &'a TransactionInput,
    features: Vec<JsonFeature>,
}

#[derive(Serialize)]
struct JsonFeature {
    name: &'static str,
    value: f64,
}

// Prints each column with its value, two per line like the form's cards
fn write_features(out: &mut impl Write, features: &FeatureVector) -> std::io::Result<()> {
    let named: Vec<_> = features.named().collect();
    for pair in named.chunks(2) {
        let line = pair
            .iter()
            .map(|(name, value)| format!("{name:<20} {value:>12}"))
            .collect::<Vec<_>>()
            .join("    ");
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

// Header of column names and one row of values, plus the verdict when given
fn write_csv(out: &mut impl Write, features: &FeatureVector, verdict: Option<&str>) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let mut header: Vec<&str> = features.named().map(|(name, _)| name).collect();
    let mut row: Vec<String> = features.values.iter().map(|v| v.to_string()).collect();
    if let Some(verdict) = verdict {
        header.push("verdict");
        row.push(verdict.to_string());
    }
    wtr.write_record(&header)?;
    wtr.write_record(&row)?;
    wtr.flush()?;
    Ok(())
}

/// Verdict plus read-back.
pub fn render_assessment(
    out: &mut impl Write,
    assessment: &Assessment,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "Résultat : {}", assessment.verdict.headline())?;
            writeln!(out)?;
            writeln!(out, "Données saisies:")?;
            write_features(out, &assessment.features)?;
        }
        OutputFormat::Json => {
            let report = JsonReport {
                verdict: &assessment.verdict,
                label: assessment.verdict.headline(),
                input: &assessment.input,
                features: assessment
                    .features
                    .named()
                    .map(|(name, value)| JsonFeature { name, value })
                    .collect(),
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            write_csv(out, &assessment.features, Some(assessment.verdict.code()))?;
        }
    }
    Ok(())
}

/// Feature vector only.
pub fn render_features(
    out: &mut impl Write,
    features: &FeatureVector,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => write_features(out, features)?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &features.values)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_csv(out, features, None)?,
    }
    Ok(())
}

pub const ABOUT: &str = "\
Application de Détection de Fraude

Détecte les transactions frauduleuses à partir d'un modèle de gradient
boosting (XGBoost) pré-entraîné.

Fonctionnalités :
  - saisie des huit attributs d'une transaction
  - prédiction en temps réel : Transaction Légitime ou Fraude Suspectée
  - affichage des données saisies
";
