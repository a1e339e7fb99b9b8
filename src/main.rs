// Command-line front end: the form, the model load and the result display.
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fraud_check::config::{AppConfig, ModelOverrides};
use fraud_check::model::ModelFormat;
use fraud_check::report::{self, OutputFormat};
use fraud_check::{encode, FraudPredictor, RawTransaction, TransactionInput};

/// Fraud check for a single card transaction
#[derive(Parser, Debug)]
#[command(name = "fraud-check", version)]
#[command(after_help = "\
Examples:
  fraud-check predict --montant 9000 --type-carte Visa_card --region Miami
  fraud-check predict --format json          JSON output for scripting
  fraud-check encode --genre Femme           Show the feature vector only")]
struct Cli {
    /// Config file (default: ./fraud-check.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a transaction and show the verdict with the submitted values
    Predict {
        #[command(flatten)]
        form: FormArgs,

        #[command(flatten)]
        model: ModelArgs,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the feature vector without scoring it
    Encode {
        #[command(flatten)]
        form: FormArgs,

        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Describe the application
    About,
}

/// The eight transaction attributes. Defaults are the form's pre-filled values.
#[derive(Args, Debug)]
struct FormArgs {
    /// Age (18-100)
    #[arg(long, default_value_t = 35, allow_negative_numbers = true)]
    age: i64,

    /// Income
    #[arg(long, default_value_t = 3000.0, allow_negative_numbers = true)]
    salaire: f64,

    /// Credit score (300-900)
    #[arg(long, default_value_t = 650, allow_negative_numbers = true)]
    score_credit: i64,

    /// Transaction amount
    #[arg(long = "montant", default_value_t = 150.0, allow_negative_numbers = true)]
    montant_transaction: f64,

    /// Account tenure in years (0-100)
    #[arg(long = "anciennete", default_value_t = 5, allow_negative_numbers = true)]
    anciennete_compte: i64,

    /// Card type: Master_card or Visa_card
    #[arg(long, default_value = "Master_card")]
    type_carte: String,

    /// Region: Houston, Orlando or Miami
    #[arg(long, default_value = "Houston")]
    region: String,

    /// Gender: Homme or Femme
    #[arg(long, default_value = "Homme")]
    genre: String,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model file (overrides config)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Model file format (overrides config)
    #[arg(long, value_enum)]
    model_format: Option<ModelFormat>,

    /// Fraud probability threshold (overrides config)
    #[arg(long)]
    threshold: Option<f64>,
}

impl FormArgs {
    fn into_input(self) -> Result<TransactionInput> {
        let raw = RawTransaction {
            age: self.age,
            salaire: self.salaire,
            score_credit: self.score_credit,
            montant_transaction: self.montant_transaction,
            anciennete_compte: self.anciennete_compte,
            type_carte: self.type_carte,
            region: self.region,
            genre: self.genre,
        };
        TransactionInput::try_from(raw).context("invalid transaction")
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Predict {
            form,
            model,
            format,
        } => {
            let mut config = AppConfig::load(cli.config.as_deref())?;
            config.apply(ModelOverrides {
                path: model.model,
                format: model.model_format,
                threshold: model.threshold,
            })?;

            // Without a model no prediction can be served.
            let scorer = config.load_scorer().context("cannot start without a model")?;
            let predictor = FraudPredictor::new(Arc::new(scorer));

            let input = form.into_input()?;
            let assessment = predictor.assess(&input).context("prediction failed")?;
            report::render_assessment(&mut stdout, &assessment, format)?;
        }
        Commands::Encode { form, format } => {
            let input = form.into_input()?;
            let features = encode(&input).context("invalid transaction")?;
            report::render_features(&mut stdout, &features, format)?;
        }
        Commands::About => {
            stdout.write_all(report::ABOUT.as_bytes())?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    run(Cli::parse())
}
