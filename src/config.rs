//! Application configuration
//!
//! Loaded from `fraud-check.toml` in the working directory, or from the
//! file given with `--config`.
//!
//! ```toml
//! [model]
//! path = "xgb_model.json"
//! format = "xgboost"   # or "native"
//! threshold = 0.5
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{FraudError, Result};
use crate::model::{GbdtScorer, ModelFormat};

pub const DEFAULT_CONFIG_FILE: &str = "fraud-check.toml";
pub const DEFAULT_MODEL_PATH: &str = "xgb_model.json";

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub format: ModelFormat,
    pub threshold: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            format: ModelFormat::default(),
            threshold: GbdtScorer::DEFAULT_THRESHOLD,
        }
    }
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct ModelOverrides {
    pub path: Option<PathBuf>,
    pub format: Option<ModelFormat>,
    pub threshold: Option<f64>,
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| FraudError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `explicit` if given (it must exist), otherwise from
    /// `fraud-check.toml` if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| FraudError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            FraudError::Config(msg) => FraudError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ModelOverrides) -> Result<()> {
        if let Some(path) = overrides.path {
            self.model.path = path;
        }
        if let Some(format) = overrides.format {
            self.model.format = format;
        }
        if let Some(threshold) = overrides.threshold {
            self.model.threshold = threshold;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        GbdtScorer::check_threshold(self.model.threshold)
    }

    /// Load the configured model. Failure here means the application cannot
    /// serve any prediction.
    pub fn load_scorer(&self) -> Result<GbdtScorer> {
        GbdtScorer::load(&self.model.path, self.model.format)?.with_threshold(self.model.threshold)
    }
}
