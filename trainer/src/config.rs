use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TrainerError};

/// Training settings. Every field has a fixed default matching the original
/// pipeline; a JSON config file can override any subset of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainConfig {
    /// Input CSV with `Light_Intensity` and `Label` columns.
    pub csv_path: PathBuf,
    /// Where the exported model buffer goes.
    pub model_path: PathBuf,
    pub hidden_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    /// Fraction of rows held out for validation.
    pub valid_ratio: f32,
    /// Seed for the split, the init and the per-epoch shuffles. Random when
    /// unset.
    pub seed: Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("light.csv"),
            model_path: PathBuf::from("light_model.fmb"),
            hidden_dim: 8,
            epochs: 50,
            batch_size: 16,
            learning_rate: 1e-3,
            valid_ratio: 0.2,
            seed: None,
        }
    }
}

impl TrainConfig {
    /// Loads a config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        Ok(config)
    }

    /// Checks the values that training cannot proceed with.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_dim == 0 {
            return Err(TrainerError::InvalidConfig("hidden_dim must be non-zero"));
        }
        if self.epochs == 0 {
            return Err(TrainerError::InvalidConfig("epochs must be non-zero"));
        }
        if self.batch_size == 0 {
            return Err(TrainerError::InvalidConfig("batch_size must be non-zero"));
        }
        if !(0.0..1.0).contains(&self.valid_ratio) {
            return Err(TrainerError::InvalidConfig(
                "valid_ratio must be within [0, 1)",
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(TrainerError::InvalidConfig(
                "learning_rate must be positive",
            ));
        }
        Ok(())
    }
}
