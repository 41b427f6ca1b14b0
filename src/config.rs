use std::path::PathBuf;
use std::num::ParseIntError;

use rand::rngs::StdRng;
use thiserror::Error;

use crate::{
  internal::make_rng,
  dataset::download::MIRRORS,
};


/// Hyperparameters and data location of a training run.

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
  pub num_epochs: usize,
  pub batch_size: usize,
  pub learning_rate: f32,
  /// Fixes model initialization and shuffling when set.
  pub seed: Option<u64>,
  pub data_dir: PathBuf,
  pub mirrors: Vec<String>,
}

impl Default for TrainingConfig {
  fn default() -> Self {
    Self {
      num_epochs: 15,
      batch_size: 100,
      learning_rate: 0.001,
      seed: None,
      data_dir: PathBuf::from("./data"),
      mirrors: MIRRORS.iter().map(|mirror| mirror.to_string() ).collect(),
    }
  }
}

impl TrainingConfig {
  pub fn with_num_epochs(mut self, num_epochs: usize) -> Self {
    self.num_epochs = num_epochs;
    self
  }

  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size;
    self
  }

  pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
    self.learning_rate = learning_rate;
    self
  }

  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
    self.data_dir = data_dir.into();
    self
  }

  pub fn with_mirrors(mut self, mirrors: Vec<String>) -> Self {
    self.mirrors = mirrors;
    self
  }

  /// Defaults, overridden by `MNIST_DATA_DIR`, `MNIST_SEED`
  /// and `MNIST_EPOCHS` where set.

  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_vars(|key| std::env::var(key).ok() )
  }

  pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();
    if let Some(dir) = lookup("MNIST_DATA_DIR") {
      config = config.with_data_dir(dir);
    }
    if let Some(seed) = lookup("MNIST_SEED") {
      config = config.with_seed(parse("MNIST_SEED", &seed)?);
    }
    if let Some(epochs) = lookup("MNIST_EPOCHS") {
      let epochs = parse("MNIST_EPOCHS", &epochs)?;
      if epochs == 0 { return Err(ConfigError::Zero { key: "MNIST_EPOCHS" }) }
      config = config.with_num_epochs(epochs as usize);
    }
    Ok(config)
  }

  /// Random generator for this run.

  pub fn rng(&self) -> StdRng {
    make_rng(self.seed)
  }
}

fn parse(key: &'static str, value: &str) -> Result<u64, ConfigError> {
  value.trim().parse().map_err(|source| ConfigError::Parse {
    key,
    value: value.to_string(),
    source,
  })
}


#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{key}={value:?} is not a non-negative integer")]
  Parse {
    key: &'static str,
    value: String,
    #[source]
    source: ParseIntError,
  },

  #[error("{key} must be positive")]
  Zero { key: &'static str },
}
