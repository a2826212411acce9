//! Training configuration.

use std::path::PathBuf;

use firstpos_core::ModelConfig;
use serde::{Deserialize, Serialize};

/// Alphabet used when no vocabulary file exists yet.
pub const DEFAULT_ALPHABET: &str = "abcdefghijk";

/// Knobs for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Samples drawn per epoch; the epoch runs `train_samples / batch_size` steps.
    pub train_samples: usize,
    pub learning_rate: f64,
    /// Size of the held-out set drawn at every evaluation.
    pub eval_samples: usize,
    pub embedding_dim: usize,
    pub sequence_length: usize,
    pub seed: u64,
    pub vocab_path: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 20,
            train_samples: 500,
            learning_rate: 0.005,
            eval_samples: 200,
            embedding_dim: 20,
            sequence_length: 6,
            seed: 42,
            vocab_path: PathBuf::from("vocab.json"),
            output_dir: PathBuf::from("models"),
        }
    }
}

impl TrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_train_samples(mut self, samples: usize) -> Self {
        self.train_samples = samples;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_eval_samples(mut self, samples: usize) -> Self {
        self.eval_samples = samples;
        self
    }

    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    pub fn with_sequence_length(mut self, len: usize) -> Self {
        self.sequence_length = len;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_vocab_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vocab_path = path.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Mini-batches per epoch.
    pub fn steps_per_epoch(&self) -> usize {
        self.train_samples.checked_div(self.batch_size).unwrap_or(0)
    }

    /// Model shape for a vocabulary of `vocab_size` entries.
    pub fn model_config(&self, vocab_size: usize, padding_idx: u32) -> ModelConfig {
        ModelConfig::new(vocab_size)
            .with_embedding_dim(self.embedding_dim)
            .with_sequence_length(self.sequence_length)
            .with_padding_idx(padding_idx)
    }
}
