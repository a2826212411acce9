//! # Model Configuration
//!
//! The shape of a [`PositionClassifier`](crate::model::PositionClassifier).
//! Training and prediction both build their model from the same
//! [`ModelConfig`], which is written next to the weights so the two paths
//! cannot drift apart.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FirstPosError, Result};

/// File name used for the serialized config inside a model directory.
pub const CONFIG_FILE: &str = "config.json";

/// Shape of the embedding table, recurrent encoder and classifier head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of rows in the embedding table.
    pub vocab_size: usize,
    /// Embedding width, also the recurrent input and hidden width.
    pub embedding_dim: usize,
    /// Fixed number of symbols per sequence (`L`).
    pub sequence_length: usize,
    /// Index whose embedding is held at zero and never updated.
    pub padding_idx: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            vocab_size: 13,
            embedding_dim: 20,
            sequence_length: 6,
            padding_idx: 0,
        }
    }
}

impl ModelConfig {
    /// Create a config for the given vocabulary size with default dimensions.
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            ..Self::default()
        }
    }

    /// Set the embedding (and hidden) width.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Set the sequence length `L`.
    pub fn with_sequence_length(mut self, len: usize) -> Self {
        self.sequence_length = len;
        self
    }

    /// Set the padding index.
    pub fn with_padding_idx(mut self, idx: u32) -> Self {
        self.padding_idx = idx;
        self
    }

    /// Number of output classes: one per position plus the absent class.
    pub fn num_classes(&self) -> usize {
        self.sequence_length + 1
    }

    /// Label used when the target symbol does not occur.
    pub fn absent_label(&self) -> u32 {
        self.sequence_length as u32
    }

    /// Reject configurations no model can be built from.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 {
            return Err(FirstPosError::InvalidConfig("vocab_size must be positive".into()));
        }
        if self.embedding_dim == 0 {
            return Err(FirstPosError::InvalidConfig(
                "embedding_dim must be positive".into(),
            ));
        }
        if self.sequence_length == 0 {
            return Err(FirstPosError::InvalidConfig(
                "sequence_length must be positive".into(),
            ));
        }
        if self.padding_idx as usize >= self.vocab_size {
            return Err(FirstPosError::InvalidConfig(format!(
                "padding_idx {} outside vocabulary of size {}",
                self.padding_idx, self.vocab_size
            )));
        }
        Ok(())
    }

    /// Every persisted parameter with the shape this config implies.
    pub fn parameter_shapes(&self) -> Vec<(String, Vec<usize>)> {
        let d = self.embedding_dim;
        vec![
            ("embedding.weight".into(), vec![self.vocab_size, d]),
            ("rnn.ih.weight".into(), vec![d, d]),
            ("rnn.ih.bias".into(), vec![d]),
            ("rnn.hh.weight".into(), vec![d, d]),
            ("rnn.hh.bias".into(), vec![d]),
            ("classify.weight".into(), vec![self.num_classes(), d]),
            ("classify.bias".into(), vec![self.num_classes()]),
        ]
    }

    /// Load a config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_classes_includes_absent() {
        let config = ModelConfig::new(4).with_sequence_length(3);
        assert_eq!(config.num_classes(), 4);
        assert_eq!(config.absent_label(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(ModelConfig::default().validate().is_ok());
        assert!(ModelConfig::new(0).validate().is_err());
        assert!(ModelConfig::default().with_embedding_dim(0).validate().is_err());
        assert!(ModelConfig::default().with_sequence_length(0).validate().is_err());
        assert!(ModelConfig::new(4).with_padding_idx(4).validate().is_err());
    }

    #[test]
    fn test_parameter_shapes() {
        let config = ModelConfig::new(4)
            .with_embedding_dim(8)
            .with_sequence_length(3);
        let shapes = config.parameter_shapes();
        assert_eq!(shapes.len(), 7);
        assert!(shapes.contains(&("embedding.weight".to_string(), vec![4, 8])));
        assert!(shapes.contains(&("classify.weight".to_string(), vec![4, 8])));
        assert!(shapes.contains(&("classify.bias".to_string(), vec![4])));
    }

    #[test]
    fn test_json_round_trip() {
        let config = ModelConfig::new(29).with_sequence_length(10);
        let path = std::env::temp_dir()
            .join(format!("firstpos_config_round_trip_{}.json", std::process::id()));
        config.save(&path).unwrap();
        let loaded = ModelConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config, loaded);
    }
}
