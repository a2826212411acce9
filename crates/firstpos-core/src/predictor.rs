//! # Predictor
//!
//! Runs a trained [`PositionClassifier`] over raw strings. Inputs are cut to
//! `L` characters, unknown characters map to `unk`, short inputs are padded,
//! and the whole batch goes through one forward pass.

use std::fmt;
use std::path::Path;

use candle_core::{Device, Tensor};

use crate::config::ModelConfig;
use crate::error::{FirstPosError, Result};
use crate::model::PositionClassifier;
use crate::persist;
use crate::vocab::Vocabulary;

/// Outcome for a single input string.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub input: String,
    /// Zero-based position of the first target symbol, `None` for "not found".
    pub position: Option<usize>,
    /// Probability mass of the chosen class.
    pub probability: f32,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(
                f,
                "input: {}, predicted position: {}, probability: {:.4}",
                self.input, pos, self.probability
            ),
            None => write!(
                f,
                "input: {}, predicted: not found, probability: {:.4}",
                self.input, self.probability
            ),
        }
    }
}

/// Trained model plus the vocabulary used to encode its inputs.
pub struct Predictor {
    model: PositionClassifier,
    vocab: Vocabulary,
    device: Device,
}

impl Predictor {
    /// Wrap an already built model.
    ///
    /// Fails unless `vocab` has the size and padding index the model was built with.
    pub fn new(model: PositionClassifier, vocab: Vocabulary, device: Device) -> Result<Self> {
        let config = model.config();
        if vocab.len() != config.vocab_size {
            return Err(FirstPosError::VocabularyMismatch(format!(
                "model expects {} entries, vocabulary has {}",
                config.vocab_size,
                vocab.len()
            )));
        }
        if vocab.pad_index() != config.padding_idx {
            return Err(FirstPosError::VocabularyMismatch(format!(
                "model pads with index {}, vocabulary pads with {}",
                config.padding_idx,
                vocab.pad_index()
            )));
        }
        Ok(Self {
            model,
            vocab,
            device,
        })
    }

    /// Load weights saved with `config` from `weights`.
    pub fn load<P: AsRef<Path>>(
        weights: P,
        config: &ModelConfig,
        vocab: Vocabulary,
        device: Device,
    ) -> Result<Self> {
        let model = persist::load_classifier(weights, config, &device)?;
        Self::new(model, vocab, device)
    }

    /// Load the config and weights from a model directory.
    pub fn from_model_dir<P: AsRef<Path>>(
        dir: P,
        vocab: Vocabulary,
        device: Device,
    ) -> Result<Self> {
        let model = persist::load_model_dir(dir, &device)?;
        Self::new(model, vocab, device)
    }

    pub fn config(&self) -> &ModelConfig {
        self.model.config()
    }

    /// Encode every input to exactly `L` ids.
    pub fn encode<S: AsRef<str>>(&self, inputs: &[S]) -> Vec<Vec<u32>> {
        let len = self.config().sequence_length;
        inputs
            .iter()
            .map(|s| self.vocab.encode_text(s.as_ref(), len))
            .collect()
    }

    /// Predict the first target position for each input.
    pub fn predict<S: AsRef<str>>(&self, inputs: &[S]) -> Result<Vec<Prediction>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let len = self.config().sequence_length;
        let flat: Vec<u32> = self.encode(inputs).into_iter().flatten().collect();
        let ids = Tensor::from_vec(flat, (inputs.len(), len), &self.device)?;
        let probs = self.model.predict_proba(&ids)?.to_vec2::<f32>()?;

        let predictions = inputs
            .iter()
            .zip(probs)
            .map(|(input, row)| {
                let (class, probability) = row
                    .iter()
                    .copied()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))
                    .unwrap_or((len, 0.0));
                Prediction {
                    input: input.as_ref().to_string(),
                    position: (class < len).then_some(class),
                    probability,
                }
            })
            .collect();
        Ok(predictions)
    }
}
