//! Synthetic sample generation.
//!
//! Every sample is a fresh draw: `L` symbols picked uniformly with
//! replacement from the whole vocabulary, labelled with the position of the
//! first target symbol or `L` when the target never occurs.

use candle_core::{Device, Tensor};
use oorandom::Rand32;

use crate::error::Result;
use crate::vocab::Vocabulary;

/// Symbol whose first occurrence the classifier learns to locate.
pub const TARGET_SYMBOL: &str = "a";

/// One encoded sequence and its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub ids: Vec<u32>,
    /// Position of the first target symbol, or `L` if absent.
    pub label: u32,
}

/// Parallel rows of encoded sequences and labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub inputs: Vec<Vec<u32>>,
    pub labels: Vec<u32>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Input ids as a `[N, L]` tensor and labels as a `[N]` tensor.
    pub fn to_tensors(&self, device: &Device) -> Result<(Tensor, Tensor)> {
        let rows = self.inputs.len();
        let cols = self.inputs.first().map_or(0, Vec::len);
        let flat: Vec<u32> = self.inputs.iter().flatten().copied().collect();
        let inputs = Tensor::from_vec(flat, (rows, cols), device)?;
        let labels = Tensor::new(self.labels.as_slice(), device)?;
        Ok((inputs, labels))
    }
}

/// Label of a symbol sequence: index of the first `target`, else the length.
pub fn first_occurrence<S: AsRef<str>>(symbols: &[S], target: &str) -> u32 {
    symbols
        .iter()
        .position(|s| s.as_ref() == target)
        .unwrap_or(symbols.len()) as u32
}

/// Draws labelled sequences from a vocabulary.
#[derive(Debug, Clone)]
pub struct SampleGenerator<'a> {
    vocab: &'a Vocabulary,
    sequence_length: usize,
    target: String,
}

impl<'a> SampleGenerator<'a> {
    /// Generator for sequences of `sequence_length` symbols targeting [`TARGET_SYMBOL`].
    pub fn new(vocab: &'a Vocabulary, sequence_length: usize) -> Self {
        Self {
            vocab,
            sequence_length,
            target: TARGET_SYMBOL.to_string(),
        }
    }

    /// Locate a different target symbol.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Draw one sample.
    pub fn sample(&self, rng: &mut Rand32) -> Sample {
        let symbols = self.vocab.symbols();
        let drawn: Vec<&str> = (0..self.sequence_length)
            .map(|_| symbols[rng.rand_range(0..symbols.len() as u32) as usize].as_str())
            .collect();

        let label = first_occurrence(&drawn, &self.target);
        let ids = drawn.iter().map(|s| self.vocab.lookup(s)).collect();

        Sample { ids, label }
    }

    /// Draw `count` independent samples.
    pub fn dataset(&self, count: usize, rng: &mut Rand32) -> Dataset {
        let mut dataset = Dataset {
            inputs: Vec::with_capacity(count),
            labels: Vec::with_capacity(count),
        };
        for _ in 0..count {
            let sample = self.sample(rng);
            dataset.inputs.push(sample.ids);
            dataset.labels.push(sample.label);
        }
        dataset
    }
}
