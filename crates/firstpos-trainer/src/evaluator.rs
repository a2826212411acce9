//! Held-out evaluation on freshly drawn samples.

use std::fmt;

use candle_core::Device;
use firstpos_core::{PositionClassifier, SampleGenerator};
use oorandom::Rand32;
use serde::Serialize;

/// Number of samples drawn for each evaluation unless configured otherwise.
pub const DEFAULT_EVAL_SAMPLES: usize = 200;

/// Metrics from one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalReport {
    pub correct: usize,
    pub wrong: usize,
    /// Fraction of rows whose predicted class equals the gold label.
    pub accuracy: f64,
    /// Mean `|predicted - gold|`, with the absent class counted as position `L`.
    pub mean_abs_error: f64,
}

impl EvalReport {
    /// Score predicted classes against gold labels.
    pub fn from_predictions(predicted: &[u32], gold: &[u32]) -> Self {
        let total = predicted.len().min(gold.len());
        if total == 0 {
            return Self {
                correct: 0,
                wrong: 0,
                accuracy: 0.0,
                mean_abs_error: 0.0,
            };
        }

        let mut correct = 0usize;
        let mut abs_error = 0u64;
        for (&p, &g) in predicted.iter().zip(gold) {
            if p == g {
                correct += 1;
            }
            abs_error += u64::from(p.abs_diff(g));
        }

        Self {
            correct,
            wrong: total - correct,
            accuracy: correct as f64 / total as f64,
            mean_abs_error: abs_error as f64 / total as f64,
        }
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "correct={} wrong={} acc={:.4} mae={:.4}",
            self.correct, self.wrong, self.accuracy, self.mean_abs_error
        )
    }
}

/// Scores a model on a new synthetic set each time it runs.
pub struct Evaluator<'a> {
    generator: SampleGenerator<'a>,
    samples: usize,
    device: Device,
}

impl<'a> Evaluator<'a> {
    pub fn new(generator: SampleGenerator<'a>, device: Device) -> Self {
        Self {
            generator,
            samples: DEFAULT_EVAL_SAMPLES,
            device,
        }
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Draw a fresh set, run one forward pass and score the arg-max classes.
    pub fn evaluate(
        &self,
        model: &PositionClassifier,
        rng: &mut Rand32,
    ) -> firstpos_core::Result<EvalReport> {
        let dataset = self.generator.dataset(self.samples, rng);
        if dataset.is_empty() {
            return Ok(EvalReport::from_predictions(&[], &[]));
        }
        let (inputs, _) = dataset.to_tensors(&self.device)?;
        let predicted = model.predict_classes(&inputs)?;
        let report = EvalReport::from_predictions(&predicted, &dataset.labels);
        tracing::info!(
            correct = report.correct,
            wrong = report.wrong,
            accuracy = report.accuracy,
            mean_abs_error = report.mean_abs_error,
            "evaluation"
        );
        Ok(report)
    }
}
