//! Training loop for the position classifier.

use std::path::Path;

use anyhow::Context;
use candle_core::{Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use firstpos_core::persist::{self, WEIGHTS_FILE};
use firstpos_core::{ModelConfig, PositionClassifier, SampleGenerator, Vocabulary};
use oorandom::Rand32;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{DEFAULT_ALPHABET, TrainConfig};
use crate::evaluator::{EvalReport, Evaluator};

/// File the per-epoch history is written to inside the output directory.
pub const HISTORY_FILE: &str = "history.json";

/// Where a [`Trainer`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    /// Running the given 1-based epoch.
    EpochRunning(usize),
    Completed,
}

/// Mean loss and evaluation for one finished epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub mean_loss: f64,
    pub eval: EvalReport,
}

pub struct Trainer {
    config: TrainConfig,
    model_config: ModelConfig,
    vocab: Vocabulary,
    device: Device,
    varmap: VarMap,
    model: PositionClassifier,
    optimizer: AdamW,
    rng: Rand32,
    state: TrainerState,
}

impl Trainer {
    pub fn new(config: TrainConfig, vocab: Vocabulary) -> anyhow::Result<Self> {
        if config.batch_size == 0 {
            anyhow::bail!("batch_size must be positive");
        }
        let device = Device::Cpu;
        let model_config = config.model_config(vocab.len(), vocab.pad_index());

        let varmap = VarMap::new();
        let model = PositionClassifier::new_trainable(&model_config, &varmap, &device)
            .context("failed to build model")?;

        // Plain Adam: no weight decay, so the padding row never moves.
        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: config.learning_rate,
                weight_decay: 0.0,
                ..Default::default()
            },
        )
        .context("failed to create optimizer")?;

        let rng = Rand32::new(config.seed);

        Ok(Self {
            config,
            model_config,
            vocab,
            device,
            varmap,
            model,
            optimizer,
            rng,
            state: TrainerState::Idle,
        })
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn model(&self) -> &PositionClassifier {
        &self.model
    }

    pub fn model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Run every configured epoch and return the per-epoch history.
    pub fn train(&mut self) -> anyhow::Result<Vec<EpochMetrics>> {
        let steps = self.config.steps_per_epoch();
        info!(
            epochs = self.config.epochs,
            steps_per_epoch = steps,
            batch_size = self.config.batch_size,
            lr = self.config.learning_rate,
            vocab_size = self.model_config.vocab_size,
            sequence_length = self.model_config.sequence_length,
            "starting training"
        );

        let mut history = Vec::with_capacity(self.config.epochs);
        for epoch in 1..=self.config.epochs {
            self.state = TrainerState::EpochRunning(epoch);
            let mean_loss = self.run_epoch(epoch, steps)?;
            info!(epoch, epochs = self.config.epochs, mean_loss, "epoch complete");

            let eval = self.evaluate()?;
            history.push(EpochMetrics {
                epoch,
                mean_loss,
                eval,
            });
        }

        self.state = TrainerState::Completed;
        Ok(history)
    }

    fn run_epoch(&mut self, epoch: usize, steps: usize) -> anyhow::Result<f64> {
        let generator = SampleGenerator::new(&self.vocab, self.model_config.sequence_length);
        let log_every = (steps / 2).max(1);
        let mut losses = Vec::with_capacity(steps);

        for step in 0..steps {
            let batch = generator.dataset(self.config.batch_size, &mut self.rng);
            let (inputs, labels) = batch.to_tensors(&self.device)?;
            let loss = optimize_step(&self.model, &mut self.optimizer, &inputs, &labels)?;
            if step % log_every == 0 {
                debug!(epoch, step, loss, "batch loss");
            }
            losses.push(loss);
        }

        if losses.is_empty() {
            return Ok(0.0);
        }
        Ok(losses.iter().sum::<f64>() / losses.len() as f64)
    }

    /// One optimizer update on a caller-supplied batch; returns the batch loss.
    pub fn step(&mut self, inputs: &Tensor, labels: &Tensor) -> anyhow::Result<f64> {
        optimize_step(&self.model, &mut self.optimizer, inputs, labels)
    }

    /// Score the current model on a fresh held-out set.
    pub fn evaluate(&mut self) -> anyhow::Result<EvalReport> {
        let generator = SampleGenerator::new(&self.vocab, self.model_config.sequence_length);
        let evaluator =
            Evaluator::new(generator, self.device.clone()).with_samples(self.config.eval_samples);
        Ok(evaluator.evaluate(&self.model, &mut self.rng)?)
    }

    /// Write the weights, model config and `history` into `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P, history: &[EpochMetrics]) -> anyhow::Result<()> {
        let dir = dir.as_ref();
        persist::save_model(&self.varmap, &self.model_config, dir)
            .with_context(|| format!("failed to save model to {}", dir.display()))?;
        std::fs::write(dir.join(HISTORY_FILE), serde_json::to_string_pretty(history)?)
            .context("failed to write training history")?;
        info!(path = %dir.join(WEIGHTS_FILE).display(), "saved model");
        Ok(())
    }
}

fn optimize_step(
    model: &PositionClassifier,
    optimizer: &mut AdamW,
    inputs: &Tensor,
    labels: &Tensor,
) -> anyhow::Result<f64> {
    let loss = model.loss(inputs, labels)?;
    optimizer
        .backward_step(&loss)
        .context("backward step failed")?;
    Ok(f64::from(loss.to_scalar::<f32>()?))
}

/// Load the vocabulary at `path`, writing the default one first if it is missing.
pub fn load_or_create_vocab(path: &Path) -> anyhow::Result<Vocabulary> {
    if !path.exists() {
        info!(path = %path.display(), alphabet = DEFAULT_ALPHABET, "creating vocabulary");
        Vocabulary::from_alphabet(DEFAULT_ALPHABET)
            .save(path)
            .with_context(|| format!("failed to write vocabulary {}", path.display()))?;
    }
    Vocabulary::load(path).with_context(|| format!("failed to load vocabulary {}", path.display()))
}

/// Train with `config` end to end and save the result.
pub fn train_with(config: TrainConfig) -> anyhow::Result<Vec<EpochMetrics>> {
    let vocab = load_or_create_vocab(&config.vocab_path)?;
    let output_dir = config.output_dir.clone();

    let mut trainer = Trainer::new(config, vocab)?;
    let history = trainer.train()?;
    trainer.save(&output_dir, &history)?;
    Ok(history)
}

/// Train with the built-in defaults.
pub fn run_training() -> anyhow::Result<()> {
    let history = train_with(TrainConfig::default())?;
    for metrics in &history {
        println!(
            "epoch {:3} | loss={:.4} | {}",
            metrics.epoch, metrics.mean_loss, metrics.eval
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TrainConfig {
        TrainConfig::new()
            .with_epochs(2)
            .with_batch_size(10)
            .with_train_samples(40)
            .with_eval_samples(30)
            .with_embedding_dim(8)
            .with_sequence_length(3)
    }

    #[test]
    fn test_state_transitions() {
        let vocab = Vocabulary::from_alphabet("ab");
        let mut trainer = Trainer::new(small_config(), vocab).unwrap();
        assert_eq!(trainer.state(), TrainerState::Idle);

        let history = trainer.train().unwrap();
        assert_eq!(trainer.state(), TrainerState::Completed);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].epoch, 1);
        assert_eq!(history[1].epoch, 2);
        for metrics in &history {
            assert!(metrics.mean_loss.is_finite());
            assert_eq!(metrics.eval.correct + metrics.eval.wrong, 30);
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = TrainConfig {
            batch_size: 0,
            ..small_config()
        };
        let result = Trainer::new(config, Vocabulary::from_alphabet("ab"));
        assert!(result.is_err());
    }

    #[test]
    fn test_model_shape_follows_vocab() {
        let vocab = Vocabulary::from_alphabet("abcde");
        let trainer = Trainer::new(small_config(), vocab).unwrap();
        assert_eq!(trainer.model_config().vocab_size, 7);
        assert_eq!(trainer.model_config().num_classes(), 4);
        assert_eq!(trainer.model_config().padding_idx, 0);
    }

    #[test]
    fn test_step_changes_loss() {
        let vocab = Vocabulary::from_alphabet("ab");
        let mut trainer = Trainer::new(small_config(), vocab).unwrap();
        let batch = SampleGenerator::new(trainer.vocab(), 3).dataset(20, &mut Rand32::new(1));
        let (inputs, labels) = batch.to_tensors(&Device::Cpu).unwrap();

        let first = trainer.step(&inputs, &labels).unwrap();
        let mut last = first;
        for _ in 0..20 {
            last = trainer.step(&inputs, &labels).unwrap();
        }
        assert!(last < first, "loss did not drop: {first} -> {last}");
    }

    #[test]
    fn test_load_or_create_vocab() {
        let path = std::env::temp_dir()
            .join(format!("firstpos_trainer_vocab_{}.json", std::process::id()));
        std::fs::remove_file(&path).ok();

        let created = load_or_create_vocab(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, Vocabulary::from_alphabet(DEFAULT_ALPHABET));

        let reloaded = load_or_create_vocab(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(created, reloaded);
    }
}
