//! firstpos command-line interface
//!
//! Trains the position classifier, runs predictions with a saved model and
//! writes vocabulary files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use candle_core::Device;
use clap::{Parser, Subcommand};
use firstpos_core::{Predictor, Vocabulary};
use firstpos_trainer::{DEFAULT_ALPHABET, TrainConfig, train_with};
use tracing::info;

/// CLI arguments
#[derive(Parser)]
#[command(name = "firstpos")]
#[command(about = "Locate the first occurrence of a symbol with a recurrent classifier")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Vocabulary file (JSON object of symbol to index)
    #[arg(short, long, global = true, env = "FIRSTPOS_VOCAB", default_value = "vocab.json")]
    vocab: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on synthetic data and save it
    Train {
        /// Directory the weights, config and history are written to
        #[arg(short, long, env = "FIRSTPOS_MODEL_DIR", default_value = "models")]
        output: PathBuf,

        #[arg(long, default_value_t = 20)]
        epochs: usize,

        #[arg(long, default_value_t = 20)]
        batch_size: usize,

        /// Samples drawn per epoch
        #[arg(long, default_value_t = 500)]
        train_samples: usize,

        #[arg(long, default_value_t = 0.005)]
        lr: f64,

        #[arg(long, default_value_t = 20)]
        embedding_dim: usize,

        /// Symbols per sequence
        #[arg(long, default_value_t = 6)]
        sequence_length: usize,

        #[arg(long, env = "FIRSTPOS_SEED", default_value_t = 42)]
        seed: u64,
    },
    /// Predict the first position of the target symbol in each input
    Predict {
        /// Directory holding model.safetensors and config.json
        #[arg(short, long, env = "FIRSTPOS_MODEL_DIR", default_value = "models")]
        model_dir: PathBuf,

        /// Raw input strings
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Write a vocabulary file for an alphabet
    BuildVocab {
        #[arg(short, long, default_value = DEFAULT_ALPHABET)]
        alphabet: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            output,
            epochs,
            batch_size,
            train_samples,
            lr,
            embedding_dim,
            sequence_length,
            seed,
        } => {
            let config = TrainConfig::new()
                .with_epochs(epochs)
                .with_batch_size(batch_size)
                .with_train_samples(train_samples)
                .with_learning_rate(lr)
                .with_embedding_dim(embedding_dim)
                .with_sequence_length(sequence_length)
                .with_seed(seed)
                .with_vocab_path(cli.vocab)
                .with_output_dir(output);

            let history = train_with(config)?;
            if let Some(last) = history.last() {
                println!("final: loss={:.4} | {}", last.mean_loss, last.eval);
            }
        }
        Commands::Predict { model_dir, inputs } => {
            let vocab = Vocabulary::load(&cli.vocab)
                .with_context(|| format!("failed to load vocabulary {}", cli.vocab.display()))?;
            let predictor = Predictor::from_model_dir(&model_dir, vocab, Device::Cpu)
                .with_context(|| format!("failed to load model from {}", model_dir.display()))?;

            for prediction in predictor.predict(inputs.as_slice())? {
                println!("{prediction}");
            }
        }
        Commands::BuildVocab { alphabet } => {
            let vocab = Vocabulary::from_alphabet(&alphabet);
            vocab
                .save(&cli.vocab)
                .with_context(|| format!("failed to write {}", cli.vocab.display()))?;
            info!(path = %cli.vocab.display(), size = vocab.len(), "vocabulary written");
        }
    }

    Ok(())
}
