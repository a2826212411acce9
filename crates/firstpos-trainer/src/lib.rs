//! # firstpos trainer
//!
//! Trains the position classifier on freshly generated synthetic batches,
//! evaluates it after every epoch and saves the final weights.

pub mod config;
pub mod evaluator;
pub mod trainer;

pub use config::{DEFAULT_ALPHABET, TrainConfig};
pub use evaluator::{DEFAULT_EVAL_SAMPLES, EvalReport, Evaluator};
pub use trainer::{
    EpochMetrics, HISTORY_FILE, Trainer, TrainerState, load_or_create_vocab, run_training,
    train_with,
};
