//! # firstpos
//!
//! Facade over the workspace crates: the model and inference side lives in
//! [`firstpos_core`], the training loop and evaluation in [`firstpos_trainer`].

pub use firstpos_core;
pub use firstpos_trainer;

pub use firstpos_core::{
    Dataset, FirstPosError, ModelConfig, PositionClassifier, Prediction, Predictor, Sample,
    SampleGenerator, Vocabulary,
};
pub use firstpos_trainer::{EvalReport, Evaluator, TrainConfig, Trainer, TrainerState};
