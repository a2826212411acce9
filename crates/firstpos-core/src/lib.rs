//! # firstpos core
//!
//! Everything needed to build, persist and query the position classifier:
//! a symbol vocabulary, a synthetic sample generator, the recurrent model
//! itself and a batch predictor.
//!
//! ## Quick Start
//!
//! ```rust
//! use firstpos_core::{SampleGenerator, Vocabulary};
//!
//! let vocab = Vocabulary::from_alphabet("abc");
//! let generator = SampleGenerator::new(&vocab, 6);
//! let mut rng = oorandom::Rand32::new(42);
//! let sample = generator.sample(&mut rng);
//!
//! assert_eq!(sample.ids.len(), 6);
//! assert!(sample.label <= 6);
//! ```
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod persist;
pub mod predictor;
pub mod vocab;

// Re-export primary API
pub use config::ModelConfig;
pub use data::{Dataset, Sample, SampleGenerator, TARGET_SYMBOL};
pub use error::{FirstPosError, Result};
pub use model::{PositionClassifier, RnnEncoder};
pub use predictor::{Prediction, Predictor};
pub use vocab::Vocabulary;
