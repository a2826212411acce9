//! Weight persistence.
//!
//! A model directory holds `model.safetensors` and the [`ModelConfig`] that
//! produced it. Before any weight is loaded the safetensors header is checked
//! against the configured shapes, so a mismatched model fails immediately.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use safetensors::SafeTensors;

use crate::config::{CONFIG_FILE, ModelConfig};
use crate::error::{FirstPosError, Result};
use crate::model::PositionClassifier;

/// File name used for the weights inside a model directory.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Path of the weights file inside `dir`.
pub fn weights_path<P: AsRef<Path>>(dir: P) -> PathBuf {
    dir.as_ref().join(WEIGHTS_FILE)
}

/// Path of the config file inside `dir`.
pub fn config_path<P: AsRef<Path>>(dir: P) -> PathBuf {
    dir.as_ref().join(CONFIG_FILE)
}

/// Write the trained parameters and their config into `dir`.
pub fn save_model<P: AsRef<Path>>(varmap: &VarMap, config: &ModelConfig, dir: P) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    varmap.save(weights_path(dir))?;
    config.save(config_path(dir))?;
    tracing::info!(dir = %dir.display(), "model saved");
    Ok(())
}

/// Verify that a safetensors archive holds exactly the parameters `config` implies.
pub fn check_weights(bytes: &[u8], config: &ModelConfig) -> Result<()> {
    let archive = SafeTensors::deserialize(bytes)?;
    let expected = config.parameter_shapes();

    for (name, shape) in &expected {
        let view = archive
            .tensor(name)
            .map_err(|_| FirstPosError::MissingTensor(name.clone()))?;
        if view.shape() != shape.as_slice() {
            return Err(FirstPosError::ConfigMismatch {
                tensor: name.clone(),
                expected: shape.clone(),
                found: view.shape().to_vec(),
            });
        }
    }

    if let Some(extra) = archive
        .names()
        .into_iter()
        .find(|n| !expected.iter().any(|(name, _)| name == *n))
    {
        return Err(FirstPosError::UnexpectedTensor(extra.clone()));
    }
    Ok(())
}

/// Rebuild a classifier from a weights file written by [`save_model`].
pub fn load_classifier<P: AsRef<Path>>(
    path: P,
    config: &ModelConfig,
    device: &Device,
) -> Result<PositionClassifier> {
    config.validate()?;
    let bytes = std::fs::read(path.as_ref())?;
    check_weights(&bytes, config)?;
    let vb = VarBuilder::from_buffered_safetensors(bytes, DType::F32, device)?;
    tracing::debug!(path = %path.as_ref().display(), "loaded weights");
    PositionClassifier::new(config, vb)
}

/// Load the config and weights stored in a model directory.
pub fn load_model_dir<P: AsRef<Path>>(dir: P, device: &Device) -> Result<PositionClassifier> {
    let config = ModelConfig::load(config_path(&dir))?;
    load_classifier(weights_path(&dir), &config, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Tensor;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("firstpos_persist_{name}_{}", std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        dir
    }

    fn toy_config() -> ModelConfig {
        ModelConfig::new(4).with_embedding_dim(8).with_sequence_length(3)
    }

    #[test]
    fn test_save_then_load_predicts_identically() {
        let device = Device::Cpu;
        let config = toy_config();
        let varmap = VarMap::new();
        let model = PositionClassifier::new_trainable(&config, &varmap, &device).unwrap();

        let dir = temp_dir("round_trip");
        save_model(&varmap, &config, &dir).unwrap();
        let loaded = load_model_dir(&dir, &device).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        let ids = Tensor::new(&[[1u32, 2, 0], [3, 1, 2]], &device).unwrap();
        let before = model.predict_proba(&ids).unwrap().to_vec2::<f32>().unwrap();
        let after = loaded.predict_proba(&ids).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_mismatched_sequence_length_is_rejected() {
        let device = Device::Cpu;
        let config = toy_config();
        let varmap = VarMap::new();
        PositionClassifier::new_trainable(&config, &varmap, &device).unwrap();

        let dir = temp_dir("mismatch");
        save_model(&varmap, &config, &dir).unwrap();

        let other = config.with_sequence_length(5);
        let result = load_classifier(weights_path(&dir), &other, &device);
        std::fs::remove_dir_all(&dir).ok();

        match result {
            Err(FirstPosError::ConfigMismatch { tensor, expected, found }) => {
                assert!(tensor.starts_with("classify."));
                assert_eq!(expected[0], 6);
                assert_eq!(found[0], 4);
            }
            other => panic!("expected ConfigMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_file_is_rejected() {
        let result = check_weights(b"not a safetensors file", &toy_config());
        assert!(matches!(result, Err(FirstPosError::Safetensors(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_classifier("/nonexistent/model.safetensors", &toy_config(), &Device::Cpu);
        assert!(matches!(result, Err(FirstPosError::Io(_))));
    }
}
