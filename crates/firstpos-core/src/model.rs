//! # Position Classifier
//!
//! Embedding table, single-layer tanh RNN and a linear head over `L + 1`
//! classes. Position `i < L` means the target first occurs at `i`; class `L`
//! means it is absent.
//!
//! ```text
//! ids [B, L] → Embedding → [B, L, D] → RNN → h_L [B, D] → Linear → [B, L+1]
//! ```

use candle_core::{D, DType, Device, Tensor};
use candle_nn::{Embedding, Linear, Module, VarBuilder, VarMap};

use crate::config::ModelConfig;
use crate::error::Result;

/// Single-layer Elman RNN: `h_t = tanh(W_ih x_t + b_ih + W_hh h_{t-1} + b_hh)`.
#[derive(Debug, Clone)]
pub struct RnnEncoder {
    ih: Linear,
    hh: Linear,
    hidden_dim: usize,
}

impl RnnEncoder {
    pub fn new(input_dim: usize, hidden_dim: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let ih = candle_nn::linear(input_dim, hidden_dim, vb.pp("ih"))?;
        let hh = candle_nn::linear(hidden_dim, hidden_dim, vb.pp("hh"))?;
        Ok(Self { ih, hh, hidden_dim })
    }

    /// Run over `[B, T, D]` inputs (batch first) and return the last hidden
    /// state `[B, H]`. The initial state is zero.
    pub fn last_hidden(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let (batch, steps, _) = xs.dims3()?;
        let mut h = Tensor::zeros((batch, self.hidden_dim), xs.dtype(), xs.device())?;
        for t in 0..steps {
            let x_t = xs.narrow(1, t, 1)?.squeeze(1)?;
            h = (self.ih.forward(&x_t)? + self.hh.forward(&h)?)?.tanh()?;
        }
        Ok(h)
    }
}

/// Recurrent classifier over the positions of a fixed-length sequence.
#[derive(Debug, Clone)]
pub struct PositionClassifier {
    embedding: Embedding,
    rnn: RnnEncoder,
    classify: Linear,
    config: ModelConfig,
}

impl PositionClassifier {
    /// Build the layers from a var builder. Parameter names follow
    /// [`ModelConfig::parameter_shapes`].
    pub fn new(config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let d = config.embedding_dim;
        let embedding = candle_nn::embedding(config.vocab_size, d, vb.pp("embedding"))?;
        let rnn = RnnEncoder::new(d, d, vb.pp("rnn"))?;
        let classify = candle_nn::linear(d, config.num_classes(), vb.pp("classify"))?;
        Ok(Self {
            embedding,
            rnn,
            classify,
            config: *config,
        })
    }

    /// Build a freshly initialised, trainable model whose parameters live in `varmap`.
    pub fn new_trainable(config: &ModelConfig, varmap: &VarMap, device: &Device) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        Self::new(config, vb)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Embed, encode and keep the final hidden state: `[B, L]` ids to `[B, D]`.
    ///
    /// Padding positions embed to zero, so the padding row receives no gradient.
    fn encode_and_pool(&self, ids: &Tensor) -> candle_core::Result<Tensor> {
        let embedded = self.embedding.forward(ids)?;
        let keep = ids
            .ne(self.config.padding_idx)?
            .to_dtype(embedded.dtype())?
            .unsqueeze(D::Minus1)?;
        let embedded = embedded.broadcast_mul(&keep)?;
        self.rnn.last_hidden(&embedded)
    }

    /// Raw class scores `[B, L + 1]`.
    pub fn logits(&self, ids: &Tensor) -> Result<Tensor> {
        let pooled = self.encode_and_pool(ids)?;
        Ok(self.classify.forward(&pooled)?)
    }

    /// Mean cross-entropy between the class scores and gold `labels` `[B]`.
    pub fn loss(&self, ids: &Tensor, labels: &Tensor) -> Result<Tensor> {
        let logits = self.logits(ids)?;
        Ok(candle_nn::loss::cross_entropy(&logits, labels)?)
    }

    /// Class probabilities `[B, L + 1]`, detached from the gradient graph.
    pub fn predict_proba(&self, ids: &Tensor) -> Result<Tensor> {
        let logits = self.logits(ids)?.detach();
        Ok(candle_nn::ops::softmax(&logits, D::Minus1)?)
    }

    /// Most likely class for each row.
    pub fn predict_classes(&self, ids: &Tensor) -> Result<Vec<u32>> {
        let logits = self.logits(ids)?.detach();
        Ok(logits.argmax(D::Minus1)?.to_vec1::<u32>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_config() -> ModelConfig {
        ModelConfig::new(4).with_embedding_dim(8).with_sequence_length(3)
    }

    fn toy_input(device: &Device) -> Tensor {
        Tensor::new(&[[1u32, 2, 0], [2, 2, 1], [3, 1, 1]], device).unwrap()
    }

    #[test]
    fn test_varmap_holds_declared_parameters() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let config = toy_config();
        PositionClassifier::new_trainable(&config, &varmap, &device).unwrap();

        let data = varmap.data().lock().unwrap();
        assert_eq!(data.len(), config.parameter_shapes().len());
        for (name, shape) in config.parameter_shapes() {
            let var = data.get(&name).unwrap_or_else(|| panic!("missing {name}"));
            assert_eq!(var.dims(), shape.as_slice(), "{name}");
        }
    }

    #[test]
    fn test_logits_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let model = PositionClassifier::new_trainable(&toy_config(), &varmap, &device).unwrap();

        let logits = model.logits(&toy_input(&device)).unwrap();
        assert_eq!(logits.dims(), &[3, 4]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let model = PositionClassifier::new_trainable(&toy_config(), &varmap, &device).unwrap();

        let probs = model.predict_proba(&toy_input(&device)).unwrap();
        for row in probs.to_vec2::<f32>().unwrap() {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "row sums to {total}");
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_loss_is_finite_scalar() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let model = PositionClassifier::new_trainable(&toy_config(), &varmap, &device).unwrap();

        let labels = Tensor::new(&[0u32, 2, 1], &device).unwrap();
        let loss = model.loss(&toy_input(&device), &labels).unwrap();
        assert_eq!(loss.rank(), 0);
        assert!(loss.to_scalar::<f32>().unwrap().is_finite());
    }

    #[test]
    fn test_padding_row_receives_no_gradient() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let model = PositionClassifier::new_trainable(&toy_config(), &varmap, &device).unwrap();

        let labels = Tensor::new(&[0u32, 2, 1], &device).unwrap();
        let loss = model.loss(&toy_input(&device), &labels).unwrap();
        let grads = loss.backward().unwrap();

        let data = varmap.data().lock().unwrap();
        let table = data.get("embedding.weight").unwrap();
        let grad = grads.get(table.as_tensor()).unwrap();
        let rows = grad.to_vec2::<f32>().unwrap();
        assert!(rows[0].iter().all(|g| *g == 0.0));
        assert!(rows[1].iter().any(|g| *g != 0.0));
    }

    #[test]
    fn test_predict_classes_in_range() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let model = PositionClassifier::new_trainable(&toy_config(), &varmap, &device).unwrap();

        let classes = model.predict_classes(&toy_input(&device)).unwrap();
        assert_eq!(classes.len(), 3);
        assert!(classes.iter().all(|&c| c <= 3));
    }
}
