//! Dense numeric kernels shared by the frozen estimator and the policy networks.
//!
//! Everything here is plain single-threaded `f32` arithmetic with a fixed
//! summation order, so identical inputs always produce bit-identical outputs.
//! Weight matrices follow the row-major `[out, in]` layout of exported
//! PyTorch `state_dict` tensors.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or shaping a frozen artifact.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read artifact {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse artifact {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("incompatible artifact: {0}")]
    Incompatible(String),
}

/// Reads a JSON manifest from disk.
pub fn read_manifest<T, P>(path: P) -> Result<T, LoadError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Read {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

/// JSON form of one dense layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerWeights {
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl LayerWeights {
    pub fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            weights: vec![0.0; inputs * outputs],
            biases: vec![0.0; outputs],
        }
    }

    /// Uniform `±1/sqrt(inputs)` initialisation, the PyTorch `nn.Linear` default.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, inputs: usize, outputs: usize) -> Self {
        let bound = 1.0 / (inputs.max(1) as f32).sqrt();
        Self {
            weights: (0..inputs * outputs)
                .map(|_| rng.gen_range(-bound..bound))
                .collect(),
            biases: (0..outputs).map(|_| rng.gen_range(-bound..bound)).collect(),
        }
    }
}

/// JSON form of a layer norm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormWeights {
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
}

impl NormWeights {
    pub fn identity(width: usize) -> Self {
        Self {
            weight: vec![1.0; width],
            bias: vec![0.0; width],
        }
    }
}

/// Validated dense layer `y = W x + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl Linear {
    pub fn from_weights(
        name: &str,
        layer: &LayerWeights,
        inputs: usize,
        outputs: usize,
    ) -> Result<Self, LoadError> {
        if layer.weights.len() != inputs * outputs {
            return Err(LoadError::Incompatible(format!(
                "{name} weights wrong size: expected {}, got {}",
                inputs * outputs,
                layer.weights.len()
            )));
        }
        if layer.biases.len() != outputs {
            return Err(LoadError::Incompatible(format!(
                "{name} biases wrong size: expected {outputs}, got {}",
                layer.biases.len()
            )));
        }
        Ok(Self {
            inputs,
            outputs,
            weights: layer.weights.clone(),
            biases: layer.biases.clone(),
        })
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.inputs);
        let mut output = self.biases.clone();
        for (row, out) in output.iter_mut().enumerate() {
            let weights = &self.weights[row * self.inputs..(row + 1) * self.inputs];
            let mut acc = 0.0f32;
            for (w, x) in weights.iter().zip(input) {
                acc += w * x;
            }
            *out += acc;
        }
        output
    }
}

/// Layer normalisation over the last dimension.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    weight: Vec<f32>,
    bias: Vec<f32>,
    eps: f32,
}

impl LayerNorm {
    pub const DEFAULT_EPS: f32 = 1e-5;

    pub fn from_weights(name: &str, norm: &NormWeights, width: usize) -> Result<Self, LoadError> {
        if norm.weight.len() != width || norm.bias.len() != width {
            return Err(LoadError::Incompatible(format!(
                "{name} expects width {width}, got weight {} / bias {}",
                norm.weight.len(),
                norm.bias.len()
            )));
        }
        Ok(Self {
            weight: norm.weight.clone(),
            bias: norm.bias.clone(),
            eps: Self::DEFAULT_EPS,
        })
    }

    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        let n = input.len() as f32;
        let mean = input.iter().sum::<f32>() / n;
        let var = input.iter().map(|x| (x - mean) * (x - mean)).sum::<f32>() / n;
        let denom = (var + self.eps).sqrt();
        input
            .iter()
            .zip(self.weight.iter().zip(&self.bias))
            .map(|(x, (w, b))| (x - mean) / denom * w + b)
            .collect()
    }
}

pub fn relu(values: &mut [f32]) {
    for v in values.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

pub fn tanh(values: &mut [f32]) {
    for v in values.iter_mut() {
        *v = v.tanh();
    }
}

/// Numerically stable `ln(1 + e^x)`, matching the PyTorch threshold of 20.
pub fn softplus(x: f32) -> f32 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// In-place softmax; entries equal to `-inf` receive zero mass.
pub fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }
    let mut total = 0.0f32;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        total += *v;
    }
    for v in values.iter_mut() {
        *v /= total;
    }
}

/// Index of the largest value; the first index wins ties.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (idx, &value) in values.iter().enumerate() {
        if value > best_value {
            best = idx;
            best_value = value;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_rejects_wrong_shapes() {
        let layer = LayerWeights::zeros(3, 2);
        assert!(Linear::from_weights("probe", &layer, 3, 2).is_ok());
        let err = Linear::from_weights("probe", &layer, 2, 2).expect_err("shape mismatch");
        assert!(err.to_string().contains("probe weights wrong size"));
    }

    #[test]
    fn linear_forward_uses_row_major_layout() {
        let layer = LayerWeights {
            weights: vec![1.0, 2.0, 0.0, -1.0],
            biases: vec![0.5, 0.0],
        };
        let linear = Linear::from_weights("l", &layer, 2, 2).unwrap();
        assert_eq!(linear.forward(&[1.0, 1.0]), vec![3.5, -1.0]);
    }

    #[test]
    fn softmax_handles_masked_entries() {
        let mut values = [0.0, f32::NEG_INFINITY, 0.0];
        softmax(&mut values);
        assert_eq!(values[1], 0.0);
        assert!((values[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn softplus_is_positive_and_linear_for_large_inputs() {
        assert!(softplus(-30.0) > 0.0);
        assert_eq!(softplus(25.0), 25.0);
        assert!((softplus(0.0) - std::f32::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn layer_norm_centres_input() {
        let norm = LayerNorm::from_weights("n", &NormWeights::identity(4), 4).unwrap();
        let out = norm.forward(&[1.0, 2.0, 3.0, 4.0]);
        let mean: f32 = out.iter().sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-5);
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
    }
}
