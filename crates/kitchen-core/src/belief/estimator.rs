//! Frozen trait estimators.
//!
//! The transformer estimator reads a JSON manifest exported from a trained
//! model: an input projection, post-norm encoder layers, one attention vector
//! shared by all traits and a small head per trait. Each trait pools over its
//! own window of most recent positions before its head runs.

use super::traits::{BetaParams, Trait, TraitParams};
use crate::env::{PARTNER_STATE_DIM, StateVector};
use crate::nn::{self, LayerNorm, LayerWeights, Linear, LoadError, NormWeights};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Positive floor added to every emitted pseudo-count.
pub const PARAM_FLOOR: f32 = 1e-4;

/// Maps a window of partner-centric states to Beta parameters per trait.
pub trait TraitEstimator: Send + Sync {
    fn state_dim(&self) -> usize {
        PARTNER_STATE_DIM
    }

    /// Deterministic for identical input. Callers pass at least one state.
    fn predict_beta_params(&self, history: &[StateVector]) -> TraitParams;
}

/// Returns the same parameters regardless of input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantEstimator {
    params: TraitParams,
}

impl ConstantEstimator {
    pub const fn new(params: TraitParams) -> Self {
        Self { params }
    }

    pub fn uniform(alpha: f64, beta: f64) -> Self {
        Self::new(TraitParams([BetaParams::new(alpha, beta); 3]))
    }
}

impl TraitEstimator for ConstantEstimator {
    fn predict_beta_params(&self, _history: &[StateVector]) -> TraitParams {
        self.params
    }
}

/// Recent-window lengths used by the per-trait pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitWindows {
    pub ability: usize,
    pub benevolence: usize,
    pub integrity: usize,
}

impl Default for TraitWindows {
    fn default() -> Self {
        Self {
            ability: 15,
            benevolence: 30,
            integrity: 30,
        }
    }
}

impl TraitWindows {
    pub fn get(&self, which: Trait) -> usize {
        match which {
            Trait::Ability => self.ability,
            Trait::Benevolence => self.benevolence,
            Trait::Integrity => self.integrity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncoderLayerWeights {
    /// Stacked query, key and value projections, `[3 * hidden, hidden]`.
    pub in_proj: LayerWeights,
    pub out_proj: LayerWeights,
    pub linear1: LayerWeights,
    pub linear2: LayerWeights,
    pub norm1: NormWeights,
    pub norm2: NormWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeadWeights {
    pub hidden: LayerWeights,
    pub alpha: LayerWeights,
    pub beta: LayerWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatorHeads {
    pub ability: HeadWeights,
    pub benevolence: HeadWeights,
    pub integrity: HeadWeights,
}

impl EstimatorHeads {
    fn get(&self, which: Trait) -> &HeadWeights {
        match which {
            Trait::Ability => &self.ability,
            Trait::Benevolence => &self.benevolence,
            Trait::Integrity => &self.integrity,
        }
    }
}

fn default_head_dim() -> usize {
    64
}

/// On-disk description of a [`TransformerEstimator`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatorManifest {
    #[serde(default)]
    pub schema_version: u32,
    pub state_dim: usize,
    pub hidden_dim: usize,
    pub num_heads: usize,
    pub feedforward_dim: usize,
    #[serde(default = "default_head_dim")]
    pub head_dim: usize,
    #[serde(default)]
    pub windows: TraitWindows,
    pub input_proj: LayerWeights,
    pub layers: Vec<EncoderLayerWeights>,
    pub attn_vec: Vec<f32>,
    pub heads: EstimatorHeads,
}

/// Architecture hyper-parameters used to synthesise a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimatorShape {
    pub hidden_dim: usize,
    pub num_heads: usize,
    pub num_layers: usize,
}

impl Default for EstimatorShape {
    fn default() -> Self {
        Self {
            hidden_dim: 32,
            num_heads: 2,
            num_layers: 1,
        }
    }
}

impl EstimatorManifest {
    /// Randomly initialised weights with the given shape. Used for smoke runs
    /// and benchmarks when no trained artifact is at hand.
    pub fn random(shape: EstimatorShape, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let hidden = shape.hidden_dim;
        let feedforward = hidden * 2;
        let head_dim = default_head_dim();
        let layers = (0..shape.num_layers)
            .map(|_| EncoderLayerWeights {
                in_proj: LayerWeights::random(&mut rng, hidden, 3 * hidden),
                out_proj: LayerWeights::random(&mut rng, hidden, hidden),
                linear1: LayerWeights::random(&mut rng, hidden, feedforward),
                linear2: LayerWeights::random(&mut rng, feedforward, hidden),
                norm1: NormWeights::identity(hidden),
                norm2: NormWeights::identity(hidden),
            })
            .collect();
        let head = |rng: &mut StdRng| HeadWeights {
            hidden: LayerWeights::random(rng, hidden, head_dim),
            alpha: LayerWeights::random(rng, head_dim, 1),
            beta: LayerWeights::random(rng, head_dim, 1),
        };
        let heads = EstimatorHeads {
            ability: head(&mut rng),
            benevolence: head(&mut rng),
            integrity: head(&mut rng),
        };
        Self {
            schema_version: 1,
            state_dim: PARTNER_STATE_DIM,
            hidden_dim: hidden,
            num_heads: shape.num_heads,
            feedforward_dim: feedforward,
            head_dim,
            windows: TraitWindows::default(),
            input_proj: LayerWeights::random(&mut rng, PARTNER_STATE_DIM, hidden),
            layers,
            attn_vec: (0..hidden).map(|_| rng.gen_range(-1.0..1.0)).collect(),
            heads,
        }
    }
}

#[derive(Debug, Clone)]
struct EncoderLayer {
    in_proj: Linear,
    out_proj: Linear,
    linear1: Linear,
    linear2: Linear,
    norm1: LayerNorm,
    norm2: LayerNorm,
}

#[derive(Debug, Clone)]
struct TraitHead {
    hidden: Linear,
    alpha: Linear,
    beta: Linear,
}

/// Transformer-encoder estimator evaluated in plain `f32`.
#[derive(Debug, Clone)]
pub struct TransformerEstimator {
    hidden_dim: usize,
    num_heads: usize,
    windows: TraitWindows,
    input_proj: Linear,
    layers: Vec<EncoderLayer>,
    attn_vec: Vec<f32>,
    heads: [TraitHead; 3],
}

impl TransformerEstimator {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let manifest: EstimatorManifest = nn::read_manifest(path)?;
        Self::from_manifest(&manifest)
    }

    pub fn from_manifest(manifest: &EstimatorManifest) -> Result<Self, LoadError> {
        let hidden = manifest.hidden_dim;
        if manifest.state_dim != PARTNER_STATE_DIM {
            return Err(LoadError::Incompatible(format!(
                "estimator expects state_dim {}, manifest has {}",
                PARTNER_STATE_DIM, manifest.state_dim
            )));
        }
        if hidden == 0 || manifest.num_heads == 0 || hidden % manifest.num_heads != 0 {
            return Err(LoadError::Incompatible(format!(
                "hidden_dim {hidden} is not divisible into {} heads",
                manifest.num_heads
            )));
        }
        if manifest.attn_vec.len() != hidden {
            return Err(LoadError::Incompatible(format!(
                "attn_vec expects {hidden} entries, got {}",
                manifest.attn_vec.len()
            )));
        }

        let ff = manifest.feedforward_dim;
        let layers = manifest
            .layers
            .iter()
            .enumerate()
            .map(|(idx, layer)| -> Result<EncoderLayer, LoadError> {
                Ok(EncoderLayer {
                    in_proj: Linear::from_weights(
                        &format!("layers[{idx}].in_proj"),
                        &layer.in_proj,
                        hidden,
                        3 * hidden,
                    )?,
                    out_proj: Linear::from_weights(
                        &format!("layers[{idx}].out_proj"),
                        &layer.out_proj,
                        hidden,
                        hidden,
                    )?,
                    linear1: Linear::from_weights(
                        &format!("layers[{idx}].linear1"),
                        &layer.linear1,
                        hidden,
                        ff,
                    )?,
                    linear2: Linear::from_weights(
                        &format!("layers[{idx}].linear2"),
                        &layer.linear2,
                        ff,
                        hidden,
                    )?,
                    norm1: LayerNorm::from_weights(
                        &format!("layers[{idx}].norm1"),
                        &layer.norm1,
                        hidden,
                    )?,
                    norm2: LayerNorm::from_weights(
                        &format!("layers[{idx}].norm2"),
                        &layer.norm2,
                        hidden,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        let head = |which: Trait| -> Result<TraitHead, LoadError> {
            let weights = manifest.heads.get(which);
            let dim = manifest.head_dim;
            Ok(TraitHead {
                hidden: Linear::from_weights(
                    &format!("heads.{which}.hidden"),
                    &weights.hidden,
                    hidden,
                    dim,
                )?,
                alpha: Linear::from_weights(&format!("heads.{which}.alpha"), &weights.alpha, dim, 1)?,
                beta: Linear::from_weights(&format!("heads.{which}.beta"), &weights.beta, dim, 1)?,
            })
        };

        Ok(Self {
            hidden_dim: hidden,
            num_heads: manifest.num_heads,
            windows: manifest.windows,
            input_proj: Linear::from_weights(
                "input_proj",
                &manifest.input_proj,
                PARTNER_STATE_DIM,
                hidden,
            )?,
            layers,
            attn_vec: manifest.attn_vec.clone(),
            heads: [
                head(Trait::Ability)?,
                head(Trait::Benevolence)?,
                head(Trait::Integrity)?,
            ],
        })
    }

    pub fn windows(&self) -> TraitWindows {
        self.windows
    }

    fn self_attention(&self, layer: &EncoderLayer, tokens: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let hidden = self.hidden_dim;
        let head_dim = hidden / self.num_heads;
        let scale = 1.0 / (head_dim as f32).sqrt();
        let qkv: Vec<Vec<f32>> = tokens.iter().map(|t| layer.in_proj.forward(t)).collect();

        let mut attended = vec![vec![0.0f32; hidden]; tokens.len()];
        for head in 0..self.num_heads {
            let q_off = head * head_dim;
            let k_off = hidden + head * head_dim;
            let v_off = 2 * hidden + head * head_dim;
            for (i, query) in qkv.iter().enumerate() {
                let mut scores: Vec<f32> = qkv
                    .iter()
                    .map(|key| {
                        let mut dot = 0.0f32;
                        for d in 0..head_dim {
                            dot += query[q_off + d] * key[k_off + d];
                        }
                        dot * scale
                    })
                    .collect();
                nn::softmax(&mut scores);
                for (weight, value) in scores.iter().zip(&qkv) {
                    for d in 0..head_dim {
                        attended[i][head * head_dim + d] += weight * value[v_off + d];
                    }
                }
            }
        }
        attended.iter().map(|row| layer.out_proj.forward(row)).collect()
    }

    fn encode(&self, history: &[StateVector]) -> Vec<Vec<f32>> {
        let mut tokens: Vec<Vec<f32>> =
            history.iter().map(|s| self.input_proj.forward(s)).collect();
        for layer in &self.layers {
            let attended = self.self_attention(layer, &tokens);
            tokens = tokens
                .iter()
                .zip(&attended)
                .map(|(x, a)| {
                    let residual: Vec<f32> = x.iter().zip(a).map(|(x, a)| x + a).collect();
                    layer.norm1.forward(&residual)
                })
                .collect();
            tokens = tokens
                .iter()
                .map(|x| {
                    let mut inner = layer.linear1.forward(x);
                    nn::relu(&mut inner);
                    let ff = layer.linear2.forward(&inner);
                    let residual: Vec<f32> = x.iter().zip(&ff).map(|(x, f)| x + f).collect();
                    layer.norm2.forward(&residual)
                })
                .collect();
        }
        tokens
    }

    /// Attention pooling over the last `window` tokens.
    fn pool(&self, tokens: &[Vec<f32>], window: usize) -> Vec<f32> {
        let start = tokens.len().saturating_sub(window.max(1));
        let recent = &tokens[start..];
        let mut weights: Vec<f32> = recent
            .iter()
            .map(|token| token.iter().zip(&self.attn_vec).map(|(h, a)| h * a).sum())
            .collect();
        nn::softmax(&mut weights);
        let mut pooled = vec![0.0f32; self.hidden_dim];
        for (weight, token) in weights.iter().zip(recent) {
            for (acc, h) in pooled.iter_mut().zip(token) {
                *acc += weight * h;
            }
        }
        pooled
    }
}

impl TraitEstimator for TransformerEstimator {
    fn predict_beta_params(&self, history: &[StateVector]) -> TraitParams {
        if history.is_empty() {
            return TraitParams::uniform();
        }
        let tokens = self.encode(history);
        let mut params = TraitParams::uniform();
        for which in Trait::ALL {
            let head = &self.heads[which.index()];
            let pooled = self.pool(&tokens, self.windows.get(which));
            let mut hidden = head.hidden.forward(&pooled);
            nn::relu(&mut hidden);
            let alpha = nn::softplus(head.alpha.forward(&hidden)[0]) + PARAM_FLOOR;
            let beta = nn::softplus(head.beta.forward(&hidden)[0]) + PARAM_FLOOR;
            params[which] = BetaParams::new(f64::from(alpha), f64::from(beta));
        }
        params
    }
}
