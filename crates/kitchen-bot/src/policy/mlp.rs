//! Actor network of a trained PPO agent, evaluated in plain `f32`.
//!
//! Architecture:
//!   - features extractor: identity (`flatten`) or the ABI-gated extractor
//!   - policy trunk: `pi` dense layers with tanh
//!   - action head: dense layer producing one logit per macro action
//!
//! The gated extractor splits the trailing six entries `[A, B, I, cA, cB, cI]`
//! off the observation, runs the rest through a two-layer ReLU backbone and
//! replicates the backbone output into positive and negative slots per trait,
//! keeping only the slot matching the trait's sign.

use super::{Policy, PolicyError, check_len};
use kitchen_core::nn::{self, LayerWeights, Linear, LoadError};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Width of the belief block the gated extractor expects at the tail.
pub const BELIEF_FEATURES: usize = 6;

const BACKBONE_HIDDEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extractor {
    Flatten,
    AbiGated { base_dim: usize },
}

impl Extractor {
    pub fn output_dim(&self, observation_dim: usize) -> usize {
        match self {
            Extractor::Flatten => observation_dim,
            Extractor::AbiGated { base_dim } => 6 * base_dim + BELIEF_FEATURES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    pub extractor: Extractor,
    pub pi: Vec<usize>,
}

impl Architecture {
    /// Construction known to match artifacts trained with the gated extractor.
    pub fn abi_gated_default() -> Self {
        Self {
            extractor: Extractor::AbiGated { base_dim: 64 },
            pi: vec![128, 64],
        }
    }

    pub fn flatten_default() -> Self {
        Self {
            extractor: Extractor::Flatten,
            pi: vec![64, 64],
        }
    }

    /// Parameter names and shapes `(inputs, outputs)` this architecture needs.
    pub fn parameter_shapes(
        &self,
        observation_dim: usize,
        action_count: usize,
    ) -> Vec<(String, usize, usize)> {
        let mut shapes = Vec::new();
        if let Extractor::AbiGated { base_dim } = self.extractor {
            shapes.push((
                "features.backbone.0".to_string(),
                observation_dim.saturating_sub(BELIEF_FEATURES),
                BACKBONE_HIDDEN,
            ));
            shapes.push(("features.backbone.1".to_string(), BACKBONE_HIDDEN, base_dim));
        }
        let mut width = self.extractor.output_dim(observation_dim);
        for (idx, &units) in self.pi.iter().enumerate() {
            shapes.push((format!("pi.{idx}"), width, units));
            width = units;
        }
        shapes.push(("action".to_string(), width, action_count));
        shapes
    }
}

/// JSON form of an exported actor network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MlpManifest {
    #[serde(default)]
    pub schema_version: u32,
    pub observation_dim: usize,
    pub action_count: usize,
    /// Absent in artifacts exported without their construction arguments.
    #[serde(default)]
    pub architecture: Option<Architecture>,
    pub parameters: BTreeMap<String, LayerWeights>,
}

impl MlpManifest {
    /// Randomly initialised manifest, for smoke runs when no trained
    /// artifact is available.
    pub fn random(
        architecture: Architecture,
        observation_dim: usize,
        action_count: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let parameters = architecture
            .parameter_shapes(observation_dim, action_count)
            .into_iter()
            .map(|(name, inputs, outputs)| (name, LayerWeights::random(&mut rng, inputs, outputs)))
            .collect();
        Self {
            schema_version: 1,
            observation_dim,
            action_count,
            architecture: Some(architecture),
            parameters,
        }
    }
}

#[derive(Debug, Clone)]
struct Backbone {
    first: Linear,
    second: Linear,
}

/// Loaded actor network.
#[derive(Debug, Clone)]
pub struct MlpPolicy {
    architecture: Architecture,
    observation_dim: usize,
    backbone: Option<Backbone>,
    trunk: Vec<Linear>,
    action: Linear,
}

impl MlpPolicy {
    /// Reads a manifest from disk. `fallback` is used when the manifest does
    /// not declare its architecture.
    pub fn load<P: AsRef<Path>>(path: P, fallback: &Architecture) -> Result<Self, LoadError> {
        let manifest: MlpManifest = nn::read_manifest(path)?;
        Self::from_manifest(&manifest, fallback)
    }

    pub fn from_manifest(manifest: &MlpManifest, fallback: &Architecture) -> Result<Self, LoadError> {
        let architecture = match &manifest.architecture {
            Some(declared) => declared.clone(),
            None => {
                tracing::warn!(
                    architecture = ?fallback,
                    "policy manifest has no architecture, using fallback"
                );
                fallback.clone()
            }
        };

        let obs_dim = manifest.observation_dim;
        if let Extractor::AbiGated { base_dim } = architecture.extractor {
            if obs_dim <= BELIEF_FEATURES || base_dim == 0 {
                return Err(LoadError::Incompatible(format!(
                    "gated extractor needs more than {BELIEF_FEATURES} inputs and a non-zero base_dim, got {obs_dim} / {base_dim}"
                )));
            }
        }
        if manifest.action_count == 0 {
            return Err(LoadError::Incompatible("action_count must be positive".into()));
        }

        let shapes = architecture.parameter_shapes(obs_dim, manifest.action_count);
        let expected: Vec<&str> = shapes.iter().map(|(name, _, _)| name.as_str()).collect();
        if let Some(extra) = manifest
            .parameters
            .keys()
            .find(|name| !expected.contains(&name.as_str()))
        {
            return Err(LoadError::Incompatible(format!(
                "parameter '{extra}' does not belong to architecture {architecture:?}"
            )));
        }

        let mut layers = shapes
            .iter()
            .map(|(name, inputs, outputs)| {
                let weights = manifest.parameters.get(name).ok_or_else(|| {
                    LoadError::Incompatible(format!("missing parameter '{name}'"))
                })?;
                Linear::from_weights(name, weights, *inputs, *outputs)
            })
            .collect::<Result<Vec<_>, LoadError>>()?
            .into_iter();

        let backbone = match architecture.extractor {
            Extractor::Flatten => None,
            Extractor::AbiGated { .. } => match (layers.next(), layers.next()) {
                (Some(first), Some(second)) => Some(Backbone { first, second }),
                _ => return Err(LoadError::Incompatible("gated backbone incomplete".into())),
            },
        };
        let mut rest: Vec<Linear> = layers.collect();
        let action = rest
            .pop()
            .ok_or_else(|| LoadError::Incompatible("missing action head".into()))?;

        Ok(Self {
            architecture,
            observation_dim: obs_dim,
            backbone,
            trunk: rest,
            action,
        })
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    fn features(&self, observation: &[f32]) -> Vec<f32> {
        let Some(backbone) = &self.backbone else {
            return observation.to_vec();
        };
        let split = observation.len() - BELIEF_FEATURES;
        let (base, belief) = observation.split_at(split);

        let mut hidden = backbone.first.forward(base);
        nn::relu(&mut hidden);
        let mut shared = backbone.second.forward(&hidden);
        nn::relu(&mut shared);

        let signs: Vec<f32> = belief[..3]
            .iter()
            .map(|&value| if value >= 0.5 { 1.0 } else { -1.0 })
            .collect();
        let mut out = Vec::with_capacity(6 * shared.len() + BELIEF_FEATURES);
        for &sign in &signs {
            let positive = sign.max(0.0);
            let negative = (-sign).max(0.0);
            out.extend(shared.iter().map(|f| f * positive));
            out.extend(shared.iter().map(|f| f * negative));
        }
        out.extend_from_slice(&signs);
        out.extend(belief[3..].iter().map(|c| c.clamp(0.0, 1.0)));
        out
    }

    /// Raw action logits.
    pub fn logits(&self, observation: &[f32]) -> Result<Vec<f32>, PolicyError> {
        check_len(observation, self.observation_dim)?;
        let mut x = self.features(observation);
        for layer in &self.trunk {
            x = layer.forward(&x);
            nn::tanh(&mut x);
        }
        Ok(self.action.forward(&x))
    }
}

impl Policy for MlpPolicy {
    fn observation_dim(&self) -> usize {
        self.observation_dim
    }

    fn action_count(&self) -> usize {
        self.action.outputs()
    }

    fn reads_belief_features(&self) -> bool {
        self.backbone.is_some()
    }

    fn predict(
        &self,
        observation: &[f32],
        deterministic: bool,
        rng: &mut StdRng,
    ) -> Result<usize, PolicyError> {
        let logits = self.logits(observation)?;
        if deterministic {
            return Ok(nn::argmax(&logits));
        }
        let mut probs = logits;
        nn::softmax(&mut probs);
        let draw: f32 = rng.r#gen();
        let mut acc = 0.0f32;
        for (idx, p) in probs.iter().enumerate() {
            acc += p;
            if draw < acc {
                return Ok(idx);
            }
        }
        Ok(probs.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn obs(dim: usize) -> Vec<f32> {
        (0..dim).map(|i| (i % 7) as f32 / 7.0).collect()
    }

    #[test]
    fn gated_extractor_output_width() {
        let arch = Architecture::abi_gated_default();
        let manifest = MlpManifest::random(arch, 40, 10, 1);
        let policy = MlpPolicy::from_manifest(&manifest, &Architecture::flatten_default()).unwrap();
        assert_eq!(policy.features(&obs(40)).len(), 6 * 64 + 6);
        assert_eq!(policy.logits(&obs(40)).unwrap().len(), 10);
        assert!(policy.reads_belief_features());

        let flat = MlpManifest::random(Architecture::flatten_default(), 40, 10, 1);
        let flat = MlpPolicy::from_manifest(&flat, &Architecture::flatten_default()).unwrap();
        assert!(!flat.reads_belief_features());
    }

    #[test]
    fn gated_extractor_zeroes_the_opposite_slot() {
        let arch = Architecture {
            extractor: Extractor::AbiGated { base_dim: 4 },
            pi: vec![8],
        };
        let manifest = MlpManifest::random(arch, 12, 3, 2);
        let policy = MlpPolicy::from_manifest(&manifest, &Architecture::flatten_default()).unwrap();
        let mut input = obs(12);
        // A high, B low, I high; confidences out of range get clamped.
        input[6..].copy_from_slice(&[0.9, 0.1, 0.5, 2.0, -1.0, 0.3]);
        let features = policy.features(&input);
        assert!(features[4..8].iter().all(|v| *v == 0.0));
        assert!(features[8..12].iter().all(|v| *v == 0.0));
        assert!(features[20..24].iter().all(|v| *v == 0.0));
        assert_eq!(&features[24..], &[1.0, -1.0, 1.0, 1.0, 0.0, 0.3]);
    }

    #[test]
    fn missing_architecture_uses_fallback() {
        let mut manifest = MlpManifest::random(Architecture::abi_gated_default(), 30, 10, 3);
        manifest.architecture = None;
        let policy = MlpPolicy::from_manifest(&manifest, &Architecture::abi_gated_default()).unwrap();
        assert_eq!(policy.architecture(), &Architecture::abi_gated_default());

        // The flatten fallback cannot host gated parameters.
        let err = MlpPolicy::from_manifest(&manifest, &Architecture::flatten_default()).unwrap_err();
        assert!(err.to_string().contains("does not belong"));
    }

    #[test]
    fn wrong_shapes_are_fatal() {
        let mut manifest = MlpManifest::random(Architecture::flatten_default(), 20, 10, 4);
        manifest
            .parameters
            .insert("pi.0".to_string(), LayerWeights::zeros(19, 64));
        let err = MlpPolicy::from_manifest(&manifest, &Architecture::flatten_default()).unwrap_err();
        assert!(err.to_string().contains("pi.0"));

        let mut manifest = MlpManifest::random(Architecture::flatten_default(), 20, 10, 4);
        manifest.parameters.remove("action");
        assert!(MlpPolicy::from_manifest(&manifest, &Architecture::flatten_default()).is_err());
    }

    #[test]
    fn deterministic_prediction_is_argmax() {
        let manifest = MlpManifest::random(Architecture::flatten_default(), 20, 10, 5);
        let policy = MlpPolicy::from_manifest(&manifest, &Architecture::flatten_default()).unwrap();
        let input = obs(20);
        let logits = policy.logits(&input).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(policy.predict(&input, true, &mut rng).unwrap(), nn::argmax(&logits));

        let sampled = policy.predict(&input, false, &mut rng).unwrap();
        assert!(sampled < 10);
        assert_eq!(
            policy.predict(&input[..19], true, &mut rng),
            Err(PolicyError::InputLength {
                expected: 20,
                found: 19
            })
        );
    }

    #[test]
    fn loads_from_disk() {
        let manifest = MlpManifest::random(Architecture::flatten_default(), 16, 10, 6);
        let file = NamedTempFile::new().unwrap();
        serde_json::to_writer(file.as_file(), &manifest).unwrap();
        let policy = MlpPolicy::load(file.path(), &Architecture::flatten_default()).unwrap();
        assert_eq!(policy.observation_dim(), 16);
        assert_eq!(policy.action_count(), 10);

        assert!(matches!(
            MlpPolicy::load("/definitely/not/here.json", &Architecture::flatten_default()),
            Err(LoadError::Read { .. })
        ));
    }
}
