mod mlp;
mod scripted;

pub use mlp::{Architecture, Extractor, MlpManifest, MlpPolicy};
pub use scripted::ScriptedCook;

use rand::rngs::StdRng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("observation has {found} entries, policy expects {expected}")]
    InputLength { expected: usize, found: usize },
}

/// Macro-action chooser for the AI partner.
///
/// Implementations are immutable after construction so one loaded instance
/// can serve every session; per-call randomness comes from the caller.
pub trait Policy: Send + Sync {
    /// Length of the observation vector the policy was built for.
    fn observation_dim(&self) -> usize;

    fn action_count(&self) -> usize;

    /// Whether the trailing six observation entries are read as belief
    /// means and confidences.
    fn reads_belief_features(&self) -> bool {
        false
    }

    /// Picks a macro-action index in `0..action_count()`.
    fn predict(
        &self,
        observation: &[f32],
        deterministic: bool,
        rng: &mut StdRng,
    ) -> Result<usize, PolicyError>;
}

pub(crate) fn check_len(observation: &[f32], expected: usize) -> Result<(), PolicyError> {
    if observation.len() != expected {
        return Err(PolicyError::InputLength {
            expected,
            found: observation.len(),
        });
    }
    Ok(())
}
