use crate::session::SessionError;
use kitchen_core::belief::BeliefState;
use kitchen_core::env::{BoxSpace, ObservationSpace};

/// Width of the belief block appended to augmented observations.
pub const BELIEF_WIDTH: usize = 6;

/// Builds the policy observation from the env's macro observation, optionally
/// followed by `[mean_A, mean_B, mean_I, conf_A, conf_B, conf_I]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationComposer {
    space: ObservationSpace,
    augment: bool,
}

impl ObservationComposer {
    pub fn new(base: ObservationSpace, augment: bool) -> Result<Self, SessionError> {
        let space = match base {
            ObservationSpace::Box(mut bounds) if augment => {
                bounds.low.extend([f32::NEG_INFINITY; BELIEF_WIDTH]);
                bounds.high.extend([f32::INFINITY; BELIEF_WIDTH]);
                ObservationSpace::Box(bounds)
            }
            other if augment => {
                return Err(SessionError::ObservationSpace {
                    kind: other.kind(),
                });
            }
            other => other,
        };
        Ok(Self { space, augment })
    }

    pub fn augments(&self) -> bool {
        self.augment
    }

    /// Space of the composed observation.
    pub fn observation_space(&self) -> &ObservationSpace {
        &self.space
    }

    pub fn dim(&self) -> usize {
        match &self.space {
            ObservationSpace::Box(BoxSpace { low, .. }) => low.len(),
            ObservationSpace::Discrete(_) => 1,
        }
    }

    pub fn compose(&self, base: &[f32], belief: &BeliefState) -> Vec<f32> {
        let mut out = Vec::with_capacity(base.len() + BELIEF_WIDTH);
        out.extend_from_slice(base);
        if self.augment {
            out.extend_from_slice(&belief.features());
        }
        out
    }
}
