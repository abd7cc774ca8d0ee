use super::{Policy, PolicyError, check_len};
use kitchen_core::model::MacroAction;
use rand::rngs::StdRng;

const RAW_LETTUCE: f32 = 0.25;
const CHOPPED_LETTUCE: f32 = 0.5;
const EMPTY_PLATE: f32 = 0.75;
const DISH: f32 = 1.0;

fn holding_is(code: f32, expected: f32) -> bool {
    (code - expected).abs() < 1e-3
}

/// Hand-written cook that reads the kitchen macro observation directly.
///
/// Useful as a baseline partner and for running sessions without a trained
/// artifact. It ignores any belief features appended to the observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedCook {
    observation_dim: usize,
    n_agents: usize,
}

impl ScriptedCook {
    pub const fn new(observation_dim: usize, n_agents: usize) -> Self {
        Self {
            observation_dim,
            n_agents,
        }
    }

    pub fn choose(&self, observation: &[f32]) -> MacroAction {
        let holding = observation.get(2).copied().unwrap_or(0.0);
        let dish_ready = observation
            .get(3 * self.n_agents)
            .is_some_and(|flag| *flag > 0.5);

        if holding_is(holding, DISH) {
            MacroAction::Deliver
        } else if holding_is(holding, CHOPPED_LETTUCE) {
            MacroAction::GetPlate
        } else if holding_is(holding, RAW_LETTUCE) {
            MacroAction::GoToKnife1
        } else if holding_is(holding, EMPTY_PLATE) {
            MacroAction::GetLettuce
        } else if dish_ready {
            MacroAction::GetPlate
        } else {
            MacroAction::GetLettuce
        }
    }
}

impl Policy for ScriptedCook {
    fn observation_dim(&self) -> usize {
        self.observation_dim
    }

    fn action_count(&self) -> usize {
        MacroAction::COUNT
    }

    fn predict(
        &self,
        observation: &[f32],
        _deterministic: bool,
        _rng: &mut StdRng,
    ) -> Result<usize, PolicyError> {
        check_len(observation, self.observation_dim)?;
        Ok(self.choose(observation).index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(holding: f32, dish_ready: bool) -> Vec<f32> {
        let mut obs = vec![0.0; 12];
        obs[2] = holding;
        obs[6] = if dish_ready { 1.0 } else { 0.0 };
        obs
    }

    #[test]
    fn follows_the_salad_recipe() {
        let cook = ScriptedCook::new(12, 2);
        assert_eq!(cook.choose(&observation(0.0, false)), MacroAction::GetLettuce);
        assert_eq!(cook.choose(&observation(RAW_LETTUCE, false)), MacroAction::GoToKnife1);
        assert_eq!(cook.choose(&observation(CHOPPED_LETTUCE, false)), MacroAction::GetPlate);
        assert_eq!(cook.choose(&observation(0.0, true)), MacroAction::GetPlate);
        assert_eq!(cook.choose(&observation(DISH, true)), MacroAction::Deliver);
        assert_eq!(cook.choose(&observation(EMPTY_PLATE, false)), MacroAction::GetLettuce);
    }

    #[test]
    fn rejects_wrong_length() {
        let cook = ScriptedCook::new(12, 2);
        let mut rng: StdRng = rand::SeedableRng::seed_from_u64(1);
        assert!(cook.predict(&[0.0; 5], true, &mut rng).is_err());
    }
}
