//! Joins the AI partner's macro choice and the human's key into one joint
//! primitive action.

use kitchen_core::env::CollaboratorEnv;
use kitchen_core::model::PrimitiveAction;

pub const ROBOT: usize = 0;
pub const HUMAN: usize = 1;

/// One joint action ready for `CollaboratorEnv::step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointAction {
    /// Indexed by agent. Agents beyond the human stay idle.
    pub primitives: Vec<PrimitiveAction>,
}

impl JointAction {
    pub fn robot(&self) -> PrimitiveAction {
        self.primitives[ROBOT]
    }

    pub fn human(&self) -> PrimitiveAction {
        self.primitives[HUMAN]
    }
}

/// Lowers `macro_action` for the robot through the env's translator and pairs
/// it with `human`. Without a macro the robot stays in place and the
/// translator is not consulted.
pub fn joint_action(
    env: &mut dyn CollaboratorEnv,
    macro_action: Option<usize>,
    human: PrimitiveAction,
) -> JointAction {
    let mut primitives = vec![PrimitiveAction::Stay; env.n_agents().max(HUMAN + 1)];
    if let Some(chosen) = macro_action {
        let mut macros = vec![0; env.n_agents()];
        macros[ROBOT] = chosen;
        let plan = env.compute_low_level_actions(&macros);
        primitives[ROBOT] = plan
            .primitives
            .get(ROBOT)
            .copied()
            .unwrap_or(PrimitiveAction::Stay);
    }
    primitives[HUMAN] = human;
    JointAction { primitives }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitchen_core::kitchen::{KitchenConfig, KitchenEnv};
    use kitchen_core::model::MacroAction;

    fn practice() -> KitchenEnv {
        KitchenEnv::new(KitchenConfig::builtin("practice", 2).unwrap()).unwrap()
    }

    #[test]
    fn second_element_is_the_key_and_first_is_the_translator_output() {
        let mut env = practice();
        let mut reference = env.clone();
        let joint = joint_action(&mut env, Some(MacroAction::GetPlate.index()), PrimitiveAction::Down);
        let plan = reference.compute_low_level_actions(&[MacroAction::GetPlate.index(), 0]);
        assert_eq!(joint.human(), PrimitiveAction::Down);
        assert_eq!(joint.robot(), plan.primitives[0]);
        assert_eq!(joint.primitives.len(), 2);
    }

    #[test]
    fn no_macro_means_robot_stays() {
        let mut env = practice();
        let joint = joint_action(&mut env, None, PrimitiveAction::Up);
        assert_eq!(joint.primitives, vec![PrimitiveAction::Stay, PrimitiveAction::Up]);
        assert!(env.macro_action_done(ROBOT));
    }
}
