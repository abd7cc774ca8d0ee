//! Control loop around one environment: belief tracking, observation
//! composition and the periodic soft reset.

use crate::bridge::{HUMAN, ROBOT};
use crate::composer::ObservationComposer;
use crate::session::SessionError;
use kitchen_core::belief::{BeliefState, BeliefTracker, PartnerStep};
use kitchen_core::env::{AgentView, CollaboratorEnv, StepInfo};
use kitchen_core::model::PrimitiveAction;

/// What one wrapped step produced.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedStep {
    /// Composed observation for the robot.
    pub observation: Vec<f32>,
    /// Sum of every agent's reward.
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
    pub belief_updated: bool,
    pub soft_reset: bool,
    pub agents_before: Vec<AgentView>,
    pub agents_after: Vec<AgentView>,
}

pub struct ControlWrapper {
    env: Box<dyn CollaboratorEnv>,
    composer: ObservationComposer,
    tracker: Option<BeliefTracker>,
    cadence: u64,
    steps: u64,
    observation: Vec<f32>,
}

impl ControlWrapper {
    /// Augments the observation with belief features when a tracker is given.
    pub fn new(
        env: Box<dyn CollaboratorEnv>,
        tracker: Option<BeliefTracker>,
        cadence: u64,
    ) -> Result<Self, SessionError> {
        let composer = ObservationComposer::new(env.observation_space(), tracker.is_some())?;
        Ok(Self {
            env,
            composer,
            tracker,
            cadence: cadence.max(1),
            steps: 0,
            observation: Vec::new(),
        })
    }

    /// Resets the env and the belief, returning the first composed observation.
    pub fn reset(&mut self, seed: u64) -> Vec<f32> {
        let observations = self.env.reset(seed);
        if let Some(tracker) = &mut self.tracker {
            let partner = self
                .env
                .partner_centric_observation()
                .get(HUMAN)
                .copied()
                .unwrap_or_default();
            tracker.reset(partner);
        }
        self.steps = 0;
        let base = observations.get(ROBOT).cloned().unwrap_or_default();
        self.observation = self.composer.compose(&base, &self.belief());
        self.observation.clone()
    }

    pub fn step(&mut self, joint: &[PrimitiveAction]) -> WrappedStep {
        let agents_before = self.env.agents();
        let outcome = self.env.step(joint);
        let agents_after = self.env.agents();

        let mut belief_updated = false;
        if let Some(tracker) = &mut self.tracker {
            let partner = self
                .env
                .partner_centric_observation()
                .get(HUMAN)
                .copied()
                .unwrap_or_default();
            let stations = self.env.stations();
            let before = agents_before.get(HUMAN);
            let after = agents_after.get(HUMAN);
            belief_updated = tracker.observe(PartnerStep {
                state: partner,
                held_before: before.and_then(|view| view.holding),
                held_after: after.and_then(|view| view.holding),
                position: after.map(|view| (view.x, view.y)).unwrap_or_default(),
                stations: &stations,
            });
            if belief_updated {
                let belief = tracker.state();
                tracing::debug!(
                    means = ?belief.means,
                    confidences = ?belief.confidences,
                    updates = tracker.updates(),
                    "belief updated"
                );
            }
        }

        self.steps += 1;
        let soft_reset = self.steps % self.cadence == 0;
        if soft_reset {
            self.env.soft_reset_obs_only();
            self.env.set_macro_action_done(ROBOT, true);
            self.env.set_macro_action_done(HUMAN, true);
            tracing::debug!(step = self.steps, cadence = self.cadence, "soft reset");
        }

        let base = self
            .env
            .macro_observation()
            .get(ROBOT)
            .cloned()
            .unwrap_or_default();
        self.observation = self.composer.compose(&base, &self.belief());

        WrappedStep {
            observation: self.observation.clone(),
            reward: outcome.rewards.iter().map(|r| f64::from(*r)).sum(),
            done: outcome.done,
            info: outcome.info,
            belief_updated,
            soft_reset,
            agents_before,
            agents_after,
        }
    }

    /// Latest composed observation.
    pub fn observation(&self) -> &[f32] {
        &self.observation
    }

    pub fn observation_dim(&self) -> usize {
        self.composer.dim()
    }

    pub fn composer(&self) -> &ObservationComposer {
        &self.composer
    }

    /// Neutral when the configuration tracks no belief.
    pub fn belief(&self) -> BeliefState {
        self.tracker
            .as_ref()
            .map(BeliefTracker::state)
            .unwrap_or_default()
    }

    pub fn tracker(&self) -> Option<&BeliefTracker> {
        self.tracker.as_ref()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn cadence(&self) -> u64 {
        self.cadence
    }

    pub fn env(&self) -> &dyn CollaboratorEnv {
        self.env.as_ref()
    }

    pub fn env_mut(&mut self) -> &mut dyn CollaboratorEnv {
        self.env.as_mut()
    }

    pub fn close(&mut self) {
        self.env.close();
    }
}
