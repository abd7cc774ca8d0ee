//! Contract between the control loop and a grid-world simulation.
//!
//! The session layer only talks to the world through [`CollaboratorEnv`]; the
//! reference [`crate::kitchen::KitchenEnv`] is one implementation of it.

use crate::model::{Item, MacroAction, PrimitiveAction, RewardEvent};
use serde::Serialize;

/// Width of the partner-centric state vector consumed by the belief estimator.
pub const PARTNER_STATE_DIM: usize = 6;

pub type StateVector = [f32; PARTNER_STATE_DIM];

/// Bounded real vector space.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl BoxSpace {
    pub fn uniform(dim: usize, low: f32, high: f32) -> Self {
        Self {
            low: vec![low; dim],
            high: vec![high; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObservationSpace {
    Box(BoxSpace),
    Discrete(usize),
}

impl ObservationSpace {
    pub fn kind(&self) -> &'static str {
        match self {
            ObservationSpace::Box(_) => "box",
            ObservationSpace::Discrete(_) => "discrete",
        }
    }
}

/// Read-only view over one agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
    pub x: usize,
    pub y: usize,
    pub holding: Option<Item>,
}

/// Reward event credited to one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditedEvent {
    pub agent: usize,
    pub event: RewardEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepInfo {
    pub events: Vec<CreditedEvent>,
}

/// Result of advancing the world by one joint primitive action.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub observations: Vec<Vec<f32>>,
    pub rewards: Vec<f32>,
    pub done: bool,
    pub info: StepInfo,
}

/// Bookkeeping for one agent's macro action after translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroStatus {
    pub action: MacroAction,
    pub done: bool,
}

/// Output of the macro-to-primitive translator.
#[derive(Debug, Clone, PartialEq)]
pub struct LowLevelPlan {
    pub primitives: Vec<PrimitiveAction>,
    pub meta: Vec<MacroStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSnapshot {
    pub x: usize,
    pub y: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub containing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub x: usize,
    pub y: usize,
    pub color: String,
    pub holding: Option<String>,
    pub holding_containing: Option<String>,
}

/// Render-free description of the world for callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub xlen: usize,
    pub ylen: usize,
    pub map: Vec<Vec<u8>>,
    pub items: Vec<ItemSnapshot>,
    pub agents: Vec<AgentSnapshot>,
}

/// Simulation collaborator driven by the control loop.
pub trait CollaboratorEnv: Send {
    fn n_agents(&self) -> usize;

    /// Number of macro actions the translator understands.
    fn macro_action_count(&self) -> usize;

    /// Restores the initial world and reseeds any internal randomness.
    fn reset(&mut self, seed: u64) -> Vec<Vec<f32>>;

    fn step(&mut self, joint: &[PrimitiveAction]) -> StepOutcome;

    /// Clears observation bookkeeping without touching item or agent positions.
    fn soft_reset_obs_only(&mut self);

    fn agents(&self) -> Vec<AgentView>;

    /// Chopping station coordinates.
    fn stations(&self) -> Vec<(usize, usize)>;

    /// Lowers one macro action index per agent to primitive actions.
    fn compute_low_level_actions(&mut self, macros: &[usize]) -> LowLevelPlan;

    /// Per-agent macro-level observation.
    fn macro_observation(&self) -> Vec<Vec<f32>>;

    /// Per-agent partner-centric state vectors for the belief pipeline.
    fn partner_centric_observation(&self) -> Vec<StateVector>;

    fn macro_action_done(&self, agent: usize) -> bool;

    fn set_macro_action_done(&mut self, agent: usize, done: bool);

    fn observation_space(&self) -> ObservationSpace;

    fn snapshot(&self) -> WorldSnapshot;

    /// Releases external resources. Safe to call more than once.
    fn close(&mut self) {}
}

/// Grid distance used for adjacency checks.
pub fn manhattan(a: (usize, usize), b: (usize, usize)) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}
