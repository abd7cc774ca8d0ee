//! Per-session count of served dishes.

use kitchen_core::env::AgentView;
use serde::{Deserialize, Serialize};

const DEFAULT_REWARD_THRESHOLD: f64 = 100.0;

/// Rectangle, inclusive on both ends, where an unexplained dish drop counts as
/// a delivery.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct LocationTrigger {
    pub x: [usize; 2],
    pub y: [usize; 2],
}

impl LocationTrigger {
    pub fn contains(&self, x: usize, y: usize) -> bool {
        (self.x[0]..=self.x[1]).contains(&x) && (self.y[0]..=self.y[1]).contains(&y)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TallyConfig {
    /// A step whose summed reward exceeds this counts one delivery.
    #[serde(default = "default_reward_threshold")]
    pub reward_threshold: f64,
    /// Disabled unless configured.
    #[serde(default)]
    pub location_trigger: Option<LocationTrigger>,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            reward_threshold: DEFAULT_REWARD_THRESHOLD,
            location_trigger: None,
        }
    }
}

fn default_reward_threshold() -> f64 {
    DEFAULT_REWARD_THRESHOLD
}

#[derive(Debug, Clone)]
pub struct DishTally {
    config: TallyConfig,
    served: u32,
}

impl DishTally {
    pub fn new(config: TallyConfig) -> Self {
        Self { config, served: 0 }
    }

    pub fn served(&self) -> u32 {
        self.served
    }

    pub fn clear(&mut self) {
        self.served = 0;
    }

    /// Counts at most one delivery for the step. `before` and `after` are the
    /// agent views around the step.
    pub fn record(&mut self, reward: f64, before: &[AgentView], after: &[AgentView]) -> bool {
        let counted = reward > self.config.reward_threshold
            || self
                .config
                .location_trigger
                .is_some_and(|region| dropped_in(&region, before, after));
        if counted {
            self.served += 1;
            tracing::debug!(served = self.served, reward, "dish counted");
        }
        counted
    }
}

fn holds_dish(view: &AgentView) -> bool {
    view.holding.is_some_and(|item| item.is_dish())
}

fn dropped_in(region: &LocationTrigger, before: &[AgentView], after: &[AgentView]) -> bool {
    // A dish that another agent picked up this step was handed off, not served.
    let handed_off = before
        .iter()
        .zip(after)
        .any(|(was, now)| !holds_dish(was) && holds_dish(now));
    if handed_off {
        return false;
    }
    before.iter().zip(after).any(|(was, now)| {
        holds_dish(was) && now.holding.is_none() && region.contains(now.x, now.y)
    })
}
