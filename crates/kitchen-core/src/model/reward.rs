use serde::{Deserialize, Serialize};

/// Per-agent reward table. Unlisted fields fall back to the study defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardSchedule {
    /// Lettuce finished chopping.
    pub subtask_finished: f32,
    /// Chopped lettuce combined with a plate.
    pub goodtask_finished: f32,
    pub correct_delivery: f32,
    pub wrong_delivery: f32,
    /// Applied to every agent on every step.
    pub step_penalty: f32,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            subtask_finished: 20.0,
            goodtask_finished: 10.0,
            correct_delivery: 200.0,
            wrong_delivery: -50.0,
            step_penalty: -1.0,
        }
    }
}

/// Reward events the kitchen emits during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardEvent {
    Chopped,
    Plated,
    CorrectDelivery,
    WrongDelivery,
}

impl RewardSchedule {
    pub fn value(&self, event: RewardEvent) -> f32 {
        match event {
            RewardEvent::Chopped => self.subtask_finished,
            RewardEvent::Plated => self.goodtask_finished,
            RewardEvent::CorrectDelivery => self.correct_delivery,
            RewardEvent::WrongDelivery => self.wrong_delivery,
        }
    }
}
