use super::estimator::TraitEstimator;
use super::history::History;
use super::posterior::{BetaMoments, Posterior, TrackerConfig};
use super::traits::{Trait, TraitParams};
use super::trigger::KeyEventPredicate;
use crate::env::StateVector;
use crate::model::Item;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Visible belief: smoothed mean and instantaneous confidence per trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeliefState {
    pub means: [f64; 3],
    pub confidences: [f64; 3],
}

impl BeliefState {
    pub const NEUTRAL: BeliefState = BeliefState {
        means: [0.5; 3],
        confidences: [0.0; 3],
    };

    pub fn mean(&self, which: Trait) -> f64 {
        self.means[which.index()]
    }

    pub fn confidence(&self, which: Trait) -> f64 {
        self.confidences[which.index()]
    }

    /// `[mean_A, mean_B, mean_I, conf_A, conf_B, conf_I]` as appended to the
    /// policy observation.
    pub fn features(&self) -> [f32; 6] {
        let mut out = [0.0f32; 6];
        for which in Trait::ALL {
            out[which.index()] = self.mean(which) as f32;
            out[3 + which.index()] = self.confidence(which) as f32;
        }
        out
    }
}

impl Default for BeliefState {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// What the tracker needs to know about the partner after one step.
#[derive(Debug, Clone, Copy)]
pub struct PartnerStep<'a> {
    pub state: StateVector,
    pub held_before: Option<Item>,
    pub held_after: Option<Item>,
    pub position: (usize, usize),
    pub stations: &'a [(usize, usize)],
}

/// Online trait inference for one session.
pub struct BeliefTracker {
    estimator: Arc<dyn TraitEstimator>,
    config: TrackerConfig,
    predicate: KeyEventPredicate,
    history: History,
    posteriors: [Posterior; 3],
    state: BeliefState,
    updates: u64,
}

impl fmt::Debug for BeliefTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeliefTracker")
            .field("config", &self.config)
            .field("predicate", &self.predicate)
            .field("history_len", &self.history.len())
            .field("state", &self.state)
            .field("updates", &self.updates)
            .finish_non_exhaustive()
    }
}

impl BeliefTracker {
    pub fn new(
        estimator: Arc<dyn TraitEstimator>,
        context: usize,
        predicate: KeyEventPredicate,
        config: TrackerConfig,
    ) -> Self {
        Self {
            estimator,
            config,
            predicate,
            history: History::new(context),
            posteriors: [Posterior::default(); 3],
            state: BeliefState::NEUTRAL,
            updates: 0,
        }
    }

    /// Returns to the neutral belief and seeds the window with `initial`.
    pub fn reset(&mut self, initial: StateVector) {
        self.state = BeliefState::NEUTRAL;
        self.posteriors = [Posterior::default(); 3];
        self.history.clear();
        self.history.push(initial);
        self.updates = 0;
    }

    /// Records one step. Returns `true` when a key event triggered an update.
    pub fn observe(&mut self, step: PartnerStep<'_>) -> bool {
        self.history.push(step.state);
        let fired = self.predicate.fires(
            &self.history,
            step.held_before,
            step.held_after,
            step.position,
            step.stations,
        );
        if fired {
            let params = self.estimator.predict_beta_params(&self.history.to_vec());
            self.apply(&params);
        }
        fired
    }

    /// Folds one estimator output into the posterior and the visible belief.
    pub fn apply(&mut self, params: &TraitParams) {
        for which in Trait::ALL {
            let observed = BetaMoments::of(params[which], &self.config);
            let smoothed = self.posteriors[which.index()].absorb(&observed, &self.config);
            self.state.means[which.index()] = smoothed;
            self.state.confidences[which.index()] = observed.confidence;
        }
        self.updates += 1;
    }

    pub fn state(&self) -> BeliefState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn posterior(&self, which: Trait) -> &Posterior {
        &self.posteriors[which.index()]
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::estimator::ConstantEstimator;
    use crate::belief::traits::BetaParams;

    fn tracker(alpha: f64, beta: f64, context: usize) -> BeliefTracker {
        BeliefTracker::new(
            Arc::new(ConstantEstimator::uniform(alpha, beta)),
            context,
            KeyEventPredicate::default(),
            TrackerConfig::default(),
        )
    }

    fn drop_step() -> PartnerStep<'static> {
        PartnerStep {
            state: [0.1; 6],
            held_before: Some(Item::fresh_lettuce()),
            held_after: None,
            position: (2, 2),
            stations: &[],
        }
    }

    #[test]
    fn non_event_steps_leave_belief_neutral() {
        let mut tracker = tracker(9.0, 1.0, 30);
        tracker.reset([0.0; 6]);
        for _ in 0..50 {
            let updated = tracker.observe(PartnerStep {
                held_before: None,
                ..drop_step()
            });
            assert!(!updated);
        }
        assert_eq!(tracker.state(), BeliefState::NEUTRAL);
        assert!(tracker.posterior(Trait::Ability).counts().is_none());
        assert!(tracker.history().is_full());
    }

    #[test]
    fn drops_before_the_window_fills_are_ignored() {
        let mut tracker = tracker(9.0, 1.0, 3);
        tracker.reset([0.0; 6]);
        assert!(!tracker.observe(drop_step()));
        assert!(tracker.observe(drop_step()));
        assert_eq!(tracker.updates(), 1);
    }

    #[test]
    fn certain_evidence_raises_mean_monotonically() {
        let mut tracker = tracker(5.0, 0.0, 2);
        tracker.reset([0.0; 6]);
        let mut previous = 0.5;
        for _ in 0..50 {
            assert!(tracker.observe(drop_step()));
            let mean = tracker.state().mean(Trait::Integrity);
            assert!(mean > previous, "{mean} <= {previous}");
            assert!(mean < 1.0);
            previous = mean;
        }
    }

    #[test]
    fn update_applies_decay_then_capped_evidence() {
        let mut tracker = tracker(1.0, 1.0, 2);
        tracker.reset([0.0; 6]);
        tracker.apply(&TraitParams([BetaParams::new(6.0, 2.0); 3]));
        let counts = tracker.posterior(Trait::Ability).counts().unwrap();
        assert!((counts.alpha - (0.999 + 2.0 * 0.75)).abs() < 1e-12);
        assert!((counts.beta - (0.999 + 2.0 * 0.25)).abs() < 1e-12);

        let state = tracker.state();
        assert!((state.mean(Trait::Ability) - counts.mean()).abs() < 1e-12);
        // var = 12 / (64 * 9), std ≈ 0.1443
        let expected_conf = 1.0 - 2.0 * (12.0f64 / 576.0).sqrt();
        assert!((state.confidence(Trait::Ability) - expected_conf).abs() < 1e-12);
    }

    #[test]
    fn reset_clears_everything() {
        let mut tracker = tracker(5.0, 1.0, 2);
        tracker.reset([0.0; 6]);
        tracker.observe(drop_step());
        assert_ne!(tracker.state(), BeliefState::NEUTRAL);

        tracker.reset([0.3; 6]);
        assert_eq!(tracker.state(), BeliefState::NEUTRAL);
        assert_eq!(tracker.history().len(), 1);
        assert!(tracker.posterior(Trait::Benevolence).counts().is_none());
        assert_eq!(
            BeliefState::NEUTRAL.features(),
            [0.5, 0.5, 0.5, 0.0, 0.0, 0.0]
        );
    }
}
