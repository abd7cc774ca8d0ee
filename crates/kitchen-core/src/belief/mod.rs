//! Online inference of partner trust traits.
//!
//! A [`BeliefTracker`] keeps a bounded window of partner-centric states. When
//! the partner drops an item and the window is full, a frozen
//! [`TraitEstimator`] turns the window into Beta parameters, which are folded
//! into a decayed posterior per trait.

pub mod estimator;
pub mod history;
pub mod posterior;
pub mod tracker;
pub mod traits;
pub mod trigger;

pub use estimator::{
    ConstantEstimator, EstimatorManifest, EstimatorShape, PARAM_FLOOR, TraitEstimator,
    TraitWindows, TransformerEstimator,
};
pub use history::History;
pub use posterior::{BetaMoments, ConfidenceMode, Posterior, TrackerConfig};
pub use tracker::{BeliefState, BeliefTracker, PartnerStep};
pub use traits::{BetaParams, Trait, TraitParams};
pub use trigger::KeyEventPredicate;
