//! Per-participant sessions and the table that owns them.
//!
//! A session holds its own environment, control wrapper, belief tracker and
//! trajectory log. Policies and estimators come from the shared
//! [`ModelCache`] and are never mutated, so sessions only share read-only
//! artifacts.

mod manager;

pub use manager::SessionManager;

use crate::bridge::joint_action;
use crate::config::{Catalog, ConfigurationSpec, ModelSpec, ValidationError, split_config_id};
use crate::model_cache::ModelCache;
use crate::telemetry::DishTally;
use crate::wrapper::ControlWrapper;
use kitchen_bot::{Policy, PolicyError, ScriptedCook};
use kitchen_core::belief::{BeliefState, BeliefTracker, KeyEventPredicate};
use kitchen_core::env::{CreditedEvent, WorldSnapshot};
use kitchen_core::kitchen::{KitchenEnv, KitchenError};
use kitchen_core::model::PrimitiveAction;
use kitchen_core::nn::LoadError;
use parking_lot::{Mutex, ReentrantMutex};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown configuration '{0}'")]
    UnknownConfig(String),
    #[error("configuration '{config}' uses undefined model '{model}'")]
    UnknownModel { config: String, model: String },
    #[error("configuration '{config}' uses undefined estimator '{estimator}'")]
    UnknownEstimator { config: String, estimator: String },
    #[error("belief features need a box observation space, found {kind}")]
    ObservationSpace { kind: &'static str },
    #[error("model '{model}' expects {expected} observation entries, the wrapper produces {found}")]
    ObservationMismatch {
        model: String,
        expected: usize,
        found: usize,
    },
    #[error("model '{model}' chooses among {found} macro actions, the environment knows {expected}")]
    ActionMismatch {
        model: String,
        expected: usize,
        found: usize,
    },
    #[error("model '{model}' reads belief features but configuration '{config}' has no belief profile")]
    BeliefFeaturesMissing { config: String, model: String },
    #[error("failed to load '{key}': {source}")]
    Load {
        key: String,
        #[source]
        source: LoadError,
    },
    #[error(transparent)]
    Environment(#[from] KitchenError),
    #[error("session '{0}' not found")]
    NotFound(String),
    #[error("session '{0}' has not been reset into a configuration yet")]
    NotInitialized(String),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Selector(#[from] ValidationError),
}

/// One robot decision, as logged for later analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RobotStepRecord {
    pub step: u32,
    /// `None` when the configuration has no policy.
    pub macro_action: Option<usize>,
    pub low_level_action: u8,
    pub arrow: &'static str,
    pub timestamp_ms: u128,
}

/// Caller-facing view of a session after reset, step or state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub config_id: String,
    pub layout_id: String,
    pub model_id: Option<String>,
    pub state: WorldSnapshot,
    pub cur_step: u32,
    pub steps_left: u32,
    pub cumulative_reward: f64,
    pub belief: BeliefState,
    pub dishes_served: u32,
    pub robot_last_action: Option<RobotStepRecord>,
}

/// Result of [`Session::step`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// `false` when the key was not an arrow and the world did not move.
    pub advanced: bool,
    pub reward: f64,
    pub events: Vec<CreditedEvent>,
    pub belief_updated: bool,
    pub soft_reset: bool,
    pub snapshot: SessionSnapshot,
}

struct Active {
    config_id: String,
    layout_id: String,
    model_id: Option<String>,
    wrapper: ControlWrapper,
    policy: Option<Arc<dyn Policy>>,
}

struct SessionState {
    active: Option<Active>,
    cur_step: u32,
    cumulative_reward: f64,
    robot_steps: Vec<RobotStepRecord>,
    tally: DishTally,
    rng: StdRng,
}

pub struct Session {
    id: String,
    catalog: Arc<Catalog>,
    cache: Arc<ModelCache>,
    inner: ReentrantMutex<RefCell<SessionState>>,
    last_access: Mutex<Instant>,
}

impl Session {
    pub fn new(id: impl Into<String>, catalog: Arc<Catalog>, cache: Arc<ModelCache>) -> Self {
        let state = SessionState {
            active: None,
            cur_step: 0,
            cumulative_reward: 0.0,
            robot_steps: Vec::new(),
            tally: DishTally::new(catalog.tally.clone()),
            rng: StdRng::seed_from_u64(catalog.seed),
        };
        Self {
            id: id.into(),
            catalog,
            cache,
            inner: ReentrantMutex::new(RefCell::new(state)),
            last_access: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn touch(&self) {
        *self.last_access.lock() = Instant::now();
    }

    pub fn last_access(&self) -> Instant {
        *self.last_access.lock()
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_access()) > ttl
    }

    /// Builds a fresh env, wrapper and policy for `config_id`, then swaps
    /// them in. Nothing changes if any part fails to build.
    pub fn reset(&self, config_id: &str) -> Result<SessionSnapshot, SessionError> {
        self.touch();
        let guard = self.inner.lock();
        {
            let mut state = guard.borrow_mut();
            self.reset_state(&mut state, config_id)?;
        }
        self.state()
    }

    /// Advances one step with the human's `key`. A `target_config` different
    /// from the active one hot-swaps the configuration first. Keys other than
    /// the four arrows leave the world untouched.
    pub fn step(
        &self,
        key: &str,
        target_config: Option<&str>,
    ) -> Result<StepReport, SessionError> {
        self.touch();
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();

        if let Some(target) = target_config {
            let differs = state
                .active
                .as_ref()
                .is_none_or(|active| active.config_id != target);
            if differs {
                tracing::info!(session = %self.id, to = target, "hot-swapping configuration");
                self.reset_state(&mut state, target)?;
            }
        }

        let SessionState {
            active,
            cur_step,
            cumulative_reward,
            robot_steps,
            tally,
            rng,
        } = &mut *state;
        let Some(active) = active.as_mut() else {
            return Err(SessionError::NotInitialized(self.id.clone()));
        };

        let Some(human) = PrimitiveAction::from_key(key) else {
            drop(state);
            return Ok(StepReport {
                advanced: false,
                reward: 0.0,
                events: Vec::new(),
                belief_updated: false,
                soft_reset: false,
                snapshot: self.state()?,
            });
        };

        let macro_action = match &active.policy {
            Some(policy) => Some(policy.predict(active.wrapper.observation(), true, rng)?),
            None => None,
        };
        let joint = joint_action(active.wrapper.env_mut(), macro_action, human);
        robot_steps.push(RobotStepRecord {
            step: *cur_step + 1,
            macro_action,
            low_level_action: joint.robot().code(),
            arrow: joint.robot().key_label(),
            timestamp_ms: now_ms(),
        });

        let outcome = active.wrapper.step(&joint.primitives);
        *cumulative_reward += outcome.reward;
        *cur_step += 1;
        tally.record(outcome.reward, &outcome.agents_before, &outcome.agents_after);

        drop(state);
        Ok(StepReport {
            advanced: true,
            reward: outcome.reward,
            events: outcome.info.events,
            belief_updated: outcome.belief_updated,
            soft_reset: outcome.soft_reset,
            snapshot: self.state()?,
        })
    }

    pub fn state(&self) -> Result<SessionSnapshot, SessionError> {
        self.touch();
        let guard = self.inner.lock();
        let state = guard.borrow();
        let Some(active) = state.active.as_ref() else {
            return Err(SessionError::NotInitialized(self.id.clone()));
        };
        Ok(SessionSnapshot {
            session_id: self.id.clone(),
            config_id: active.config_id.clone(),
            layout_id: active.layout_id.clone(),
            model_id: active.model_id.clone(),
            state: active.wrapper.env().snapshot(),
            cur_step: state.cur_step,
            steps_left: self.catalog.max_steps.saturating_sub(state.cur_step),
            cumulative_reward: state.cumulative_reward,
            belief: active.wrapper.belief(),
            dishes_served: state.tally.served(),
            robot_last_action: state.robot_steps.last().cloned(),
        })
    }

    pub fn config_id(&self) -> Option<String> {
        let guard = self.inner.lock();
        let state = guard.borrow();
        state.active.as_ref().map(|active| active.config_id.clone())
    }

    pub fn robot_steps(&self) -> Vec<RobotStepRecord> {
        let guard = self.inner.lock();
        let state = guard.borrow();
        state.robot_steps.clone()
    }

    /// Latest composed policy observation, if the session is initialised.
    pub fn observation(&self) -> Option<Vec<f32>> {
        let guard = self.inner.lock();
        let state = guard.borrow();
        state
            .active
            .as_ref()
            .map(|active| active.wrapper.observation().to_vec())
    }

    /// Env soft resets performed by the wrapper since the last reset.
    pub fn soft_resets(&self) -> Option<u64> {
        let guard = self.inner.lock();
        let state = guard.borrow();
        state
            .active
            .as_ref()
            .map(|active| active.wrapper.steps() / active.wrapper.cadence())
    }

    /// Releases the env. The session must be reset before further use.
    pub fn close(&self) {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        if let Some(mut active) = state.active.take() {
            active.wrapper.close();
        }
    }

    fn reset_state(&self, state: &mut SessionState, config_id: &str) -> Result<(), SessionError> {
        let spec = self
            .catalog
            .configuration(config_id)
            .ok_or_else(|| SessionError::UnknownConfig(config_id.to_string()))?;
        let mut wrapper = self.build_wrapper(config_id, spec)?;
        let policy = match &spec.policy {
            Some(model) => Some(self.build_policy(config_id, model, spec, &wrapper)?),
            None => None,
        };
        wrapper.reset(self.catalog.seed);

        if let Some(mut previous) = state.active.take() {
            previous.wrapper.close();
        }
        let (layout_id, model_id) = split_config_id(config_id);
        state.active = Some(Active {
            config_id: config_id.to_string(),
            layout_id,
            model_id,
            wrapper,
            policy,
        });
        state.cur_step = 0;
        state.cumulative_reward = 0.0;
        state.robot_steps.clear();
        state.tally.clear();
        state.rng = StdRng::seed_from_u64(self.catalog.seed);

        tracing::info!(
            session = %self.id,
            config = config_id,
            layout = %spec.layout,
            belief = spec.belief.is_some(),
            "session reset"
        );
        Ok(())
    }

    fn build_wrapper(
        &self,
        config_id: &str,
        spec: &ConfigurationSpec,
    ) -> Result<ControlWrapper, SessionError> {
        let env = KitchenEnv::new(spec.kitchen_config()?)?;
        let tracker = match &spec.belief {
            Some(profile) => {
                let estimator_spec = self.catalog.estimator(&profile.estimator).ok_or_else(|| {
                    SessionError::UnknownEstimator {
                        config: config_id.to_string(),
                        estimator: profile.estimator.clone(),
                    }
                })?;
                let estimator = self
                    .cache
                    .estimator(&profile.estimator, estimator_spec, &self.catalog)
                    .map_err(|source| SessionError::Load {
                        key: profile.estimator.clone(),
                        source,
                    })?;
                Some(BeliefTracker::new(
                    estimator,
                    profile.context,
                    KeyEventPredicate::new(profile.station_guard),
                    profile.tracker,
                ))
            }
            None => None,
        };
        ControlWrapper::new(Box::new(env), tracker, spec.reset_cadence)
    }

    fn build_policy(
        &self,
        config_id: &str,
        model: &str,
        spec: &ConfigurationSpec,
        wrapper: &ControlWrapper,
    ) -> Result<Arc<dyn Policy>, SessionError> {
        let model_spec = self
            .catalog
            .model(model)
            .ok_or_else(|| SessionError::UnknownModel {
                config: config_id.to_string(),
                model: model.to_string(),
            })?;
        let policy: Arc<dyn Policy> = match model_spec {
            ModelSpec::Mlp {
                path,
                abi_extractor,
            } => self
                .cache
                .mlp_policy(model, &self.catalog.resolve_path(path), *abi_extractor)
                .map_err(|source| SessionError::Load {
                    key: model.to_string(),
                    source,
                })?,
            ModelSpec::Scripted => {
                Arc::new(ScriptedCook::new(wrapper.observation_dim(), spec.n_agent))
            }
        };
        if policy.observation_dim() != wrapper.observation_dim() {
            return Err(SessionError::ObservationMismatch {
                model: model.to_string(),
                expected: policy.observation_dim(),
                found: wrapper.observation_dim(),
            });
        }
        let known = wrapper.env().macro_action_count();
        if policy.action_count() != known {
            return Err(SessionError::ActionMismatch {
                model: model.to_string(),
                expected: known,
                found: policy.action_count(),
            });
        }
        if policy.reads_belief_features() && !wrapper.composer().augments() {
            return Err(SessionError::BeliefFeaturesMissing {
                config: config_id.to_string(),
                model: model.to_string(),
            });
        }
        Ok(policy)
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}
