use crate::telemetry::TallyConfig;
use kitchen_core::belief::TrackerConfig;
use kitchen_core::kitchen::{KitchenConfig, KitchenError};
use kitchen_core::model::{Layout, RewardSchedule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_SEED: u64 = 42;
const DEFAULT_MAX_STEPS: u32 = 200;
const DEFAULT_SESSION_TTL_SECS: u64 = 3_600;
const DEFAULT_RESET_CADENCE: u64 = 100;
const DEFAULT_CONTEXT: usize = 30;
const DEFAULT_CONFIG_ID: &str = "layout_practice";
const BUILTIN_CATALOG: &str = include_str!("../catalog/default.yaml");
const BUILTIN_ORIGIN: &str = "<builtin>";

pub const ENV_SESSION_TTL: &str = "KITCHEN_SESSION_TTL_SECS";
pub const ENV_SEED: &str = "KITCHEN_SEED";

/// Everything a session may be reset into, loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Catalog {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_config_id")]
    pub default_config: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tally: TallyConfig,
    #[serde(default)]
    pub models: BTreeMap<String, ModelSpec>,
    #[serde(default)]
    pub estimators: BTreeMap<String, EstimatorSpec>,
    pub configurations: BTreeMap<String, ConfigurationSpec>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Catalog {
    /// Load a catalog from a YAML file on disk. Relative artifact paths
    /// resolve against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| CatalogError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut catalog: Catalog =
            serde_yaml::from_reader(reader).map_err(|source| CatalogError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        catalog.base_dir = path.parent().map(Path::to_path_buf);
        catalog.validate().map_err(|source| CatalogError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(catalog)
    }

    /// Parse a catalog held in memory. `origin` only labels errors.
    pub fn from_yaml_str(yaml: &str, origin: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = origin.into();
        let mut catalog: Catalog =
            serde_yaml::from_str(yaml).map_err(|source| CatalogError::Parse {
                source,
                path: path.clone(),
            })?;
        catalog
            .validate()
            .map_err(|source| CatalogError::Invalid { path, source })?;
        Ok(catalog)
    }

    /// The compiled-in deployment catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG, BUILTIN_ORIGIN)
    }

    /// `path` if given, otherwise the built-in catalog, with environment
    /// overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let mut catalog = match path {
            Some(path) => Self::from_path(path)?,
            None => Self::builtin()?,
        };
        catalog.apply_env_overrides();
        Ok(catalog)
    }

    /// Validate the catalog without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        if self.max_steps == 0 {
            return Err(invalid("max_steps", "max_steps must be greater than zero"));
        }
        if self.session_ttl_secs == 0 {
            return Err(invalid(
                "session_ttl_secs",
                "session ttl must be greater than zero",
            ));
        }
        self.logging.normalize();

        for (key, model) in &self.models {
            model.validate(key)?;
        }
        for (key, estimator) in &self.estimators {
            estimator.validate(key)?;
        }

        if self.configurations.is_empty() {
            return Err(invalid(
                "configurations",
                "at least one configuration must be specified",
            ));
        }
        for (id, spec) in &self.configurations {
            spec.validate(id, &self.models, &self.estimators)?;
        }
        if !self.configurations.contains_key(&self.default_config) {
            return Err(invalid(
                "default_config",
                format!(
                    "default configuration '{}' is not defined",
                    self.default_config
                ),
            ));
        }
        Ok(())
    }

    pub fn configuration(&self, config_id: &str) -> Option<&ConfigurationSpec> {
        self.configurations.get(config_id)
    }

    pub fn model(&self, key: &str) -> Option<&ModelSpec> {
        self.models.get(key)
    }

    pub fn estimator(&self, key: &str) -> Option<&EstimatorSpec> {
        self.estimators.get(key)
    }

    pub fn config_ids(&self) -> impl Iterator<Item = &str> {
        self.configurations.keys().map(String::as_str)
    }

    /// Anchors a relative artifact path at the catalog's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Applies `KITCHEN_SESSION_TTL_SECS` and `KITCHEN_SEED` when set to
    /// valid non-zero integers.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ttl) = parse_override_u64(&lookup, ENV_SESSION_TTL).filter(|ttl| *ttl > 0) {
            self.session_ttl_secs = ttl;
        }
        if let Some(seed) = parse_override_u64(&lookup, ENV_SEED) {
            self.seed = seed;
        }
    }
}

fn parse_override_u64<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| value.trim().parse::<u64>().ok())
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

fn default_session_ttl_secs() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_config_id() -> String {
    DEFAULT_CONFIG_ID.to_string()
}

/// One selectable configuration: a layout, an optional trained partner and
/// an optional belief profile.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ConfigurationSpec {
    pub layout: String,
    #[serde(default = "default_n_agent")]
    pub n_agent: usize,
    /// `[width, height]`, checked against the layout when present.
    #[serde(default)]
    pub grid_dim: Option<[usize; 2]>,
    /// One schedule per agent; empty means the study defaults.
    #[serde(default)]
    pub rewards: Vec<RewardSchedule>,
    /// Model key. Without one the AI partner stays idle.
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub belief: Option<BeliefProfile>,
    #[serde(default = "default_reset_cadence")]
    pub reset_cadence: u64,
}

impl ConfigurationSpec {
    fn validate(
        &self,
        id: &str,
        models: &BTreeMap<String, ModelSpec>,
        estimators: &BTreeMap<String, EstimatorSpec>,
    ) -> Result<(), ValidationError> {
        let field = |name: &str| format!("configurations.{id}.{name}");

        let Some(layout) = Layout::builtin(&self.layout) else {
            let known: Vec<_> = Layout::builtin_names().collect();
            return Err(ValidationError::InvalidField {
                field: field("layout"),
                message: format!(
                    "unknown layout '{}' (known: {})",
                    self.layout,
                    known.join(", ")
                ),
            });
        };

        if self.n_agent < 2 {
            return Err(ValidationError::InvalidField {
                field: field("n_agent"),
                message: "a session needs the AI partner and the human (n_agent >= 2)"
                    .to_string(),
            });
        }
        if self.n_agent > layout.agent_starts().len() {
            return Err(ValidationError::InvalidField {
                field: field("n_agent"),
                message: format!(
                    "layout '{}' only has {} agent starts",
                    self.layout,
                    layout.agent_starts().len()
                ),
            });
        }

        if let Some([width, height]) = self.grid_dim {
            if width != layout.width() || height != layout.height() {
                return Err(ValidationError::InvalidField {
                    field: field("grid_dim"),
                    message: format!(
                        "layout '{}' is {}x{}, not {width}x{height}",
                        self.layout,
                        layout.width(),
                        layout.height()
                    ),
                });
            }
        }

        if !self.rewards.is_empty() && self.rewards.len() != self.n_agent {
            return Err(ValidationError::InvalidField {
                field: field("rewards"),
                message: format!(
                    "expected {} reward schedules, found {}",
                    self.n_agent,
                    self.rewards.len()
                ),
            });
        }

        if self.reset_cadence == 0 {
            return Err(ValidationError::InvalidField {
                field: field("reset_cadence"),
                message: "reset cadence must be greater than zero".to_string(),
            });
        }

        if let Some(policy) = &self.policy {
            match models.get(policy) {
                None => {
                    return Err(ValidationError::InvalidField {
                        field: field("policy"),
                        message: format!("model '{policy}' is not defined in models"),
                    });
                }
                Some(ModelSpec::Mlp {
                    abi_extractor: true,
                    ..
                }) if self.belief.is_none() => {
                    return Err(ValidationError::InvalidField {
                        field: field("belief"),
                        message: format!(
                            "model '{policy}' uses the belief-gated extractor and needs a belief profile"
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        if let Some(belief) = &self.belief {
            belief.validate(&field("belief"), estimators)?;
        }
        Ok(())
    }

    /// Environment configuration for a fresh kitchen.
    pub fn kitchen_config(&self) -> Result<KitchenConfig, KitchenError> {
        let config = KitchenConfig::builtin(&self.layout, self.n_agent)?;
        if self.rewards.is_empty() {
            Ok(config)
        } else {
            Ok(config.with_rewards(self.rewards.clone()))
        }
    }
}

fn default_n_agent() -> usize {
    2
}

fn default_reset_cadence() -> u64 {
    DEFAULT_RESET_CADENCE
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BeliefProfile {
    pub estimator: String,
    /// History length handed to the estimator.
    #[serde(default = "default_context")]
    pub context: usize,
    /// Ignore drops next to a chopping station.
    #[serde(default)]
    pub station_guard: bool,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl BeliefProfile {
    fn validate(
        &self,
        field: &str,
        estimators: &BTreeMap<String, EstimatorSpec>,
    ) -> Result<(), ValidationError> {
        if !estimators.contains_key(&self.estimator) {
            return Err(ValidationError::InvalidField {
                field: format!("{field}.estimator"),
                message: format!("estimator '{}' is not defined in estimators", self.estimator),
            });
        }
        if self.context == 0 {
            return Err(ValidationError::InvalidField {
                field: format!("{field}.context"),
                message: "context must hold at least one state".to_string(),
            });
        }
        let tracker = &self.tracker;
        if !(tracker.decay > 0.0 && tracker.decay <= 1.0) {
            return Err(ValidationError::InvalidField {
                field: format!("{field}.tracker.decay"),
                message: "decay must lie in (0, 1]".to_string(),
            });
        }
        if !(tracker.kappa_max > 0.0 && tracker.kappa_max.is_finite()) {
            return Err(ValidationError::InvalidField {
                field: format!("{field}.tracker.kappa_max"),
                message: "kappa_max must be a positive number".to_string(),
            });
        }
        if !(tracker.strength_max > 0.0 && tracker.strength_max.is_finite()) {
            return Err(ValidationError::InvalidField {
                field: format!("{field}.tracker.strength_max"),
                message: "strength_max must be a positive number".to_string(),
            });
        }
        Ok(())
    }
}

fn default_context() -> usize {
    DEFAULT_CONTEXT
}

/// Trained partner artifact.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// JSON MLP manifest. `abi_extractor` selects the belief-gated fallback
    /// architecture for manifests that do not declare one.
    Mlp {
        path: PathBuf,
        #[serde(default)]
        abi_extractor: bool,
    },
    /// Hand-written cook, no artifact.
    Scripted,
}

impl ModelSpec {
    fn validate(&self, key: &str) -> Result<(), ValidationError> {
        if let ModelSpec::Mlp { path, .. } = self {
            if path.as_os_str().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: format!("models.{key}.path"),
                    message: "path must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Frozen trait estimator.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSpec {
    Transformer { path: PathBuf },
    /// Returns the same parameters for every history.
    Constant { alpha: f64, beta: f64 },
}

impl EstimatorSpec {
    fn validate(&self, key: &str) -> Result<(), ValidationError> {
        match self {
            EstimatorSpec::Transformer { path } if path.as_os_str().is_empty() => {
                Err(ValidationError::InvalidField {
                    field: format!("estimators.{key}.path"),
                    message: "path must not be empty".to_string(),
                })
            }
            EstimatorSpec::Constant { alpha, beta }
                if !(alpha.is_finite() && beta.is_finite() && *alpha >= 0.0 && *beta >= 0.0) =>
            {
                Err(ValidationError::InvalidField {
                    field: format!("estimators.{key}"),
                    message: "alpha and beta must be finite and non-negative".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Logging configuration defaults to compact stderr output.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    /// JSON log file used when `enable_structured` is set.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            path: None,
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

/// Picks the configuration id for a request: an explicit id wins, otherwise
/// `{layout}_{model}`.
pub fn parse_config_id(
    layout_id: Option<&str>,
    model_id: Option<&str>,
    config_id: Option<&str>,
) -> Result<String, ValidationError> {
    if let Some(config_id) = config_id.filter(|id| !id.is_empty()) {
        return Ok(config_id.to_string());
    }
    match (layout_id, model_id) {
        (Some(layout), Some(model)) if !layout.is_empty() && !model.is_empty() => {
            Ok(format!("{layout}_{model}"))
        }
        _ => Err(invalid(
            "config_id",
            "either config_id or both layout_id and model_id must be provided",
        )),
    }
}

/// Splits `layout1_model2` into `("layout1", Some("model2"))`.
pub fn split_config_id(config_id: &str) -> (String, Option<String>) {
    match config_id.split_once('_') {
        Some((layout, model)) => (layout.to_string(), Some(model.to_string())),
        None => (config_id.to_string(), None),
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Errors that can occur while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse catalog {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid catalog in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl CatalogError {
    pub fn path(&self) -> &Path {
        match self {
            CatalogError::Read { path, .. }
            | CatalogError::Parse { path, .. }
            | CatalogError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BASIC_YAML: &str = r#"
seed: 7
default_config: cramped_scripted
estimators:
  steady:
    kind: constant
    alpha: 4.0
    beta: 2.0
models:
  cook:
    kind: scripted
  trained:
    kind: mlp
    path: models/trained.json
    abi_extractor: true
configurations:
  cramped_scripted:
    layout: cramped
    policy: cook
    belief:
      estimator: steady
      context: 10
      station_guard: true
  practice_idle:
    layout: practice
    grid_dim: [5, 5]
    reset_cadence: 70
logging:
  tracing_level: "debug"
"#;

    fn basic() -> Catalog {
        let mut catalog: Catalog = serde_yaml::from_str(BASIC_YAML).expect("parse yaml");
        catalog.validate().expect("validate");
        catalog
    }

    fn field_of(err: ValidationError) -> String {
        let ValidationError::InvalidField { field, .. } = err;
        field
    }

    #[test]
    fn loads_and_validates_basic_catalog() {
        let catalog = basic();
        assert_eq!(catalog.seed, 7);
        assert_eq!(catalog.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(catalog.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
        assert_eq!(catalog.logging.level(), Some(Level::DEBUG));

        let spec = catalog.configuration("cramped_scripted").expect("config");
        assert_eq!(spec.n_agent, 2);
        assert_eq!(spec.reset_cadence, DEFAULT_RESET_CADENCE);
        let belief = spec.belief.as_ref().expect("belief");
        assert_eq!(belief.context, 10);
        assert!(belief.station_guard);
        assert_eq!(belief.tracker, TrackerConfig::default());

        let idle = catalog.configuration("practice_idle").expect("config");
        assert_eq!(idle.reset_cadence, 70);
        assert!(idle.policy.is_none());
        assert_eq!(
            catalog.model("trained"),
            Some(&ModelSpec::Mlp {
                path: PathBuf::from("models/trained.json"),
                abi_extractor: true
            })
        );
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().expect("builtin");
        assert_eq!(catalog.seed, DEFAULT_SEED);
        assert_eq!(catalog.configurations.len(), 17);
        assert!(catalog.configuration("layout_practice").is_some());
        assert_eq!(
            catalog.configuration("layout4_model3").map(|c| c.reset_cadence),
            Some(70)
        );
        let ring = catalog.configuration("layout1_model1").expect("layout1");
        let belief = ring.belief.as_ref().expect("belief profile");
        assert_eq!(belief.context, 10);
        assert!(belief.station_guard);
        assert!(catalog.configuration("layout2_model2").and_then(|c| c.belief.as_ref()).is_none());

        let estimators: Vec<&str> = (1..=4)
            .filter_map(|n| catalog.configuration(&format!("layout{n}_model1")))
            .filter_map(|spec| spec.belief.as_ref())
            .map(|belief| belief.estimator.as_str())
            .collect();
        assert_eq!(
            estimators,
            ["layout1_trait", "layout2_trait", "layout3_trait", "layout4_trait"]
        );
        assert_eq!(catalog.estimators.len(), 4);
    }

    #[test]
    fn rejects_unknown_policy() {
        let yaml = BASIC_YAML.replace("policy: cook", "policy: missing");
        let mut catalog: Catalog = serde_yaml::from_str(&yaml).expect("parse");
        let err = catalog.validate().expect_err("should fail");
        assert_eq!(field_of(err), "configurations.cramped_scripted.policy");
    }

    #[test]
    fn gated_models_need_a_belief_profile() {
        let yaml = BASIC_YAML.replace("reset_cadence: 70", "reset_cadence: 70\n    policy: trained");
        let mut catalog: Catalog = serde_yaml::from_str(&yaml).expect("parse");
        let err = catalog.validate().expect_err("should fail");
        assert_eq!(field_of(err), "configurations.practice_idle.belief");

        let yaml = BASIC_YAML.replace("policy: cook", "policy: trained");
        let mut catalog: Catalog = serde_yaml::from_str(&yaml).expect("parse");
        catalog.validate().expect("gated model with belief is fine");
    }

    #[test]
    fn rejects_mismatched_grid_dim() {
        let yaml = BASIC_YAML.replace("grid_dim: [5, 5]", "grid_dim: [4, 5]");
        let mut catalog: Catalog = serde_yaml::from_str(&yaml).expect("parse");
        let err = catalog.validate().expect_err("should fail");
        assert_eq!(field_of(err), "configurations.practice_idle.grid_dim");
    }

    #[test]
    fn rejects_single_agent_and_missing_default() {
        let yaml = BASIC_YAML.replace("reset_cadence: 70", "reset_cadence: 70\n    n_agent: 1");
        let mut catalog: Catalog = serde_yaml::from_str(&yaml).expect("parse");
        let err = catalog.validate().expect_err("should fail");
        assert_eq!(field_of(err), "configurations.practice_idle.n_agent");

        let yaml = BASIC_YAML.replace("default_config: cramped_scripted", "default_config: nope");
        let mut catalog: Catalog = serde_yaml::from_str(&yaml).expect("parse");
        let err = catalog.validate().expect_err("should fail");
        assert_eq!(field_of(err), "default_config");
    }

    #[test]
    fn from_path_resolves_relative_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("catalog.yaml");
        let mut file = File::create(&path).expect("create");
        file.write_all(BASIC_YAML.as_bytes()).expect("write");

        let catalog = Catalog::from_path(&path).expect("load");
        assert_eq!(
            catalog.resolve_path(Path::new("models/trained.json")),
            dir.path().join("models/trained.json")
        );
        assert_eq!(
            catalog.resolve_path(Path::new("/abs/model.json")),
            PathBuf::from("/abs/model.json")
        );
    }

    #[test]
    fn reports_the_catalog_path_on_errors() {
        let err = Catalog::from_path("/definitely/not/here.yaml").expect_err("missing");
        assert!(matches!(err, CatalogError::Read { .. }));
        assert_eq!(err.path(), Path::new("/definitely/not/here.yaml"));

        let err = Catalog::from_yaml_str("configurations: {}", "inline").expect_err("empty");
        assert!(matches!(err, CatalogError::Invalid { .. }));
    }

    #[test]
    fn env_overrides_replace_seed_and_ttl() {
        let mut catalog = basic();
        catalog.apply_overrides_from(|key| match key {
            ENV_SEED => Some("99".to_string()),
            ENV_SESSION_TTL => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(catalog.seed, 99);
        assert_eq!(catalog.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);

        catalog.apply_overrides_from(|key| (key == ENV_SESSION_TTL).then(|| "15".to_string()));
        assert_eq!(catalog.session_ttl_secs, 15);
        assert_eq!(catalog.seed, 99);
    }

    #[test]
    fn config_id_selection() {
        assert_eq!(
            parse_config_id(Some("layout1"), Some("model2"), Some("layout3_model1")).unwrap(),
            "layout3_model1"
        );
        assert_eq!(
            parse_config_id(Some("layout1"), Some("model2"), None).unwrap(),
            "layout1_model2"
        );
        assert!(parse_config_id(Some("layout1"), None, None).is_err());
        assert!(parse_config_id(None, None, Some("")).is_err());

        assert_eq!(
            split_config_id("layout_practice"),
            ("layout".to_string(), Some("practice".to_string()))
        );
        assert_eq!(split_config_id("solo"), ("solo".to_string(), None));
    }
}
