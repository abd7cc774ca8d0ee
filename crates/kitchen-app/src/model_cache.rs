//! Process-wide, load-once store of frozen artifacts.
//!
//! Each key owns a once-cell, so concurrent first requests for the same key
//! run exactly one load and every caller receives the same `Arc`. The table
//! lock is only held to find or insert the cell, never while loading.

use crate::config::{Catalog, EstimatorSpec};
use kitchen_bot::{Architecture, MlpPolicy, Policy};
use kitchen_core::belief::{ConstantEstimator, TraitEstimator, TransformerEstimator};
use kitchen_core::nn::LoadError;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

type Slot<T> = Arc<OnceCell<Arc<T>>>;

static GLOBAL: Lazy<Arc<ModelCache>> = Lazy::new(|| Arc::new(ModelCache::default()));

pub struct ArtifactCache<T: ?Sized> {
    slots: Mutex<HashMap<String, Slot<T>>>,
    loads: AtomicUsize,
}

impl<T: ?Sized> Default for ArtifactCache<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        }
    }
}

impl<T: ?Sized + Send + Sync> ArtifactCache<T> {
    /// Returns the cached value for `key`, running `load` if this is the
    /// first successful request. A failed load leaves the key empty.
    pub fn load_or_get<F>(&self, key: &str, load: F) -> Result<Arc<T>, LoadError>
    where
        F: FnOnce() -> Result<Arc<T>, LoadError>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        slot.get_or_try_init(|| {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let started = Instant::now();
            let loaded = load();
            match &loaded {
                Ok(_) => tracing::info!(
                    key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "artifact loaded"
                ),
                Err(err) => tracing::warn!(key, error = %err, "artifact load failed"),
            }
            loaded
        })
        .map(Arc::clone)
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        let slot = self.slots.lock().get(key).cloned()?;
        slot.get().cloned()
    }

    /// Number of load attempts so far, successful or not.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn loaded(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }
}

/// Policies and trait estimators shared by every session.
#[derive(Default)]
pub struct ModelCache {
    policies: ArtifactCache<dyn Policy>,
    estimators: ArtifactCache<dyn TraitEstimator>,
}

impl ModelCache {
    pub fn global() -> Arc<ModelCache> {
        Arc::clone(&GLOBAL)
    }

    pub fn policies(&self) -> &ArtifactCache<dyn Policy> {
        &self.policies
    }

    pub fn estimators(&self) -> &ArtifactCache<dyn TraitEstimator> {
        &self.estimators
    }

    /// Slot a policy is cached under. The resolved path and fallback choice
    /// are part of it, so catalogs reusing a model key for different files
    /// never receive each other's weights.
    pub fn policy_slot(key: &str, path: &Path, abi_extractor: bool) -> String {
        let fallback = if abi_extractor { "abi" } else { "flatten" };
        format!("{key}@{}#{fallback}", path.display())
    }

    pub fn estimator_slot(key: &str, spec: &EstimatorSpec, catalog: &Catalog) -> String {
        match spec {
            EstimatorSpec::Transformer { path } => {
                format!("{key}@{}", catalog.resolve_path(path).display())
            }
            EstimatorSpec::Constant { alpha, beta } => format!("{key}#constant({alpha},{beta})"),
        }
    }

    /// Loads an MLP manifest once per slot. Manifests without a declared
    /// architecture get the belief-gated construction when `abi_extractor`
    /// is set and the plain flatten construction otherwise.
    pub fn mlp_policy(
        &self,
        key: &str,
        path: &Path,
        abi_extractor: bool,
    ) -> Result<Arc<dyn Policy>, LoadError> {
        let slot = Self::policy_slot(key, path, abi_extractor);
        self.policies.load_or_get(&slot, || {
            let fallback = if abi_extractor {
                Architecture::abi_gated_default()
            } else {
                Architecture::flatten_default()
            };
            let policy = MlpPolicy::load(path, &fallback)?;
            Ok(Arc::new(policy) as Arc<dyn Policy>)
        })
    }

    pub fn estimator(
        &self,
        key: &str,
        spec: &EstimatorSpec,
        catalog: &Catalog,
    ) -> Result<Arc<dyn TraitEstimator>, LoadError> {
        let slot = Self::estimator_slot(key, spec, catalog);
        self.estimators.load_or_get(&slot, || match spec {
            EstimatorSpec::Transformer { path } => {
                let estimator = TransformerEstimator::load(catalog.resolve_path(path))?;
                Ok(Arc::new(estimator) as Arc<dyn TraitEstimator>)
            }
            EstimatorSpec::Constant { alpha, beta } => {
                Ok(Arc::new(ConstantEstimator::uniform(*alpha, *beta)) as Arc<dyn TraitEstimator>)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitchen_bot::MlpManifest;
    use std::fs;

    #[test]
    fn second_request_reuses_the_first_load() {
        let cache: ArtifactCache<str> = ArtifactCache::default();
        let first = cache
            .load_or_get("k", || Ok(Arc::from("value")))
            .expect("load");
        let second = cache
            .load_or_get("k", || panic!("must not reload"))
            .expect("cached");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.load_count(), 1);
        assert_eq!(cache.loaded(), 1);
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn failed_load_is_reported_and_not_cached() {
        let cache: ArtifactCache<str> = ArtifactCache::default();
        let err = cache
            .load_or_get("bad", || Err(LoadError::Incompatible("nope".into())))
            .expect_err("load fails");
        assert!(matches!(err, LoadError::Incompatible(_)));
        assert!(cache.get("bad").is_none());
        assert_eq!(cache.loaded(), 0);

        cache
            .load_or_get("bad", || Ok(Arc::from("fixed")))
            .expect("second attempt loads");
        assert_eq!(cache.load_count(), 2);
    }

    #[test]
    fn mlp_policy_without_architecture_uses_the_gated_fallback() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy.json");
        let mut manifest = MlpManifest::random(Architecture::abi_gated_default(), 40, 10, 3);
        manifest.architecture = None;
        fs::write(&path, serde_json::to_string(&manifest).expect("json")).expect("write");

        let cache = ModelCache::default();
        let gated = cache.mlp_policy("gated", &path, true).expect("fallback fits");
        assert_eq!(gated.observation_dim(), 40);
        assert_eq!(gated.action_count(), 10);

        let err = match cache.mlp_policy("plain", &path, false) {
            Ok(_) => panic!("flatten fallback must not fit gated weights"),
            Err(err) => err,
        };
        assert!(matches!(err, LoadError::Incompatible(_)));
    }

    #[test]
    fn same_key_from_different_files_loads_separately() {
        let dir = tempfile::tempdir().expect("tempdir");
        let narrow = dir.path().join("narrow.json");
        let wide = dir.path().join("wide.json");
        for (path, dim) in [(&narrow, 20), (&wide, 30)] {
            let manifest = MlpManifest::random(Architecture::flatten_default(), dim, 10, 9);
            fs::write(path, serde_json::to_string(&manifest).expect("json")).expect("write");
        }

        let cache = ModelCache::default();
        let first = cache.mlp_policy("shared", &narrow, false).expect("narrow");
        let second = cache.mlp_policy("shared", &wide, false).expect("wide");
        assert_eq!(first.observation_dim(), 20);
        assert_eq!(second.observation_dim(), 30);
        assert_eq!(cache.policies().load_count(), 2);

        let again = cache.mlp_policy("shared", &narrow, false).expect("cached");
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.policies().load_count(), 2);
    }
}
