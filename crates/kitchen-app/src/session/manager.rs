use super::{Session, SessionError};
use crate::config::Catalog;
use crate::model_cache::ModelCache;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Table of live sessions keyed by id.
///
/// The table lock only guards lookup, insert and delete. Work on a session
/// happens under that session's own lock, so sessions never block each other.
pub struct SessionManager {
    catalog: Arc<Catalog>,
    cache: Arc<ModelCache>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    /// Uses the process-wide model cache.
    pub fn new(catalog: Catalog) -> Self {
        Self::with_cache(catalog, ModelCache::global())
    }

    pub fn with_cache(catalog: Catalog, cache: Arc<ModelCache>) -> Self {
        let ttl = Duration::from_secs(catalog.session_ttl_secs);
        Self {
            catalog: Arc::new(catalog),
            cache,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Registers a session under a fresh random id. It has no configuration
    /// until its first reset.
    pub fn new_session(&self) -> Arc<Session> {
        let id = Uuid::new_v4().simple().to_string();
        self.insert(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        let session = self
            .sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.touch();
        Ok(session)
    }

    /// Returns the session for `id`, creating it under that id if missing.
    /// Without an id a new session is created.
    pub fn ensure(&self, id: Option<&str>) -> Arc<Session> {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return self.new_session();
        };
        if let Ok(session) = self.get(id) {
            return session;
        }
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::info!(session = id, "session created");
                Arc::new(self.session(id.to_string()))
            })
            .clone();
        session.touch();
        session
    }

    /// Drops the session and releases its env. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(session) => {
                session.close();
                tracing::info!(session = id, "session removed");
                true
            }
            None => false,
        }
    }

    /// Evicts sessions idle for longer than the TTL.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub fn cleanup_at(&self, now: Instant) -> usize {
        let expired: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write();
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.is_expired(now, self.ttl))
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &expired {
            session.close();
            tracing::info!(session = session.id(), "session evicted after idle timeout");
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    fn insert(&self, id: String) -> Arc<Session> {
        let session = Arc::new(self.session(id.clone()));
        self.sessions.write().insert(id.clone(), Arc::clone(&session));
        tracing::info!(session = %id, "session created");
        session
    }

    fn session(&self, id: String) -> Session {
        Session::new(id, Arc::clone(&self.catalog), Arc::clone(&self.cache))
    }
}
