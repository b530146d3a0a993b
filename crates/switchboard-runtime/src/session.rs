//! Session resolution and expiry.
//!
//! Events that carry a string [`Event::SESSION_KEY`] share one [`Session`]
//! per `"{platform}:{session_id}"`. Every other event gets an anonymous
//! session drawn from a pool and recycled once the event is done with it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use switchboard_core::{Event, Pool, Session};
use tracing::{debug, trace};

/// Keyed sessions plus a pool of anonymous ones.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    pool: Pool<Session>,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a store whose keyed sessions expire after `ttl` of inactivity.
    pub fn new(ttl: Duration, pool_capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pool: Pool::new(pool_capacity),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The key `event` would be stored under, if it names a session.
    pub fn key_for(event: &Event) -> Option<String> {
        event
            .session_id()
            .filter(|id| !id.is_empty())
            .map(|id| format!("{}:{}", event.platform, id))
    }

    /// Returns the session for `event`, creating it if needed.
    ///
    /// Keyed sessions have their expiry pushed forward on every call.
    pub fn resolve(&self, event: &Event) -> Arc<Session> {
        let Some(key) = Self::key_for(event) else {
            return Arc::new(self.pool.acquire());
        };

        if let Some(session) = self.sessions.read().get(&key) {
            session.touch(self.ttl);
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write();
        let session = sessions.entry(key).or_insert_with_key(|key| {
            debug!(session = %key, "Created session");
            let mut session = self.pool.acquire();
            session.id = key.clone();
            Arc::new(session)
        });
        session.touch(self.ttl);
        Arc::clone(session)
    }

    /// Attaches a session to `event` unless the adapter already did.
    pub fn attach(&self, event: &mut Event) {
        if event.session.is_none() {
            event.session = Some(self.resolve(event));
        }
    }

    /// Hands an anonymous session back to the pool once nobody else holds it.
    ///
    /// Keyed sessions stay in the store until they expire.
    pub fn recycle(&self, session: Arc<Session>) {
        if !session.is_anonymous() {
            return;
        }
        if let Ok(session) = Arc::try_unwrap(session) {
            self.pool.release(session);
        }
    }

    /// Removes every keyed session expired at `now` and returns how many.
    ///
    /// Removed sessions still referenced by an in-flight event live on until
    /// that event is dropped; the rest go back to the pool.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let expired: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write();
            let keys: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.is_expired_at(now))
                .map(|(key, _)| key.clone())
                .collect();
            keys.iter().filter_map(|key| sessions.remove(key)).collect()
        };

        let count = expired.len();
        for session in expired {
            if let Ok(session) = Arc::try_unwrap(session) {
                self.pool.release(session);
            }
        }
        if count > 0 {
            trace!(count, "Purged expired sessions");
        }
        count
    }

    pub fn get(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(key).cloned()
    }

    /// Number of keyed sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Idle sessions waiting in the pool.
    pub fn pooled(&self) -> usize {
        self.pool.idle()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("pooled", &self.pooled())
            .field("ttl", &self.ttl)
            .finish()
    }
}
