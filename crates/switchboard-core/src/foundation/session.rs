//! Cross-event conversation state.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::foundation::pool::Reusable;

type SessionValue = Arc<dyn Any + Send + Sync>;

/// State shared by every event of one conversational context.
///
/// A session is not owned by any single [`Event`](crate::Event): several
/// in-flight events may hold the same `Arc<Session>` at once, so the value
/// store is internally synchronized and every accessor takes `&self`.
///
/// # Example
///
/// ```rust
/// use switchboard_core::Session;
///
/// let session = Session::new("console:alice");
/// session.insert("greeted", true);
/// assert_eq!(session.get::<bool>("greeted").as_deref(), Some(&true));
/// ```
#[derive(Default)]
pub struct Session {
    /// Identifier shared by all events of the conversation. Empty for
    /// anonymous per-event sessions.
    pub id: String,
    values: RwLock<HashMap<String, SessionValue>>,
    expires: Mutex<Option<Instant>>,
}

impl Session {
    /// Creates an empty session with the given identifier and no expiry.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Returns `true` for sessions that belong to a single event.
    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.values.write().insert(key.into(), Arc::new(value));
    }

    /// Returns the value under `key` if it exists and has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.values.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Returns `true` if any value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Removes the value under `key`, returning whether one existed.
    pub fn remove(&self, key: &str) -> bool {
        self.values.write().remove(key).is_some()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Returns the expiry instant, if one is set.
    pub fn expires(&self) -> Option<Instant> {
        *self.expires.lock()
    }

    /// Sets the expiry instant.
    pub fn set_expires(&self, at: Option<Instant>) {
        *self.expires.lock() = at;
    }

    /// Pushes the expiry `ttl` into the future from now.
    pub fn touch(&self, ttl: Duration) {
        self.set_expires(Some(Instant::now() + ttl));
    }

    /// Returns `true` if an expiry is set and has passed at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires().is_some_and(|at| at <= now)
    }
}

impl Reusable for Session {
    fn reset(&mut self) {
        self.id.clear();
        self.values.get_mut().clear();
        *self.expires.get_mut() = None;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("values", &self.len())
            .field("expires", &self.expires())
            .finish()
    }
}
