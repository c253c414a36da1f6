use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};

/// Proof of a successful root-password check, valid until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Where the editor keeps its session(s).
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self) -> Option<Session>;
    async fn set(&self, session: Session);
    async fn clear(&self);
}

/// Holds a single administrator session. `set` replaces whatever was there,
/// so a new login immediately invalidates the previous token. Concurrent
/// logins race and the last writer wins.
#[derive(Default)]
pub struct InMemorySessionStore {
    current: RwLock<Option<Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self) -> Option<Session> {
        self.current.read().clone()
    }

    async fn set(&self, session: Session) {
        *self.current.write() = Some(session);
    }

    async fn clear(&self) {
        *self.current.write() = None;
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
