//! TTL-keyed in-memory session store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::observability::metrics;

/// Opaque key → value mapping stored per session.
pub type SessionData = Map<String, Value>;

/// Random bytes per session id (256 bits).
const SESSION_ID_BYTES: usize = 32;

#[derive(Debug)]
struct Session {
    data: SessionData,
    created_at: SystemTime,
    last_accessed: Instant,
}

/// Thread-safe session store with idle expiry.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store expiring sessions idle for longer than `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `data` under a fresh id and return the id.
    pub fn create(&self, data: SessionData) -> String {
        let id = generate_session_id();
        let now = Instant::now();
        let count = {
            let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
            sessions.insert(
                id.clone(),
                Session {
                    data,
                    created_at: SystemTime::now(),
                    last_accessed: now,
                },
            );
            sessions.len()
        };
        metrics::record_sessions(count);
        id
    }

    /// Fetch a copy of the session data, refreshing its idle clock.
    ///
    /// An expired entry is removed on discovery and reported as absent.
    pub fn get(&self, id: &str) -> Option<SessionData> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
        let expired = match sessions.get_mut(id) {
            None => return None,
            Some(session) if now.duration_since(session.last_accessed) > self.ttl => true,
            Some(session) => {
                session.last_accessed = now;
                return Some(session.data.clone());
            }
        };

        if expired {
            sessions.remove(id);
            tracing::debug!("Session expired on access");
        }
        None
    }

    /// Replace the data of an existing session.
    ///
    /// Returns false if the id is unknown.
    pub fn set(&self, id: &str, data: SessionData) -> bool {
        let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
        match sessions.get_mut(id) {
            Some(session) => {
                session.data = data;
                session.last_accessed = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Remove a session. Returns true iff it existed.
    pub fn destroy(&self, id: &str) -> bool {
        let (removed, count) = {
            let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
            let removed = sessions.remove(id).is_some();
            (removed, sessions.len())
        };
        metrics::record_sessions(count);
        removed
    }

    /// When the session was created, if it is still stored.
    pub fn created_at(&self, id: &str) -> Option<SystemTime> {
        self.sessions
            .lock()
            .expect("session store mutex poisoned")
            .get(id)
            .map(|s| s.created_at)
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let (removed, count) = {
            let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
            let before = sessions.len();
            sessions.retain(|_, s| now.duration_since(s.last_accessed) <= self.ttl);
            (before - sessions.len(), sessions.len())
        };
        metrics::record_sessions(count);
        removed
    }

    /// Number of stored sessions, expired ones included until discovered.
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
