//! Worker-side session registry.
//!
//! Maps session id to the canonical [`Session`] record.  The registry lock
//! only guards which entries exist; a session's contents are guarded by the
//! session's own lock, so work on one session never waits on another.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tg_protocol::LookupSessionResponse;

use crate::session::Session;

/// Concurrent map of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session by id.
    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Return the canonical record for `session_id`, creating it with
    /// `factory` if absent.  Returns `(session, was_existing)`.
    ///
    /// `factory` runs at most once and only when this call wins the insert.
    pub fn load_or_create(
        &self,
        session_id: &str,
        factory: impl FnOnce() -> Session,
    ) -> (Arc<Session>, bool) {
        // Fast path: session already exists.
        if let Some(existing) = self.get(session_id) {
            return (existing, true);
        }

        // Slow path: re-check under the write lock, another creator may have
        // inserted in between.
        let mut sessions = self.sessions.write();
        match sessions.entry(session_id.to_owned()) {
            Entry::Occupied(e) => (e.get().clone(), true),
            Entry::Vacant(e) => {
                let session = Arc::new(factory());
                e.insert(session.clone());
                tracing::debug!(session_id, "session registered");
                (session, false)
            }
        }
    }

    /// Adopt a newer lookup response for a registered session.  Returns
    /// `false` if the session is not registered.
    pub fn update_authoritative(&self, session_id: &str, response: LookupSessionResponse) -> bool {
        // Registry lock is released before the session lock is taken.
        match self.get(session_id) {
            Some(session) => {
                session.apply_lookup(response);
                true
            }
            None => false,
        }
    }

    /// Unregister a session and tear it down.
    pub fn remove(&self, session_id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.write().remove(session_id)?;
        let torn = removed.teardown();
        tracing::debug!(session_id, connections = torn, "session removed");
        Some(removed)
    }

    /// Unregister `session` only if it is still the canonical record for its
    /// id.  Tears it down on success.
    pub fn remove_if_current(&self, session: &Arc<Session>) -> bool {
        let removed = {
            let mut sessions = self.sessions.write();
            match sessions.get(session.id()) {
                Some(current) if Arc::ptr_eq(current, session) => {
                    sessions.remove(session.id());
                    true
                }
                _ => false,
            }
        };
        if removed {
            session.teardown();
        }
        removed
    }

    /// Unregister and tear down every session.  Returns how many there were.
    pub fn clear(&self) -> usize {
        let drained: Vec<Arc<Session>> = self.sessions.write().drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.teardown();
        }
        drained.len()
    }

    /// All registered sessions.
    pub fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
