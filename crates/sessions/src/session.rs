//! Session and connection records held by the registry.
//!
//! A [`Session`] owns its connections and a root cancellation token.  Each
//! connection's scope is a child of that token, so tearing down the session
//! stops every stream under it while closing one connection leaves its
//! siblings alone.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tg_protocol::{ConnectionStatus, LookupSessionResponse, SessionStatus};
use tokio_util::sync::CancellationToken;

use crate::tls::SessionTls;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One transport stream multiplexed under a session.
#[derive(Debug)]
pub struct Connection {
    id: String,
    /// Back-reference for bookkeeping only; the session owns the connection.
    session_id: String,
    inner: Mutex<ConnectionInner>,
}

#[derive(Debug)]
struct ConnectionInner {
    status: ConnectionStatus,
    scope: Option<CancellationToken>,
}

impl Connection {
    /// A freshly authorized connection with no scope attached yet.
    pub fn authorized(id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            inner: Mutex::new(ConnectionInner {
                status: ConnectionStatus::Authorized,
                scope: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().status
    }

    /// Record a status reported by the controller.
    pub fn set_status(&self, status: ConnectionStatus) {
        self.inner.lock().status = status;
    }

    /// Bind the cancellation scope of the established stream.  Replaces any
    /// previous scope without cancelling it.
    pub fn attach_scope(&self, scope: CancellationToken) {
        self.inner.lock().scope = Some(scope);
    }

    pub fn scope(&self) -> Option<CancellationToken> {
        self.inner.lock().scope.clone()
    }

    /// Cancel the attached scope.  Returns `false` if none was attached.
    pub fn cancel(&self) -> bool {
        match &self.inner.lock().scope {
            Some(scope) => {
                scope.cancel();
                true
            }
            None => false,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One controller-authorized access grant terminated at this worker.
///
/// All mutable state sits behind the session's own lock; the registry's lock
/// is never needed to change it.
pub struct Session {
    id: String,
    state: RwLock<SessionState>,
    cancel: CancellationToken,
}

struct SessionState {
    status: SessionStatus,
    expiration: DateTime<Utc>,
    tls: SessionTls,
    last_response: LookupSessionResponse,
    connections: HashMap<String, Arc<Connection>>,
}

impl Session {
    /// Build a session from a lookup response and the TLS material derived
    /// from it.  Starts with no connections.
    pub fn new(id: impl Into<String>, response: LookupSessionResponse, tls: SessionTls) -> Self {
        Self {
            id: id.into(),
            state: RwLock::new(SessionState {
                status: response.status,
                expiration: response.expiration,
                tls,
                last_response: response,
                connections: HashMap::new(),
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.state.read().status
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.state.read().expiration
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.state.read().expiration <= now
    }

    /// TLS material from the lookup that created this record.
    ///
    /// Later lookups refresh status, expiration and the stored response but
    /// not this material, so after a reissue it can differ from
    /// `last_response().authorization`.  Each handshake uses the config its
    /// own lookup produced.
    pub fn tls(&self) -> SessionTls {
        self.state.read().tls.clone()
    }

    /// The freshest lookup response seen for this session.
    pub fn last_response(&self) -> LookupSessionResponse {
        self.state.read().last_response.clone()
    }

    /// Adopt a newer lookup response: status, expiration and the stored
    /// response change together under the session lock.
    pub fn apply_lookup(&self, response: LookupSessionResponse) {
        let mut state = self.state.write();
        state.status = response.status;
        state.expiration = response.expiration;
        state.last_response = response;
    }

    /// Record a status reported by the controller outside a lookup.  The
    /// stored lookup response is left as the controller returned it.
    pub fn set_status(&self, status: SessionStatus) {
        self.state.write().status = status;
    }

    // ── Connections ─────────────────────────────────────────────────

    /// Add a connection.  Returns `false` (and keeps the existing one) if the
    /// id is already present.
    pub fn insert_connection(&self, conn: Arc<Connection>) -> bool {
        let mut state = self.state.write();
        if state.connections.contains_key(conn.id()) {
            return false;
        }
        state.connections.insert(conn.id().to_owned(), conn);
        true
    }

    pub fn connection(&self, connection_id: &str) -> Option<Arc<Connection>> {
        self.state.read().connections.get(connection_id).cloned()
    }

    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.state.read().connections.values().cloned().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.state.read().connections.len()
    }

    /// Whether any connection is authorized but not yet established.
    pub fn has_pending_connections(&self) -> bool {
        self.state
            .read()
            .connections
            .values()
            .any(|c| c.status() == ConnectionStatus::Authorized)
    }

    /// A fresh scope for a stream under this session.  Cancelled by
    /// [`teardown`](Self::teardown).
    pub fn connection_scope(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Attach a new child scope to a known connection and return it.
    pub fn bind_connection(&self, connection_id: &str) -> Option<CancellationToken> {
        let conn = self.connection(connection_id)?;
        let scope = self.connection_scope();
        conn.attach_scope(scope.clone());
        Some(scope)
    }

    /// Remove a connection, cancel its scope and mark it closed.
    pub fn close_connection(&self, connection_id: &str) -> Option<Arc<Connection>> {
        let conn = self.state.write().connections.remove(connection_id)?;
        conn.cancel();
        conn.set_status(ConnectionStatus::Closed);
        tracing::debug!(
            session_id = %self.id,
            connection_id,
            "connection closed"
        );
        Some(conn)
    }

    /// Cancel the session scope and every connection under it, and drop the
    /// connections.  Returns how many connections were torn down.
    pub fn teardown(&self) -> usize {
        self.cancel.cancel();
        let drained: Vec<Arc<Connection>> = {
            let mut state = self.state.write();
            state.connections.drain().map(|(_, c)| c).collect()
        };
        for conn in &drained {
            // Scopes not derived from the session token need an explicit cancel.
            conn.cancel();
            conn.set_status(ConnectionStatus::Closed);
        }
        drained.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("status", &state.status)
            .field("expiration", &state.expiration)
            .field("connections", &state.connections.len())
            .finish()
    }
}
