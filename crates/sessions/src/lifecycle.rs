//! Session lifecycle — activation and connection authorization.
//!
//! Both operations are thin, non-retrying calls to the controller.  The
//! controller owns the decision; the worker only records the outcome on the
//! registered session, if there is one.

use std::sync::Arc;
use std::time::Duration;

use tg_controller::{call_bounded, ControllerHandle, RpcError};
use tg_domain::trace::TraceEvent;
use tg_protocol::{ActivateSessionRequest, AuthorizeConnectionRequest, SessionStatus};
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::session::Connection;
use crate::store::SessionRegistry;

/// Drives session activation and per-connection authorization.
pub struct LifecycleManager {
    controller: Arc<ControllerHandle>,
    registry: Arc<SessionRegistry>,
    worker_id: String,
    rpc_timeout: Duration,
}

impl LifecycleManager {
    pub fn new(
        controller: Arc<ControllerHandle>,
        registry: Arc<SessionRegistry>,
        worker_id: impl Into<String>,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            controller,
            registry,
            worker_id: worker_id.into(),
            rpc_timeout,
        }
    }

    /// The id sent as `worker_id` on activation.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Bind `session_id` to this worker.  `tofu_token` and `version` are
    /// passed through untouched.
    ///
    /// Returns the status the controller reports.  A registered session adopts
    /// that status; an unregistered one is left alone.
    pub async fn activate_session(
        &self,
        ctx: &CancellationToken,
        session_id: &str,
        tofu_token: &str,
        version: u32,
    ) -> Result<SessionStatus, SessionError> {
        let client = self.controller.load()?;

        let response = call_bounded(
            ctx,
            self.rpc_timeout,
            client.activate_session(ActivateSessionRequest {
                session_id: session_id.to_owned(),
                tofu_token: tofu_token.to_owned(),
                version,
                worker_id: self.worker_id.clone(),
            }),
        )
        .await
        .map_err(|e| {
            tracing::warn!(session_id, error = %e, "session activation failed");
            SessionError::ActivationFailed(e)
        })?;

        if let Some(session) = self.registry.get(session_id) {
            session.set_status(response.status);
            tracing::debug!(session_id, status = %response.status, "registered session status updated");
        }

        TraceEvent::SessionActivated {
            session_id: session_id.to_owned(),
            status: response.status.to_string(),
        }
        .emit();

        Ok(response.status)
    }

    /// Consume one connection slot of `session_id`.
    ///
    /// Returns the new connection (status `Authorized`, no scope yet) and the
    /// number of connections the controller says are left.  When the session
    /// is registered the connection is recorded under it; an id the session
    /// already holds is rejected.
    pub async fn authorize_connection(
        &self,
        ctx: &CancellationToken,
        session_id: &str,
    ) -> Result<(Arc<Connection>, i32), SessionError> {
        let client = self.controller.load()?;

        let response = call_bounded(
            ctx,
            self.rpc_timeout,
            client.authorize_connection(AuthorizeConnectionRequest {
                session_id: session_id.to_owned(),
            }),
        )
        .await
        .map_err(|e| {
            tracing::warn!(session_id, error = %e, "connection authorization failed");
            SessionError::AuthorizationFailed(e)
        })?;

        let conn = Arc::new(Connection::authorized(response.connection_id.clone(), session_id));

        if let Some(session) = self.registry.get(session_id) {
            if !session.insert_connection(conn.clone()) {
                tracing::warn!(
                    session_id,
                    connection_id = %response.connection_id,
                    "controller returned a connection id already in use"
                );
                return Err(SessionError::AuthorizationFailed(RpcError::Rejected(format!(
                    "duplicate connection id {}",
                    response.connection_id
                ))));
            }
        }

        TraceEvent::ConnectionAuthorized {
            session_id: session_id.to_owned(),
            connection_id: response.connection_id,
            connections_left: response.connections_left,
        }
        .emit();

        Ok((conn, response.connections_left))
    }
}
