//! The control-plane session service boundary.

use std::future::Future;
use std::time::Duration;

use tg_protocol::{
    ActivateSessionRequest, ActivateSessionResponse, AuthorizeConnectionRequest,
    AuthorizeConnectionResponse, LookupSessionRequest, LookupSessionResponse,
};
use tokio_util::sync::CancellationToken;

use crate::types::RpcError;

/// Implement this trait to carry session RPCs to the controller.
///
/// The worker only ever holds an `Arc<dyn SessionService>` obtained from the
/// [`ControllerHandle`](crate::handle::ControllerHandle); implementations
/// must be safe to call from many handshakes at once.
///
/// # Example
///
/// ```rust,no_run
/// use tg_controller::{RpcError, SessionService};
/// use tg_protocol::*;
///
/// struct Offline;
///
/// #[async_trait::async_trait]
/// impl SessionService for Offline {
///     async fn lookup_session(&self, _req: LookupSessionRequest) -> Result<LookupSessionResponse, RpcError> {
///         Err(RpcError::Transport("offline".into()))
///     }
///     async fn activate_session(&self, _req: ActivateSessionRequest) -> Result<ActivateSessionResponse, RpcError> {
///         Err(RpcError::Transport("offline".into()))
///     }
///     async fn authorize_connection(&self, _req: AuthorizeConnectionRequest) -> Result<AuthorizeConnectionResponse, RpcError> {
///         Err(RpcError::Transport("offline".into()))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait SessionService: Send + Sync + 'static {
    /// Fetch the authoritative descriptor and credentials for a session.
    async fn lookup_session(
        &self,
        req: LookupSessionRequest,
    ) -> Result<LookupSessionResponse, RpcError>;

    /// Bind a session to this worker.
    async fn activate_session(
        &self,
        req: ActivateSessionRequest,
    ) -> Result<ActivateSessionResponse, RpcError>;

    /// Consume one connection slot of a session.
    async fn authorize_connection(
        &self,
        req: AuthorizeConnectionRequest,
    ) -> Result<AuthorizeConnectionResponse, RpcError>;

    /// Resolves once the underlying connection to the controller is gone.
    ///
    /// The default never resolves, for clients without a persistent link.
    async fn closed(&self) {
        std::future::pending::<()>().await
    }
}

/// Run a control-plane call bounded by both `timeout` and `cancel`.
///
/// Whichever fires first wins; the call future is dropped on either.  An
/// already-cancelled token wins even over a call that is ready.
pub async fn call_bounded<T, F>(
    cancel: &CancellationToken,
    timeout: Duration,
    call: F,
) -> Result<T, RpcError>
where
    F: Future<Output = Result<T, RpcError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RpcError::Cancelled),
        res = tokio::time::timeout(timeout, call) => match res {
            Ok(inner) => inner,
            Err(_) => Err(RpcError::Timeout(timeout)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completed_call_passes_through() {
        let cancel = CancellationToken::new();
        let res = call_bounded(&cancel, Duration::from_secs(1), async { Ok::<_, RpcError>(7) }).await;
        assert_eq!(res, Ok(7));
    }

    #[tokio::test]
    async fn inner_error_is_preserved() {
        let cancel = CancellationToken::new();
        let res: Result<(), _> = call_bounded(&cancel, Duration::from_secs(1), async {
            Err(RpcError::Rejected("version conflict".into()))
        })
        .await;
        assert_eq!(res, Err(RpcError::Rejected("version conflict".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let cancel = CancellationToken::new();
        let res: Result<(), _> = call_bounded(
            &cancel,
            Duration::from_secs(90),
            std::future::pending::<Result<(), RpcError>>(),
        )
        .await;
        assert_eq!(res, Err(RpcError::Timeout(Duration::from_secs(90))));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_call() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res: Result<(), _> = call_bounded(
            &cancel,
            Duration::from_secs(90),
            std::future::pending::<Result<(), RpcError>>(),
        )
        .await;
        assert_eq!(res, Err(RpcError::Cancelled));
    }
}
