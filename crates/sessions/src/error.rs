use tg_controller::{RpcError, Unavailable};

/// Failures of the session broker operations.  Every variant is terminal to
/// the operation that raised it; nothing in this crate retries.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("could not find session ID in SNI {0:?}")]
    InvalidServerName(String),

    #[error("controller unavailable: {0}")]
    ControllerUnavailable(#[from] Unavailable),

    #[error("error validating session: {0}")]
    LookupFailed(#[source] RpcError),

    #[error("session {0} is expired")]
    SessionExpired(String),

    #[error("invalid session certificate: {0}")]
    CertificateInvalid(String),

    #[error("error activating session: {0}")]
    ActivationFailed(#[source] RpcError),

    #[error("error authorizing connection: {0}")]
    AuthorizationFailed(#[source] RpcError),
}

impl SessionError {
    /// Whether the same call can succeed later without new inputs.
    ///
    /// Only a missing controller or a failed lookup qualify.  An expired
    /// session or a bad certificate needs a fresh lookup, and activation and
    /// authorization are not idempotent.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ControllerUnavailable(_) | Self::LookupFailed(_))
    }
}

/// Failure of an inbound handshake through
/// [`SessionAcceptor`](crate::handshake::SessionAcceptor).
#[derive(thiserror::Error, Debug)]
pub enum HandshakeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("TLS handshake: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_classification() {
        assert!(SessionError::ControllerUnavailable(Unavailable::NotConnected).is_retriable());
        assert!(SessionError::LookupFailed(RpcError::Cancelled).is_retriable());
        assert!(!SessionError::SessionExpired("s_1".into()).is_retriable());
        assert!(!SessionError::CertificateInvalid("x".into()).is_retriable());
        assert!(!SessionError::ActivationFailed(RpcError::Rejected("v".into())).is_retriable());
        assert!(!SessionError::AuthorizationFailed(RpcError::Rejected("q".into())).is_retriable());
        assert!(!SessionError::InvalidServerName("x".into()).is_retriable());
    }

    #[test]
    fn wrapped_cause_is_the_source() {
        use std::error::Error as _;
        let err = SessionError::LookupFailed(RpcError::Transport("reset".into()));
        let src = err.source().unwrap().to_string();
        assert_eq!(src, "transport: reset");
    }
}
