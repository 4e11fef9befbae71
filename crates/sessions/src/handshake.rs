//! Inbound TLS handshake hook.
//!
//! The session config can only be chosen after the ClientHello is read, so
//! the acceptor peeks the SNI first and finishes the handshake with the
//! config the resolver hands back.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tokio_rustls::LazyConfigAcceptor;

use crate::error::{HandshakeError, SessionError};
use crate::tls::{CredentialResolver, SessionTls};

/// A completed session handshake.
pub struct AcceptedSession<IO> {
    pub session_id: String,
    pub tls: SessionTls,
    pub stream: TlsStream<IO>,
}

impl<IO> std::fmt::Debug for AcceptedSession<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptedSession")
            .field("session_id", &self.session_id)
            .field("server_name", &self.tls.server_name())
            .finish_non_exhaustive()
    }
}

/// Terminates session mTLS on raw inbound streams.
#[derive(Clone)]
pub struct SessionAcceptor {
    resolver: Arc<CredentialResolver>,
}

impl SessionAcceptor {
    pub fn new(resolver: Arc<CredentialResolver>) -> Self {
        Self { resolver }
    }

    /// Read the ClientHello, resolve its SNI into a session config and finish
    /// the handshake.  A ClientHello without SNI is `InvalidServerName`.
    pub async fn accept<IO>(&self, io: IO) -> Result<AcceptedSession<IO>, HandshakeError>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        let start = LazyConfigAcceptor::new(rustls::server::Acceptor::default(), io).await?;

        let server_name = match start.client_hello().server_name() {
            Some(name) => name.to_owned(),
            None => {
                tracing::debug!("client hello without server name");
                return Err(SessionError::InvalidServerName(String::new()).into());
            }
        };

        let tls = self.resolver.resolve_session_tls(&server_name).await?;
        let stream = start.into_stream(tls.server_config()).await?;

        tracing::debug!(session_id = %server_name, "session handshake complete");
        Ok(AcceptedSession {
            session_id: server_name,
            tls,
            stream,
        })
    }
}
