//! Credential resolver — turns a handshake's SNI into the per-session mTLS
//! server configuration.
//!
//! Concurrent handshakes for one session each do their own lookup and get
//! their own configuration.  The registry still converges on one record per
//! session.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::danger::ClientCertVerifier;
use rustls::server::WebPkiClientVerifier;
use rustls::{ProtocolVersion, RootCertStore, ServerConfig, SupportedProtocolVersion};
use tg_controller::{call_bounded, ControllerHandle};
use tg_domain::config::SESSION_ID_PREFIX;
use tg_domain::trace::TraceEvent;
use tg_protocol::{LookupSessionRequest, SessionAuthorization};
use tokio_util::sync::CancellationToken;
use x509_parser::extensions::GeneralName;

use crate::error::SessionError;
use crate::session::Session;
use crate::store::SessionRegistry;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session TLS material
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Server-side mTLS configuration derived from one session lookup.
#[derive(Clone, Debug)]
pub struct SessionTls {
    server_config: Arc<ServerConfig>,
    client_verifier: Arc<dyn ClientCertVerifier>,
    server_name: String,
    leaf: CertificateDer<'static>,
    versions: Vec<ProtocolVersion>,
}

impl SessionTls {
    /// Ready to hand to a TLS acceptor.
    pub fn server_config(&self) -> Arc<ServerConfig> {
        self.server_config.clone()
    }

    /// The verifier the server config uses for client certificates.  Its
    /// only trust anchor is the session leaf.
    pub fn client_verifier(&self) -> &Arc<dyn ClientCertVerifier> {
        &self.client_verifier
    }

    /// The certificate's sole DNS name.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn leaf(&self) -> &CertificateDer<'static> {
        &self.leaf
    }

    /// Protocol versions the server config was built with.
    pub fn protocol_versions(&self) -> &[ProtocolVersion] {
        &self.versions
    }

    /// Lowest version the server config will negotiate.
    pub fn min_protocol_version(&self) -> Option<ProtocolVersion> {
        self.versions.iter().copied().min_by_key(|v| u16::from(*v))
    }
}

/// Session configs only speak TLS 1.3.
const SESSION_PROTOCOL_VERSIONS: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// PKCS#8 v1 header for an Ed25519 key; the 32-byte seed follows.
const ED25519_PKCS8_V1_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];

/// Interpret the issued private key bytes.
///
/// The controller hands out raw Ed25519 keys (seed followed by public key,
/// 64 bytes) or a bare 32-byte seed; those are wrapped in a PKCS#8 envelope.
/// Anything else is taken to be PKCS#8 DER already.
pub fn session_private_key(raw: &[u8]) -> PrivateKeyDer<'static> {
    let der = match raw.len() {
        32 | 64 => {
            let mut der = Vec::with_capacity(ED25519_PKCS8_V1_PREFIX.len() + 32);
            der.extend_from_slice(&ED25519_PKCS8_V1_PREFIX);
            der.extend_from_slice(&raw[..32]);
            der
        }
        _ => raw.to_vec(),
    };
    PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(der))
}

/// The crypto provider session configs are built with.
pub fn default_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Extract the session id from a TLS server name.
pub fn parse_session_id(server_name: &str) -> Result<&str, SessionError> {
    if server_name.starts_with(SESSION_ID_PREFIX) {
        Ok(server_name)
    } else {
        Err(SessionError::InvalidServerName(server_name.to_owned()))
    }
}

/// Validate the issued certificate and build the session's server config.
///
/// The leaf is both the server identity and the only accepted client CA.
pub fn build_session_tls(
    auth: &SessionAuthorization,
    provider: &Arc<CryptoProvider>,
) -> Result<SessionTls, SessionError> {
    let (_, parsed) = x509_parser::parse_x509_certificate(&auth.certificate).map_err(|e| {
        SessionError::CertificateInvalid(format!("error parsing session certificate: {e}"))
    })?;

    let dns_names: Vec<String> = match parsed.subject_alternative_name() {
        Ok(Some(san)) => san
            .value
            .general_names
            .iter()
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some((*dns).to_owned()),
                _ => None,
            })
            .collect(),
        Ok(None) => Vec::new(),
        Err(e) => {
            return Err(SessionError::CertificateInvalid(format!(
                "error reading subject alternative names: {e}"
            )))
        }
    };

    let server_name = match dns_names.as_slice() {
        [only] => only.clone(),
        other => {
            return Err(SessionError::CertificateInvalid(format!(
                "invalid length of DNS names ({}) in parsed certificate",
                other.len()
            )))
        }
    };

    let leaf = CertificateDer::from(auth.certificate.clone());
    let key = session_private_key(&auth.private_key);

    let mut roots = RootCertStore::empty();
    roots
        .add(leaf.clone())
        .map_err(|e| SessionError::CertificateInvalid(format!("unusable as client CA: {e}")))?;

    let client_verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()
        .map_err(|e| SessionError::CertificateInvalid(format!("client verifier error: {e}")))?;

    let server_config = ServerConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(SESSION_PROTOCOL_VERSIONS)
        .map_err(|e| SessionError::CertificateInvalid(format!("protocol versions: {e}")))?
        .with_client_cert_verifier(client_verifier.clone())
        .with_single_cert(vec![leaf.clone()], key)
        .map_err(|e| SessionError::CertificateInvalid(format!("unusable certificate or key: {e}")))?;

    Ok(SessionTls {
        server_config: Arc::new(server_config),
        client_verifier,
        server_name,
        leaf,
        versions: SESSION_PROTOCOL_VERSIONS.iter().map(|v| v.version).collect(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolver
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Resolves handshake server names into session TLS configs, populating the
/// registry as a side effect.
pub struct CredentialResolver {
    controller: Arc<ControllerHandle>,
    registry: Arc<SessionRegistry>,
    provider: Arc<CryptoProvider>,
    lookup_timeout: Duration,
    /// Long-lived base scope; lookups are cancelled when it is.
    base: CancellationToken,
}

impl CredentialResolver {
    pub fn new(
        controller: Arc<ControllerHandle>,
        registry: Arc<SessionRegistry>,
        lookup_timeout: Duration,
        base: CancellationToken,
    ) -> Self {
        Self {
            controller,
            registry,
            provider: default_provider(),
            lookup_timeout,
            base,
        }
    }

    /// Look up the session named by `server_name`, validate its credentials
    /// and return the TLS config to finish the handshake with.
    ///
    /// Nothing is written to the registry unless every check passes.  When
    /// another handshake already registered the session, the registered
    /// record adopts this lookup's response but the returned config is
    /// still the one built from this lookup.
    pub async fn resolve_session_tls(&self, server_name: &str) -> Result<SessionTls, SessionError> {
        let session_id = match parse_session_id(server_name) {
            Ok(id) => {
                tracing::trace!(session_id = %id, "got valid session in SNI");
                id
            }
            Err(e) => {
                tracing::trace!(server_name, "invalid session in SNI");
                return Err(e);
            }
        };

        let client = self.controller.load().map_err(|reason| {
            tracing::trace!(session_id, %reason, "could not get a controller client");
            SessionError::ControllerUnavailable(reason)
        })?;

        tracing::trace!(session_id, "looking up session");
        let response = call_bounded(
            &self.base,
            self.lookup_timeout,
            client.lookup_session(LookupSessionRequest {
                session_id: session_id.to_owned(),
            }),
        )
        .await
        .map_err(SessionError::LookupFailed)?;

        if response.expiration <= Utc::now() {
            return Err(SessionError::SessionExpired(session_id.to_owned()));
        }

        let tls = build_session_tls(&response.authorization, &self.provider)?;

        let status = response.status;
        let (session, existed) = self.registry.load_or_create(session_id, {
            let tls = tls.clone();
            let response = response.clone();
            move || Session::new(session_id, response, tls)
        });
        if existed {
            // A concurrent handshake won the insert; keep its record current.
            session.apply_lookup(response);
        }

        TraceEvent::SessionResolved {
            session_id: session_id.to_owned(),
            status: status.to_string(),
            is_new: !existed,
        }
        .emit();

        tracing::trace!(session_id, "returning TLS configuration");
        Ok(tls)
    }
}
