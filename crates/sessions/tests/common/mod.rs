//! Shared fixtures: an in-memory controller and certificate minting.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tg_controller::{ControllerHandle, RpcError, SessionService};
use tg_protocol::*;

// ── Certificates ────────────────────────────────────────────────────────

pub struct Minted {
    pub cert_der: Vec<u8>,
    pub key_der: Vec<u8>,
}

/// Self-signed Ed25519 certificate carrying `dns_names` as SANs.
pub fn mint(dns_names: &[&str]) -> Minted {
    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_ED25519).unwrap();
    let names: Vec<String> = dns_names.iter().map(|s| s.to_string()).collect();
    let cert = rcgen::CertificateParams::new(names)
        .unwrap()
        .self_signed(&key)
        .unwrap();
    Minted {
        cert_der: cert.der().to_vec(),
        key_der: key.serialize_der(),
    }
}

/// The key in the controller's raw Ed25519 form: 32-byte seed followed by
/// the 32-byte public key.
pub fn raw_ed25519(minted: &Minted) -> Vec<u8> {
    let at = minted
        .key_der
        .windows(4)
        .position(|w| w == [0x04, 0x22, 0x04, 0x20])
        .unwrap()
        + 4;
    let (_, cert) = x509_parser::parse_x509_certificate(&minted.cert_der).unwrap();
    let mut raw = minted.key_der[at..at + 32].to_vec();
    raw.extend_from_slice(&cert.public_key().subject_public_key.data);
    raw
}

pub fn lookup_response(
    id: &str,
    minted: &Minted,
    status: SessionStatus,
    ttl: chrono::Duration,
) -> LookupSessionResponse {
    LookupSessionResponse {
        session_id: id.into(),
        status,
        expiration: Utc::now() + ttl,
        authorization: SessionAuthorization {
            certificate: minted.cert_der.clone(),
            private_key: minted.key_der.clone(),
        },
        version: 1,
        connection_limit: 10,
    }
}

// ── Mock controller ─────────────────────────────────────────────────────

type LookupFn = dyn Fn(&LookupSessionRequest) -> Result<LookupSessionResponse, RpcError> + Send + Sync;

/// How the mock answers `authorize_connection`.
pub enum Authorize {
    /// `c_1`, `c_2`, ... with `connections_left` counting down from the quota.
    Quota(i32),
    /// The same id every time.
    FixedId(String, i32),
    Fail(RpcError),
}

pub struct MockController {
    lookup: Box<LookupFn>,
    /// Delay before each lookup answers.
    lookup_delay: Duration,
    activate: Mutex<Result<SessionStatus, RpcError>>,
    authorize: Mutex<Authorize>,
    issued: AtomicUsize,
    pub lookups: AtomicUsize,
    pub activations: Mutex<Vec<ActivateSessionRequest>>,
    pub authorizations: AtomicUsize,
}

impl MockController {
    pub fn new(
        lookup: impl Fn(&LookupSessionRequest) -> Result<LookupSessionResponse, RpcError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            lookup: Box::new(lookup),
            lookup_delay: Duration::ZERO,
            activate: Mutex::new(Ok(SessionStatus::Active)),
            authorize: Mutex::new(Authorize::Quota(5)),
            issued: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
            activations: Mutex::new(Vec::new()),
            authorizations: AtomicUsize::new(0),
        }
    }

    /// Every lookup returns a fresh response built from `minted`.
    pub fn serving(minted: Minted, status: SessionStatus, ttl: chrono::Duration) -> Self {
        Self::new(move |req| Ok(lookup_response(&req.session_id, &minted, status, ttl)))
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn set_activate(&self, result: Result<SessionStatus, RpcError>) {
        *self.activate.lock() = result;
    }

    pub fn set_authorize(&self, mode: Authorize) {
        *self.authorize.lock() = mode;
    }
}

#[async_trait::async_trait]
impl SessionService for MockController {
    async fn lookup_session(
        &self,
        req: LookupSessionRequest,
    ) -> Result<LookupSessionResponse, RpcError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        (self.lookup)(&req)
    }

    async fn activate_session(
        &self,
        req: ActivateSessionRequest,
    ) -> Result<ActivateSessionResponse, RpcError> {
        self.activations.lock().push(req);
        self.activate
            .lock()
            .clone()
            .map(|status| ActivateSessionResponse { status })
    }

    async fn authorize_connection(
        &self,
        _req: AuthorizeConnectionRequest,
    ) -> Result<AuthorizeConnectionResponse, RpcError> {
        self.authorizations.fetch_add(1, Ordering::SeqCst);
        let (connection_id, connections_left) = match &*self.authorize.lock() {
            Authorize::Quota(quota) => {
                let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
                (format!("c_{n}"), quota - n as i32)
            }
            Authorize::FixedId(id, left) => (id.clone(), *left),
            Authorize::Fail(e) => return Err(e.clone()),
        };
        Ok(AuthorizeConnectionResponse {
            connection_id,
            status: ConnectionStatus::Authorized,
            connections_left,
        })
    }
}

/// A handle with `mock` already published.
pub fn handle_with(mock: Arc<MockController>) -> Arc<ControllerHandle> {
    let handle = Arc::new(ControllerHandle::new());
    handle.store(mock);
    handle
}
