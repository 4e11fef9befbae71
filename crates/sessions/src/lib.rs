//! Session brokering for a tunnelgate worker.
//!
//! A client opens TLS with the session id as its server name.  The worker
//! looks the session up with the controller, builds a TLS 1.3 mTLS config
//! from the issued certificate (which also serves as the only client CA),
//! and records the session in a registry.  Activation and per-connection
//! authorization are then delegated to the controller.
//!
//! ```text
//!   ClientHello(SNI=s_…) ─▶ SessionAcceptor ─▶ CredentialResolver ─▶ controller
//!                                                    │
//!                                                    ▼
//!                                             SessionRegistry ◀── LifecycleManager
//!                                                    ▲
//!                                              SessionSweeper
//! ```

pub mod broker;
pub mod error;
pub mod handshake;
pub mod lifecycle;
pub mod session;
pub mod store;
pub mod sweep;
pub mod tls;

pub use broker::SessionBroker;
pub use error::{HandshakeError, SessionError};
pub use handshake::{AcceptedSession, SessionAcceptor};
pub use lifecycle::LifecycleManager;
pub use session::{Connection, Session};
pub use store::SessionRegistry;
pub use sweep::{eviction_reason, EvictReason, SessionSweeper};
pub use tls::{build_session_tls, parse_session_id, CredentialResolver, SessionTls};
