//! Control-plane protocol: the request/response shapes the worker exchanges
//! with the controller's session service, and the status enums it reports.
//!
//! Only the shapes are defined here.  How they travel on the wire belongs to
//! whichever `SessionService` implementation carries them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status enums
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session status as reported by the controller.  `Unspecified` means the
/// worker has not been told yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Unspecified,
    Pending,
    Active,
    Canceling,
    Terminated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Canceling => "canceling",
            Self::Terminated => "terminated",
        }
    }

    /// A terminated session never becomes usable again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection status as reported by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Unspecified,
    Authorized,
    Connected,
    Closed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Authorized => "authorized",
            Self::Connected => "connected",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session lookup
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupSessionRequest {
    pub session_id: String,
}

/// Credential material issued for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAuthorization {
    /// DER-encoded leaf certificate carrying exactly one DNS name.
    pub certificate: Vec<u8>,
    /// Ed25519 private key matching `certificate`: either the raw 64-byte
    /// form (32-byte seed followed by the public key), a bare 32-byte seed,
    /// or a PKCS#8 DER document.
    pub private_key: Vec<u8>,
}

/// Full session descriptor returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupSessionResponse {
    pub session_id: String,
    #[serde(default)]
    pub status: SessionStatus,
    pub expiration: DateTime<Utc>,
    pub authorization: SessionAuthorization,
    /// Optimistic-concurrency version the next activation must present.
    #[serde(default)]
    pub version: u32,
    /// Remaining connection quota at lookup time; `-1` means unlimited.
    #[serde(default)]
    pub connection_limit: i32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Activation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateSessionRequest {
    pub session_id: String,
    /// Trust-on-first-use token proving this worker is the first activator.
    pub tofu_token: String,
    pub version: u32,
    pub worker_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateSessionResponse {
    #[serde(default)]
    pub status: SessionStatus,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection authorization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeConnectionRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeConnectionResponse {
    pub connection_id: String,
    #[serde(default)]
    pub status: ConnectionStatus,
    /// Connections the session may still open after this one.
    pub connections_left: i32,
}
