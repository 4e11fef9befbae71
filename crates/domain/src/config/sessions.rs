use serde::{Deserialize, Serialize};
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Prefix the controller puts on every session id. Clients send the session
/// id as the TLS server name, so this is also the SNI prefix.
pub const SESSION_ID_PREFIX: &str = "s_";

/// Session broker tuning: control-plane call bounds and the expired-session
/// sweep policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Upper bound on a session lookup issued from a TLS handshake.
    #[serde(default = "d_90")]
    pub lookup_timeout_secs: u64,

    /// Upper bound on activation and connection-authorization calls.
    #[serde(default = "d_90")]
    pub rpc_timeout_secs: u64,

    /// How often the sweeper looks for expired sessions.
    #[serde(default = "d_60")]
    pub sweep_interval_secs: u64,

    /// How long past expiration a session with a connection still in
    /// `authorized` is kept before it is evicted anyway.
    #[serde(default = "d_300")]
    pub pending_grace_secs: u64,

    /// Must equal [`SESSION_ID_PREFIX`]; kept in config so a mismatch shows
    /// up in validation instead of as rejected handshakes.
    #[serde(default = "d_prefix")]
    pub server_name_prefix: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: 90,
            rpc_timeout_secs: 90,
            sweep_interval_secs: 60,
            pending_grace_secs: 300,
            server_name_prefix: d_prefix(),
        }
    }
}

impl SessionsConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn pending_grace(&self) -> Duration {
        Duration::from_secs(self.pending_grace_secs)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_60() -> u64 {
    60
}
fn d_90() -> u64 {
    90
}
fn d_300() -> u64 {
    300
}
fn d_prefix() -> String {
    SESSION_ID_PREFIX.into()
}
