//! Periodic eviction of dead sessions from the registry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tg_domain::config::SessionsConfig;
use tg_domain::trace::TraceEvent;
use tokio_util::sync::CancellationToken;

use crate::session::Session;
use crate::store::SessionRegistry;

/// Why a session was swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    Expired,
    Terminated,
}

impl std::fmt::Display for EvictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => write!(f, "expired"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Decide whether `session` should be evicted at `now`.
///
/// Terminated sessions always go.  Expired sessions go too, unless a
/// connection is still `Authorized` (its handshake is in flight); those are
/// kept until `expiration + grace`.
pub fn eviction_reason(session: &Session, now: DateTime<Utc>, grace: Duration) -> Option<EvictReason> {
    if session.status().is_terminal() {
        return Some(EvictReason::Terminated);
    }
    let expiration = session.expiration();
    if expiration > now {
        return None;
    }
    if session.has_pending_connections() {
        let deadline = chrono::Duration::from_std(grace)
            .ok()
            .and_then(|grace| expiration.checked_add_signed(grace));
        match deadline {
            Some(deadline) if now >= deadline => {}
            _ => return None,
        }
    }
    Some(EvictReason::Expired)
}

/// Sweeps the registry on a fixed interval.
pub struct SessionSweeper {
    registry: Arc<SessionRegistry>,
    interval: Duration,
    grace: Duration,
}

impl SessionSweeper {
    pub fn new(registry: Arc<SessionRegistry>, interval: Duration, grace: Duration) -> Self {
        Self {
            registry,
            interval,
            grace,
        }
    }

    pub fn from_config(registry: Arc<SessionRegistry>, config: &SessionsConfig) -> Self {
        Self::new(registry, config.sweep_interval(), config.pending_grace())
    }

    /// One pass over the registry.  Returns the ids evicted.
    pub fn sweep_once(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut evicted = Vec::new();
        for session in self.registry.list() {
            let Some(reason) = eviction_reason(&session, now, self.grace) else {
                continue;
            };
            let connections = session.connection_count();
            // A record replaced since `list` is not ours to remove.
            if !self.registry.remove_if_current(&session) {
                continue;
            }
            TraceEvent::SessionEvicted {
                session_id: session.id().to_owned(),
                reason: reason.to_string(),
                connections,
            }
            .emit();
            evicted.push(session.id().to_owned());
        }
        if !evicted.is_empty() {
            tracing::debug!(count = evicted.len(), remaining = self.registry.len(), "session sweep");
        }
        evicted
    }

    /// Run [`sweep_once`](Self::sweep_once) every interval until `shutdown`
    /// fires.
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            tracing::info!(interval_secs = self.interval.as_secs(), "session sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once(Utc::now());
                    }
                    _ = shutdown.cancelled() => {
                        tracing::info!("session sweeper stopped");
                        return;
                    }
                }
            }
        })
    }
}
