//! Wires the registry, resolver, lifecycle manager and sweeper around one
//! controller handle.

use std::sync::Arc;

use tg_controller::ControllerHandle;
use tg_domain::config::{Config, SessionsConfig};
use tokio_util::sync::CancellationToken;

use crate::handshake::SessionAcceptor;
use crate::lifecycle::LifecycleManager;
use crate::store::SessionRegistry;
use crate::sweep::SessionSweeper;
use crate::tls::CredentialResolver;

/// Everything the worker needs to terminate and manage sessions.
pub struct SessionBroker {
    controller: Arc<ControllerHandle>,
    registry: Arc<SessionRegistry>,
    resolver: Arc<CredentialResolver>,
    lifecycle: Arc<LifecycleManager>,
    sessions_config: SessionsConfig,
    /// Parent of every lookup and of the sweeper.
    shutdown: CancellationToken,
}

impl SessionBroker {
    pub fn new(config: &Config, controller: Arc<ControllerHandle>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let shutdown = CancellationToken::new();

        let resolver = Arc::new(CredentialResolver::new(
            controller.clone(),
            registry.clone(),
            config.sessions.lookup_timeout(),
            shutdown.child_token(),
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            controller.clone(),
            registry.clone(),
            config.worker.name.clone(),
            config.sessions.rpc_timeout(),
        ));

        tracing::info!(worker = %config.worker.name, "session broker ready");

        Self {
            controller,
            registry,
            resolver,
            lifecycle,
            sessions_config: config.sessions.clone(),
            shutdown,
        }
    }

    pub fn controller(&self) -> &Arc<ControllerHandle> {
        &self.controller
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &Arc<CredentialResolver> {
        &self.resolver
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }

    pub fn acceptor(&self) -> SessionAcceptor {
        SessionAcceptor::new(self.resolver.clone())
    }

    /// Start the expired-session sweeper.  It stops on [`shutdown`](Self::shutdown).
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        SessionSweeper::from_config(self.registry.clone(), &self.sessions_config)
            .spawn(self.shutdown.child_token())
    }

    /// Cancel in-flight lookups, stop the sweeper and tear down every
    /// session.  Returns how many sessions were dropped.
    pub fn shutdown(&self) -> usize {
        self.shutdown.cancel();
        let dropped = self.registry.clear();
        tracing::info!(sessions = dropped, "session broker shut down");
        dropped
    }
}
