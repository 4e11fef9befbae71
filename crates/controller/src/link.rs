//! Controller link supervisor — keeps the [`ControllerHandle`] populated with
//! a live client, redialing with back-off whenever the link drops.

use std::sync::Arc;

use tg_domain::trace::TraceEvent;
use tokio_util::sync::CancellationToken;

use crate::handle::ControllerHandle;
use crate::reconnect::ReconnectBackoff;
use crate::service::SessionService;
use crate::types::LinkError;

/// Opens a new connection to the controller.
///
/// Transport setup (addresses, TLS, auth) is the implementor's business; the
/// link only needs a ready client back.
#[async_trait::async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn dial(&self) -> anyhow::Result<Arc<dyn SessionService>>;
}

/// Owns the dial → publish → wait-for-close → redial cycle.
pub struct ControllerLink {
    handle: Arc<ControllerHandle>,
    dialer: Arc<dyn Dialer>,
    backoff: ReconnectBackoff,
}

impl ControllerLink {
    pub fn new(
        handle: Arc<ControllerHandle>,
        dialer: Arc<dyn Dialer>,
        backoff: ReconnectBackoff,
    ) -> Self {
        Self {
            handle,
            dialer,
            backoff,
        }
    }

    /// Run until `shutdown` fires or the back-off policy is exhausted.
    ///
    /// Every successful dial publishes a new generation into the handle.
    /// When that client reports `closed`, its snapshot is replaced by a
    /// disconnected copy so readers fail fast with `Disconnected` instead of
    /// calling into a dead client.  On shutdown the handle is cleared.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), LinkError> {
        let mut failures: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                self.handle.clear();
                return Err(LinkError::Shutdown);
            }

            let dialed = tokio::select! {
                r = self.dialer.dial() => r,
                _ = shutdown.cancelled() => {
                    self.handle.clear();
                    return Err(LinkError::Shutdown);
                }
            };

            let delay = match dialed {
                Ok(client) => {
                    let generation = self.handle.store(client.clone());
                    failures = 0;
                    tracing::info!(generation, "controller client published");

                    tokio::select! {
                        _ = client.closed() => {}
                        _ = shutdown.cancelled() => {
                            tracing::info!(generation, "shutdown requested");
                            self.handle.clear();
                            return Err(LinkError::Shutdown);
                        }
                    }

                    self.handle.mark_disconnected(generation);
                    TraceEvent::ControllerLost {
                        generation,
                        reason: "connection closed".into(),
                    }
                    .emit();
                    self.backoff.delay_for_attempt(0)
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(attempt = failures, error = %e, "controller dial failed");

                    if self.backoff.should_give_up(failures) {
                        tracing::error!(attempts = failures, "max reconnect attempts exhausted");
                        return Err(LinkError::ReconnectExhausted(failures));
                    }
                    self.backoff.delay_for_attempt(failures - 1)
                }
            };

            tracing::info!(delay_ms = delay.as_millis() as u64, "redialing controller");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.cancelled() => {
                    self.handle.clear();
                    return Err(LinkError::Shutdown);
                }
            }
        }
    }

    /// Same as [`run`](Self::run), on a spawned task.
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<Result<(), LinkError>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
