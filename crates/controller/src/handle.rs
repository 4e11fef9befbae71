//! Hot-swappable reference to the live controller client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tg_domain::trace::TraceEvent;

use crate::service::SessionService;
use crate::types::Unavailable;

/// Immutable snapshot stored in the handle.  A state change is a new
/// snapshot, never a mutation of this one.
pub struct ControllerConn {
    client: Arc<dyn SessionService>,
    generation: u64,
    live: bool,
}

impl ControllerConn {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn client(&self) -> &Arc<dyn SessionService> {
        &self.client
    }
}

/// Process-wide, lock-free-read reference to the current controller client.
///
/// Reads go through `arc_swap`, so a reader sees either the old or the new
/// snapshot in full even while a reconnect swaps it.
pub struct ControllerHandle {
    current: ArcSwapOption<ControllerConn>,
    generations: AtomicU64,
}

impl Default for ControllerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerHandle {
    /// An empty handle; every `load` fails with `NotConnected` until the
    /// first `store`.
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            generations: AtomicU64::new(0),
        }
    }

    /// Publish a freshly connected client.  Returns its generation number,
    /// which [`mark_disconnected`](Self::mark_disconnected) uses to avoid
    /// clobbering a newer client.
    pub fn store(&self, client: Arc<dyn SessionService>) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::AcqRel) + 1;
        self.current.store(Some(Arc::new(ControllerConn {
            client,
            generation,
            live: true,
        })));
        TraceEvent::ControllerSwapped { generation }.emit();
        generation
    }

    /// Replace the live snapshot of `generation` with a disconnected copy.
    ///
    /// No-op (returns `false`) if a different generation is current or the
    /// snapshot is already disconnected.
    pub fn mark_disconnected(&self, generation: u64) -> bool {
        let prev = self.current.rcu(|cur| match cur {
            Some(conn) if conn.generation == generation && conn.live => {
                Some(Arc::new(ControllerConn {
                    client: conn.client.clone(),
                    generation,
                    live: false,
                }))
            }
            other => other.clone(),
        });
        matches!(prev, Some(conn) if conn.generation == generation && conn.live)
    }

    /// Drop the current snapshot entirely.
    pub fn clear(&self) {
        self.current.store(None);
    }

    /// The current live client.
    pub fn load(&self) -> Result<Arc<dyn SessionService>, Unavailable> {
        match self.current.load_full() {
            None => Err(Unavailable::NotConnected),
            Some(conn) if !conn.live => Err(Unavailable::Disconnected),
            Some(conn) => Ok(conn.client.clone()),
        }
    }

    /// The current snapshot, live or not.
    pub fn snapshot(&self) -> Option<Arc<ControllerConn>> {
        self.current.load_full()
    }

    pub fn is_connected(&self) -> bool {
        self.current
            .load_full()
            .map(|conn| conn.live)
            .unwrap_or(false)
    }
}
