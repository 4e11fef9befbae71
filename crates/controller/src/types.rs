//! Error types for control-plane access.

use std::time::Duration;

/// A failed control-plane call.  Transport failures and controller-side
/// rejections are kept apart for logging, but callers treat both as a
/// failed call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
}

/// Why no controller client could be handed out.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// No client has ever been stored, or the link shut down.
    #[error("could not get a controller client")]
    NotConnected,
    /// A snapshot exists but its connection has dropped.
    #[error("controller client is disconnected")]
    Disconnected,
}

/// Terminal outcome of a [`ControllerLink`](crate::link::ControllerLink) run.
#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    #[error("reconnect exhausted after {0} attempts")]
    ReconnectExhausted(u32),
    #[error("shutdown")]
    Shutdown,
}
