//! `tg-controller` — the worker's view of the control plane.
//!
//! The controller is the only authority on session state.  This crate holds
//! the RPC boundary ([`SessionService`]), the process-wide hot-swappable
//! reference to the live client ([`ControllerHandle`]), and the supervisor
//! that keeps that reference populated across reconnects ([`ControllerLink`]).
//!
//! # Handle lifecycle
//!
//! ```text
//!   empty ──dial ok──▶ live(gen 1) ──closed──▶ disconnected(gen 1)
//!                                                   │
//!                          live(gen 2) ◀──dial ok───┘
//! ```
//!
//! Every transition replaces the snapshot wholesale.  Readers never observe
//! a half-updated client.

pub mod handle;
pub mod link;
pub mod reconnect;
pub mod service;
pub mod types;

pub use handle::{ControllerConn, ControllerHandle};
pub use link::{ControllerLink, Dialer};
pub use reconnect::ReconnectBackoff;
pub use service::{call_bounded, SessionService};
pub use types::{LinkError, RpcError, Unavailable};
