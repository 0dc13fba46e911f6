//! pmux-core - Core traits and protocol types for multiplexed provider servers
//!
//! This crate provides the `ProviderBackend` abstraction that every provider
//! server implements, together with the request/response shapes of each RPC.
//! The mux server in `pmux-server` consumes backends through this trait and
//! implements it itself, so a muxed server is indistinguishable from a single
//! backend to its caller.

pub mod backend;
pub mod error;
pub mod models;

pub use backend::{BackendFactory, ProviderBackend};
pub use error::{BackendError, BackendResult, TypeKind};
pub use models::*;
