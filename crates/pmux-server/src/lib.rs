//! pmux-server - Routes provider RPCs across several backend servers
//!
//! This crate provides `MuxServer`, which presents a set of independently
//! implemented provider backends as a single `ProviderBackend`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           MuxServer                              │
//! │                                                                  │
//! │  GetProviderSchema      -> merged schema, no backend call        │
//! │  PrepareProviderConfig  -> provider schema owner                 │
//! │  resource / data source -> owner of req.type_name                │
//! │  ConfigureProvider      -> every backend, stop on error diag     │
//! │  StopProvider           -> every backend, join error strings     │
//! │                              │                                   │
//! │              ┌───────────────┼───────────────┐                   │
//! │              ▼               ▼               ▼                   │
//! │     ┌──────────────┐ ┌──────────────┐ ┌──────────────┐           │
//! │     │  backend #0  │ │  backend #1  │ │  backend #2  │           │
//! │     │ (provider +  │ │ (resources)  │ │ (data        │           │
//! │     │  resources)  │ │              │ │  sources)    │           │
//! │     └──────────────┘ └──────────────┘ └──────────────┘           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Routing is decided once, by [`aggregate`], which asks every backend for
//! its schema and rejects overlapping ownership. The resulting
//! [`Aggregation`] builds serving instances with freshly constructed
//! backends.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pmux_server::MuxServer;
//!
//! let mux = MuxServer::new(vec![network_factory, compute_factory]).await?;
//!
//! // `mux` is itself a ProviderBackend
//! let resp = mux.read_resource(&req).await?;
//! ```

mod aggregator;
mod error;
mod server;

pub use aggregator::{aggregate, Aggregation, BackendRef, MergedSchema, RoutingTable};
pub use error::AggregationError;
pub use server::MuxServer;

// Re-export core types for convenience
pub use pmux_core::{BackendError, BackendFactory, BackendResult, ProviderBackend};
