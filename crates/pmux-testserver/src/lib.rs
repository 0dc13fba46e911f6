//! pmux-testserver - In-memory provider backend for exercising the mux
//!
//! `TestServer` declares whatever schemas it is built with, records every
//! call it receives, and can be told to fail or to return diagnostics from
//! the provider-wide RPCs. Servers can be built programmatically or loaded
//! from TOML (see [`config`]).
//!
//! # Usage
//!
//! ```rust,ignore
//! use pmux_testserver::TestServer;
//!
//! let network = TestServer::builder("network")
//!     .provider_schema()
//!     .resource("example_vpc")
//!     .build();
//!
//! // Each call of the factory hands out the same instance, so calls made
//! // through a mux are visible on `network` afterwards.
//! let factory = network.factory();
//! ```

pub mod config;
mod server;

pub use config::{ConfigError, TestServerConfig};
pub use server::{Call, CallJournal, TestServer, TestServerBuilder};
