//! Common error types for provider backends

use std::fmt;

use thiserror::Error;

use crate::models::Rpc;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// The routing table a type name is looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Managed resource type
    Resource,
    /// Data source type
    DataSource,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Resource => f.write_str("resource"),
            TypeKind::DataSource => f.write_str("data source"),
        }
    }
}

/// Errors that can occur when calling a provider backend.
///
/// These are call-level failures. Domain-level problems (invalid config,
/// missing remote objects) travel as diagnostics inside successful responses.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backend declared the requested type in its schema
    #[error("{kind} {type_name:?} isn't supported by any servers")]
    UnsupportedType {
        /// Which table was consulted
        kind: TypeKind,
        /// The type name from the request
        type_name: String,
    },

    /// No backend declared a provider schema, so nothing can prepare config
    #[error("no server is set to provide the provider's schema")]
    NoProviderSchemaOwner,

    /// A backend failed while participating in a fan-out RPC
    #[error("error calling {rpc} on {backend}: {source}")]
    Fanout {
        /// The RPC being fanned out
        rpc: Rpc,
        /// Name of the failing backend
        backend: String,
        /// The backend's own error
        #[source]
        source: Box<BackendError>,
    },

    /// Operation not supported by this backend
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Transport/communication error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Wrap a backend's error with the fan-out context it occurred in
    pub fn fanout(rpc: Rpc, backend: impl Into<String>, source: BackendError) -> Self {
        BackendError::Fanout {
            rpc,
            backend: backend.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error is a per-request routing failure rather than a
    /// backend failure
    pub fn is_routing_error(&self) -> bool {
        matches!(
            self,
            BackendError::UnsupportedType { .. } | BackendError::NoProviderSchemaOwner
        )
    }
}
