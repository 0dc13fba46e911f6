//! Aggregation errors

use pmux_core::BackendError;
use thiserror::Error;

use crate::aggregator::BackendRef;

/// Reasons the backends cannot be combined into one server.
///
/// Every variant is fatal: no routing table is produced and no server can be
/// built until the backend set is fixed.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// GetProviderSchema failed at the call level
    #[error("error retrieving schema for {backend}: {source}")]
    SchemaRetrievalFailed {
        backend: BackendRef,
        #[source]
        source: BackendError,
    },

    /// GetProviderSchema returned an error-severity diagnostic
    #[error(
        "error retrieving schema for {backend}:\n\n\tAttribute: {attribute}\n\tSummary: {summary}\n\tDetail: {detail}"
    )]
    BackendSchemaError {
        backend: BackendRef,
        /// Display form of the attribute path, empty when absent
        attribute: String,
        summary: String,
        detail: String,
    },

    #[error("provider schema supported by multiple server implementations ({first_owner}, {conflicting_owner}), remove support from one")]
    DuplicateProviderSchema {
        first_owner: BackendRef,
        conflicting_owner: BackendRef,
    },

    #[error("provider_meta schema supported by multiple server implementations ({first_owner}, {conflicting_owner}), remove support from one")]
    DuplicateProviderMetaSchema {
        first_owner: BackendRef,
        conflicting_owner: BackendRef,
    },

    #[error("resource {type_name:?} supported by multiple server implementations ({first_owner}, {conflicting_owner}); remove support from one")]
    DuplicateResourceType {
        type_name: String,
        first_owner: BackendRef,
        conflicting_owner: BackendRef,
    },

    #[error("data source {type_name:?} supported by multiple server implementations ({first_owner}, {conflicting_owner}); remove support from one")]
    DuplicateDataSourceType {
        type_name: String,
        first_owner: BackendRef,
        conflicting_owner: BackendRef,
    },
}

impl AggregationError {
    /// The backend whose schema triggered the failure
    pub fn backend(&self) -> &BackendRef {
        match self {
            AggregationError::SchemaRetrievalFailed { backend, .. }
            | AggregationError::BackendSchemaError { backend, .. } => backend,
            AggregationError::DuplicateProviderSchema {
                conflicting_owner, ..
            }
            | AggregationError::DuplicateProviderMetaSchema {
                conflicting_owner, ..
            }
            | AggregationError::DuplicateResourceType {
                conflicting_owner, ..
            }
            | AggregationError::DuplicateDataSourceType {
                conflicting_owner, ..
            } => conflicting_owner,
        }
    }
}
