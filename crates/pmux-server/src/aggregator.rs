//! Schema aggregation - decides which backend serves which type
//!
//! Aggregation runs once, before any server exists. Each backend is
//! constructed and asked for its schema, in declaration order, and its
//! declarations are checked against everything seen so far. The first
//! conflict aborts the whole run.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use pmux_core::{
    BackendFactory, Diagnostic, GetProviderSchemaRequest, GetProviderSchemaResponse,
    ProviderBackend, Schema,
};
use tracing::{debug, info, warn};

use crate::error::AggregationError;
use crate::server::MuxServer;

/// A backend as identified during aggregation: its declaration position and
/// its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRef {
    pub index: usize,
    pub name: String,
}

impl BackendRef {
    fn of(index: usize, backend: &dyn ProviderBackend) -> Self {
        Self {
            index,
            name: backend.name().to_string(),
        }
    }
}

impl fmt::Display for BackendRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.index)
    }
}

/// Which backend position owns each routable name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    resources: HashMap<String, usize>,
    data_sources: HashMap<String, usize>,
    provider_schema_owner: Option<usize>,
    provider_meta_schema_owner: Option<usize>,
}

impl RoutingTable {
    pub fn resource_owner(&self, type_name: &str) -> Option<usize> {
        self.resources.get(type_name).copied()
    }

    pub fn data_source_owner(&self, type_name: &str) -> Option<usize> {
        self.data_sources.get(type_name).copied()
    }

    /// Backend that declared the provider schema; it also prepares provider config
    pub fn provider_schema_owner(&self) -> Option<usize> {
        self.provider_schema_owner
    }

    pub fn provider_meta_schema_owner(&self) -> Option<usize> {
        self.provider_meta_schema_owner
    }

    /// Registered resource type names, sorted
    pub fn resource_types(&self) -> Vec<&str> {
        sorted_keys(&self.resources)
    }

    /// Registered data source type names, sorted
    pub fn data_source_types(&self) -> Vec<&str> {
        sorted_keys(&self.data_sources)
    }

    pub(crate) fn resources(&self) -> impl Iterator<Item = (&str, usize)> {
        self.resources.iter().map(|(name, pos)| (name.as_str(), *pos))
    }

    pub(crate) fn data_sources(&self) -> impl Iterator<Item = (&str, usize)> {
        self.data_sources.iter().map(|(name, pos)| (name.as_str(), *pos))
    }
}

fn sorted_keys(map: &HashMap<String, usize>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// The single schema the mux answers GetProviderSchema with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSchema {
    provider: Option<Schema>,
    provider_meta: Option<Schema>,
    resource_schemas: BTreeMap<String, Schema>,
    data_source_schemas: BTreeMap<String, Schema>,
    diagnostics: Vec<Diagnostic>,
}

impl MergedSchema {
    pub fn provider(&self) -> Option<&Schema> {
        self.provider.as_ref()
    }

    pub fn provider_meta(&self) -> Option<&Schema> {
        self.provider_meta.as_ref()
    }

    pub fn resource_schemas(&self) -> &BTreeMap<String, Schema> {
        &self.resource_schemas
    }

    pub fn data_source_schemas(&self) -> &BTreeMap<String, Schema> {
        &self.data_source_schemas
    }

    /// Non-error diagnostics from every backend, in backend declaration
    /// order and then in the order each backend returned them
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The merged schema as a GetProviderSchema response
    pub fn to_response(&self) -> GetProviderSchemaResponse {
        GetProviderSchemaResponse {
            provider: self.provider.clone(),
            provider_meta: self.provider_meta.clone(),
            resource_schemas: self.resource_schemas.clone(),
            data_source_schemas: self.data_source_schemas.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Result of a successful aggregation run.
///
/// Holds the factories so that serving instances can be built from them.
pub struct Aggregation {
    routing: RoutingTable,
    schema: MergedSchema,
    factories: Vec<BackendFactory>,
}

impl Aggregation {
    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn schema(&self) -> &MergedSchema {
        &self.schema
    }

    pub fn backend_count(&self) -> usize {
        self.factories.len()
    }

    /// Build a serving instance.
    ///
    /// Every factory is invoked again; the new instances are routed to by
    /// position, so they share nothing with the instances queried during
    /// aggregation except the routing decisions.
    pub fn server(&self) -> MuxServer {
        let backends: Vec<Arc<dyn ProviderBackend>> =
            self.factories.iter().map(|factory| factory()).collect();
        MuxServer::from_parts(&self.routing, self.schema.clone(), backends)
    }
}

/// Ask every backend for its schema and build the routing table.
///
/// Backends are processed strictly in order. The first failure of any kind
/// aborts the run.
pub async fn aggregate(factories: Vec<BackendFactory>) -> Result<Aggregation, AggregationError> {
    let mut state = AggregationState::default();

    for (index, factory) in factories.iter().enumerate() {
        let backend = factory();
        let backend_ref = BackendRef::of(index, backend.as_ref());
        debug!(mux_provider = %backend_ref.name, backend_index = index, "Retrieving backend schema");

        let resp = match backend
            .get_provider_schema(&GetProviderSchemaRequest::default())
            .await
        {
            Ok(resp) => resp,
            Err(source) => {
                warn!(mux_provider = %backend_ref.name, error = %source, "Backend schema retrieval failed");
                return Err(AggregationError::SchemaRetrievalFailed {
                    backend: backend_ref,
                    source,
                });
            }
        };

        if let Err(e) = state.absorb(backend_ref, resp) {
            warn!(error = %e, "Schema aggregation failed");
            return Err(e);
        }
    }

    info!(
        backends = factories.len(),
        resources = state.routing.resources.len(),
        data_sources = state.routing.data_sources.len(),
        warnings = state.schema.diagnostics.len(),
        "Aggregated backend schemas"
    );

    Ok(Aggregation {
        routing: state.routing,
        schema: state.schema,
        factories,
    })
}

/// Accumulated routing and schema state while aggregation is in progress
#[derive(Default)]
struct AggregationState {
    routing: RoutingTable,
    schema: MergedSchema,
    /// Backends seen so far, for naming first owners in errors
    seen: Vec<BackendRef>,
}

impl AggregationState {
    /// Fold one backend's schema response into the state
    fn absorb(
        &mut self,
        backend: BackendRef,
        resp: GetProviderSchemaResponse,
    ) -> Result<(), AggregationError> {
        let GetProviderSchemaResponse {
            provider,
            provider_meta,
            resource_schemas,
            data_source_schemas,
            diagnostics,
        } = resp;

        for diag in diagnostics {
            if diag.is_error() {
                return Err(AggregationError::BackendSchemaError {
                    attribute: diag
                        .attribute
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    summary: diag.summary,
                    detail: diag.detail,
                    backend,
                });
            }
            self.schema.diagnostics.push(diag);
        }

        if let Some(schema) = provider {
            if let Some(first) = self.routing.provider_schema_owner {
                return Err(AggregationError::DuplicateProviderSchema {
                    first_owner: self.owner(first),
                    conflicting_owner: backend,
                });
            }
            self.routing.provider_schema_owner = Some(backend.index);
            self.schema.provider = Some(schema);
        }

        if let Some(schema) = provider_meta {
            if let Some(first) = self.routing.provider_meta_schema_owner {
                return Err(AggregationError::DuplicateProviderMetaSchema {
                    first_owner: self.owner(first),
                    conflicting_owner: backend,
                });
            }
            self.routing.provider_meta_schema_owner = Some(backend.index);
            self.schema.provider_meta = Some(schema);
        }

        for (type_name, schema) in resource_schemas {
            if let Some(&first) = self.routing.resources.get(&type_name) {
                return Err(AggregationError::DuplicateResourceType {
                    type_name,
                    first_owner: self.owner(first),
                    conflicting_owner: backend,
                });
            }
            self.routing.resources.insert(type_name.clone(), backend.index);
            self.schema.resource_schemas.insert(type_name, schema);
        }

        for (type_name, schema) in data_source_schemas {
            if let Some(&first) = self.routing.data_sources.get(&type_name) {
                return Err(AggregationError::DuplicateDataSourceType {
                    type_name,
                    first_owner: self.owner(first),
                    conflicting_owner: backend,
                });
            }
            self.routing.data_sources.insert(type_name.clone(), backend.index);
            self.schema.data_source_schemas.insert(type_name, schema);
        }

        self.seen.push(backend);
        Ok(())
    }

    fn owner(&self, index: usize) -> BackendRef {
        self.seen
            .get(index)
            .cloned()
            .unwrap_or_else(|| BackendRef {
                index,
                name: format!("backend #{}", index),
            })
    }
}
