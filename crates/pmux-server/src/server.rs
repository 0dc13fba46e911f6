//! MuxServer - serves several backends as one provider
//!
//! Routing falls into four kinds:
//! - GetProviderSchema answers from the merged schema without touching a backend
//! - PrepareProviderConfig goes to the provider schema owner
//! - resource and data source RPCs go to the owner of `req.type_name`
//! - ConfigureProvider and StopProvider fan out to every backend in order

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pmux_core::{
    ApplyResourceChangeRequest, ApplyResourceChangeResponse, BackendError, BackendFactory,
    BackendResult, ConfigureProviderRequest, ConfigureProviderResponse, GetProviderSchemaRequest,
    GetProviderSchemaResponse, ImportResourceStateRequest, ImportResourceStateResponse,
    PlanResourceChangeRequest, PlanResourceChangeResponse, PrepareProviderConfigRequest,
    PrepareProviderConfigResponse, ProviderBackend, ReadDataSourceRequest, ReadDataSourceResponse,
    ReadResourceRequest, ReadResourceResponse, Rpc, StopProviderRequest, StopProviderResponse,
    TypeKind, UpgradeResourceStateRequest, UpgradeResourceStateResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
    ValidateResourceTypeConfigRequest, ValidateResourceTypeConfigResponse,
};
use tracing::{debug, info, warn};

use crate::aggregator::{aggregate, MergedSchema, RoutingTable};
use crate::error::AggregationError;

/// Provider backend that routes every RPC to the backend(s) responsible for it.
///
/// All routing state is fixed at construction. The server holds no locks and
/// no per-request state; concurrent requests are safe as long as the
/// backends themselves are.
pub struct MuxServer {
    /// Merged schema served by GetProviderSchema
    schema: MergedSchema,
    /// Backends in declaration order
    backends: Vec<Arc<dyn ProviderBackend>>,
    resources: HashMap<String, Arc<dyn ProviderBackend>>,
    data_sources: HashMap<String, Arc<dyn ProviderBackend>>,
    /// Provider schema owner; `None` if no backend declared a provider schema
    prepare_config_backend: Option<Arc<dyn ProviderBackend>>,
}

impl MuxServer {
    /// Aggregate the backends' schemas and build a serving instance.
    ///
    /// Each factory is called twice: once for aggregation, once for serving.
    pub async fn new(factories: Vec<BackendFactory>) -> Result<Self, AggregationError> {
        Ok(aggregate(factories).await?.server())
    }

    pub(crate) fn from_parts(
        routing: &RoutingTable,
        schema: MergedSchema,
        backends: Vec<Arc<dyn ProviderBackend>>,
    ) -> Self {
        let resources: HashMap<String, Arc<dyn ProviderBackend>> = routing
            .resources()
            .filter_map(|(name, pos)| Some((name.to_string(), Arc::clone(backends.get(pos)?))))
            .collect();
        let data_sources: HashMap<String, Arc<dyn ProviderBackend>> = routing
            .data_sources()
            .filter_map(|(name, pos)| Some((name.to_string(), Arc::clone(backends.get(pos)?))))
            .collect();
        let prepare_config_backend = routing
            .provider_schema_owner()
            .and_then(|pos| backends.get(pos))
            .cloned();

        info!(
            backends = backends.len(),
            resources = resources.len(),
            data_sources = data_sources.len(),
            prepare_config_backend = prepare_config_backend.as_ref().map(|b| b.name()),
            "Mux server ready"
        );

        Self {
            schema,
            backends,
            resources,
            data_sources,
            prepare_config_backend,
        }
    }

    /// The merged schema this server answers GetProviderSchema with
    pub fn schema(&self) -> &MergedSchema {
        &self.schema
    }

    /// Names of the backends in declaration order
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Name of the backend serving a resource type
    pub fn resource_owner(&self, type_name: &str) -> Option<&str> {
        self.resources.get(type_name).map(|b| b.name())
    }

    /// Name of the backend serving a data source type
    pub fn data_source_owner(&self, type_name: &str) -> Option<&str> {
        self.data_sources.get(type_name).map(|b| b.name())
    }

    /// Look up the backend that owns `type_name`
    fn route(
        &self,
        rpc: Rpc,
        kind: TypeKind,
        type_name: &str,
    ) -> BackendResult<&Arc<dyn ProviderBackend>> {
        let table = match kind {
            TypeKind::Resource => &self.resources,
            TypeKind::DataSource => &self.data_sources,
        };
        match table.get(type_name) {
            Some(backend) => {
                debug!(rpc = %rpc, type_name, mux_provider = backend.name(), "Routing request");
                Ok(backend)
            }
            None => {
                warn!(rpc = %rpc, type_name, "No backend serves {}", kind);
                Err(BackendError::UnsupportedType {
                    kind,
                    type_name: type_name.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ProviderBackend for MuxServer {
    async fn get_provider_schema(
        &self,
        _req: &GetProviderSchemaRequest,
    ) -> BackendResult<GetProviderSchemaResponse> {
        Ok(self.schema.to_response())
    }

    async fn prepare_provider_config(
        &self,
        req: &PrepareProviderConfigRequest,
    ) -> BackendResult<PrepareProviderConfigResponse> {
        let backend = self
            .prepare_config_backend
            .as_ref()
            .ok_or(BackendError::NoProviderSchemaOwner)?;
        debug!(
            rpc = %Rpc::PrepareProviderConfig,
            mux_provider = backend.name(),
            "Routing request"
        );
        backend.prepare_provider_config(req).await
    }

    /// Configure every backend in order with the same request.
    ///
    /// A call-level failure aborts at once. The first error-severity
    /// diagnostic also stops the fan-out: the response carries every
    /// diagnostic collected up to and including it, and later backends are
    /// never called.
    async fn configure_provider(
        &self,
        req: &ConfigureProviderRequest,
    ) -> BackendResult<ConfigureProviderResponse> {
        let mut diagnostics = Vec::new();

        for backend in &self.backends {
            debug!(rpc = %Rpc::ConfigureProvider, mux_provider = backend.name(), "Configuring backend");
            let mut resp = backend
                .configure_provider(req)
                .await
                .map_err(|e| BackendError::fanout(Rpc::ConfigureProvider, backend.name(), e))?;

            for diag in std::mem::take(&mut resp.diagnostics) {
                let fatal = diag.is_error();
                diagnostics.push(diag);
                if fatal {
                    warn!(
                        mux_provider = backend.name(),
                        "Backend reported an error while configuring, skipping remaining backends"
                    );
                    resp.diagnostics = diagnostics;
                    return Ok(resp);
                }
            }
        }

        Ok(ConfigureProviderResponse { diagnostics })
    }

    /// Stop every backend in order.
    ///
    /// Error strings in responses do not stop the fan-out; they are joined,
    /// one per line, into the returned response. A call-level failure does
    /// abort, and the remaining backends are not stopped.
    async fn stop_provider(&self, req: &StopProviderRequest) -> BackendResult<StopProviderResponse> {
        let mut errors = Vec::new();

        for backend in &self.backends {
            debug!(rpc = %Rpc::StopProvider, mux_provider = backend.name(), "Stopping backend");
            let resp = backend
                .stop_provider(req)
                .await
                .map_err(|e| BackendError::fanout(Rpc::StopProvider, backend.name(), e))?;

            if !resp.error.is_empty() {
                warn!(mux_provider = backend.name(), error = %resp.error, "Backend reported a stop error");
                errors.push(resp.error);
            }
        }

        Ok(StopProviderResponse {
            error: errors.join("\n"),
        })
    }

    async fn validate_resource_type_config(
        &self,
        req: &ValidateResourceTypeConfigRequest,
    ) -> BackendResult<ValidateResourceTypeConfigResponse> {
        self.route(Rpc::ValidateResourceTypeConfig, TypeKind::Resource, &req.type_name)?
            .validate_resource_type_config(req)
            .await
    }

    async fn upgrade_resource_state(
        &self,
        req: &UpgradeResourceStateRequest,
    ) -> BackendResult<UpgradeResourceStateResponse> {
        self.route(Rpc::UpgradeResourceState, TypeKind::Resource, &req.type_name)?
            .upgrade_resource_state(req)
            .await
    }

    async fn read_resource(&self, req: &ReadResourceRequest) -> BackendResult<ReadResourceResponse> {
        self.route(Rpc::ReadResource, TypeKind::Resource, &req.type_name)?
            .read_resource(req)
            .await
    }

    async fn plan_resource_change(
        &self,
        req: &PlanResourceChangeRequest,
    ) -> BackendResult<PlanResourceChangeResponse> {
        self.route(Rpc::PlanResourceChange, TypeKind::Resource, &req.type_name)?
            .plan_resource_change(req)
            .await
    }

    async fn apply_resource_change(
        &self,
        req: &ApplyResourceChangeRequest,
    ) -> BackendResult<ApplyResourceChangeResponse> {
        self.route(Rpc::ApplyResourceChange, TypeKind::Resource, &req.type_name)?
            .apply_resource_change(req)
            .await
    }

    async fn import_resource_state(
        &self,
        req: &ImportResourceStateRequest,
    ) -> BackendResult<ImportResourceStateResponse> {
        self.route(Rpc::ImportResourceState, TypeKind::Resource, &req.type_name)?
            .import_resource_state(req)
            .await
    }

    async fn validate_data_source_config(
        &self,
        req: &ValidateDataSourceConfigRequest,
    ) -> BackendResult<ValidateDataSourceConfigResponse> {
        self.route(Rpc::ValidateDataSourceConfig, TypeKind::DataSource, &req.type_name)?
            .validate_data_source_config(req)
            .await
    }

    async fn read_data_source(
        &self,
        req: &ReadDataSourceRequest,
    ) -> BackendResult<ReadDataSourceResponse> {
        self.route(Rpc::ReadDataSource, TypeKind::DataSource, &req.type_name)?
            .read_data_source(req)
            .await
    }
}

#[cfg(test)]
mod tests {
    use pmux_core::Diagnostic;
    use pmux_testserver::TestServer;

    use super::*;

    #[tokio::test]
    async fn configure_keeps_diagnostics_after_warnings() {
        let a = TestServer::builder("a")
            .configure_diagnostic(Diagnostic::warning("a-warn", ""))
            .build();
        let b = TestServer::builder("b")
            .configure_diagnostic(Diagnostic::error("b-err", ""))
            .configure_diagnostic(Diagnostic::warning("b-after", ""))
            .build();
        let mux = MuxServer::new(vec![a.factory(), b.factory()]).await.unwrap();

        let resp = mux
            .configure_provider(&ConfigureProviderRequest::default())
            .await
            .unwrap();

        // diagnostics after the error on the same backend are dropped
        let summaries: Vec<&str> = resp.diagnostics.iter().map(|d| d.summary.as_str()).collect();
        assert_eq!(summaries, vec!["a-warn", "b-err"]);
    }

    #[tokio::test]
    async fn empty_backend_set_serves_empty_schema() {
        let mux = MuxServer::new(Vec::new()).await.unwrap();

        let schema = mux
            .get_provider_schema(&GetProviderSchemaRequest::default())
            .await
            .unwrap();
        assert_eq!(schema, GetProviderSchemaResponse::default());

        let stop = mux.stop_provider(&StopProviderRequest::default()).await.unwrap();
        assert!(stop.error.is_empty());
        assert!(matches!(
            mux.prepare_provider_config(&PrepareProviderConfigRequest::default())
                .await,
            Err(BackendError::NoProviderSchemaOwner)
        ));
    }

    #[tokio::test]
    async fn introspection_reports_owners() {
        let a = TestServer::builder("a").resource("test_vpc").build();
        let b = TestServer::builder("b").data_source("test_ami").build();
        let mux = MuxServer::new(vec![a.factory(), b.factory()]).await.unwrap();

        assert_eq!(mux.backend_names(), vec!["a", "b"]);
        assert_eq!(mux.resource_owner("test_vpc"), Some("a"));
        assert_eq!(mux.resource_owner("test_ami"), None);
        assert_eq!(mux.data_source_owner("test_ami"), Some("b"));
    }
}
