//! ProviderBackend trait - the core abstraction for provider servers

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::models::{
    ApplyResourceChangeRequest, ApplyResourceChangeResponse, ConfigureProviderRequest,
    ConfigureProviderResponse, GetProviderSchemaRequest, GetProviderSchemaResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, PlanResourceChangeRequest,
    PlanResourceChangeResponse, PrepareProviderConfigRequest, PrepareProviderConfigResponse,
    ReadDataSourceRequest, ReadDataSourceResponse, ReadResourceRequest, ReadResourceResponse,
    StopProviderRequest, StopProviderResponse, UpgradeResourceStateRequest,
    UpgradeResourceStateResponse, ValidateDataSourceConfigRequest,
    ValidateDataSourceConfigResponse, ValidateResourceTypeConfigRequest,
    ValidateResourceTypeConfigResponse,
};

/// Constructor for a backend instance.
///
/// The mux calls each factory twice: once while aggregating schemas and once
/// when building the serving instance. Factories may return a shared instance.
pub type BackendFactory = Arc<dyn Fn() -> Arc<dyn ProviderBackend> + Send + Sync>;

/// The trait every provider server implements.
///
/// The same contract is served by:
/// - leaf backends that implement resources and data sources
/// - `MuxServer`, which routes each call to one or more leaf backends
///
/// An `Err` return is a call-level failure (the backend could not answer).
/// Problems with the request itself are reported as diagnostics in an `Ok`
/// response.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    /// Name used to identify this backend in errors and logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    // =========================================================================
    // Provider
    // =========================================================================

    /// Return the provider, provider_meta, resource and data source schemas
    async fn get_provider_schema(
        &self,
        req: &GetProviderSchemaRequest,
    ) -> BackendResult<GetProviderSchemaResponse>;

    /// Validate and fill in defaults for the provider configuration
    async fn prepare_provider_config(
        &self,
        req: &PrepareProviderConfigRequest,
    ) -> BackendResult<PrepareProviderConfigResponse>;

    /// Configure the provider with the user-supplied configuration
    async fn configure_provider(
        &self,
        req: &ConfigureProviderRequest,
    ) -> BackendResult<ConfigureProviderResponse>;

    /// Ask the provider to stop in-flight work and shut down
    async fn stop_provider(&self, req: &StopProviderRequest)
        -> BackendResult<StopProviderResponse>;

    // =========================================================================
    // Resources
    // =========================================================================

    async fn validate_resource_type_config(
        &self,
        req: &ValidateResourceTypeConfigRequest,
    ) -> BackendResult<ValidateResourceTypeConfigResponse>;

    /// Upgrade stored state written by an older schema version
    async fn upgrade_resource_state(
        &self,
        req: &UpgradeResourceStateRequest,
    ) -> BackendResult<UpgradeResourceStateResponse>;

    async fn read_resource(&self, req: &ReadResourceRequest)
        -> BackendResult<ReadResourceResponse>;

    async fn plan_resource_change(
        &self,
        req: &PlanResourceChangeRequest,
    ) -> BackendResult<PlanResourceChangeResponse>;

    async fn apply_resource_change(
        &self,
        req: &ApplyResourceChangeRequest,
    ) -> BackendResult<ApplyResourceChangeResponse>;

    async fn import_resource_state(
        &self,
        req: &ImportResourceStateRequest,
    ) -> BackendResult<ImportResourceStateResponse>;

    // =========================================================================
    // Data Sources
    // =========================================================================

    async fn validate_data_source_config(
        &self,
        req: &ValidateDataSourceConfigRequest,
    ) -> BackendResult<ValidateDataSourceConfigResponse>;

    async fn read_data_source(
        &self,
        req: &ReadDataSourceRequest,
    ) -> BackendResult<ReadDataSourceResponse>;
}
