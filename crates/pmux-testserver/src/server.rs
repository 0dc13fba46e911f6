//! TestServer - a recording provider backend

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pmux_core::{
    ApplyResourceChangeRequest, ApplyResourceChangeResponse, BackendError, BackendFactory,
    BackendResult, ConfigureProviderRequest, ConfigureProviderResponse, Diagnostic,
    DynamicValue, GetProviderSchemaRequest, GetProviderSchemaResponse, ImportResourceStateRequest,
    ImportResourceStateResponse, ImportedResource, PlanResourceChangeRequest,
    PlanResourceChangeResponse, PrepareProviderConfigRequest, PrepareProviderConfigResponse,
    ProviderBackend, ReadDataSourceRequest, ReadDataSourceResponse, ReadResourceRequest,
    ReadResourceResponse, Rpc, Schema, StopProviderRequest, StopProviderResponse, TypeKind,
    UpgradeResourceStateRequest, UpgradeResourceStateResponse, ValidateDataSourceConfigRequest,
    ValidateDataSourceConfigResponse, ValidateResourceTypeConfigRequest,
    ValidateResourceTypeConfigResponse,
};
use tracing::trace;

/// A single recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Name of the server that received the call
    pub server: String,
    pub rpc: Rpc,
    /// Type name for resource and data source RPCs
    pub type_name: Option<String>,
}

/// Call log shared between several servers, for asserting cross-server order
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    /// Snapshot of every call in arrival order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Names of the servers that received `rpc`, in arrival order
    pub fn servers_called(&self, rpc: Rpc) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.rpc == rpc)
            .map(|c| c.server.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// In-memory provider backend.
///
/// Type-keyed RPCs answer with a single warning diagnostic naming the server
/// and RPC, so callers can tell which backend produced a response. Requests
/// for types the server did not declare get an error diagnostic instead.
pub struct TestServer {
    name: String,
    schema: GetProviderSchemaResponse,
    schema_failure: Option<String>,
    configure_diagnostics: Vec<Diagnostic>,
    configure_failure: Option<String>,
    stop_error: String,
    stop_failure: Option<String>,
    calls: Mutex<Vec<Call>>,
    journal: Option<CallJournal>,
}

impl TestServer {
    /// Start building a server with the given name
    pub fn builder(name: impl Into<String>) -> TestServerBuilder {
        TestServerBuilder::new(name)
    }

    /// Factory that hands out this same instance on every call
    pub fn factory(self: &Arc<Self>) -> BackendFactory {
        let server = Arc::clone(self);
        Arc::new(move || Arc::clone(&server) as Arc<dyn ProviderBackend>)
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of times `rpc` was received
    pub fn call_count(&self, rpc: Rpc) -> usize {
        self.calls.lock().iter().filter(|c| c.rpc == rpc).count()
    }

    /// Whether `rpc` was received for `type_name`
    pub fn was_called(&self, rpc: Rpc, type_name: &str) -> bool {
        self.calls
            .lock()
            .iter()
            .any(|c| c.rpc == rpc && c.type_name.as_deref() == Some(type_name))
    }

    /// The warning a type-keyed RPC answers with
    pub fn handled_diagnostic(&self, rpc: Rpc, type_name: &str) -> Diagnostic {
        Diagnostic::warning(format!("{} handled {}", self.name, rpc), type_name)
    }

    fn record(&self, rpc: Rpc, type_name: Option<&str>) {
        trace!(server = %self.name, rpc = %rpc, type_name = ?type_name, "test server call");
        let call = Call {
            server: self.name.clone(),
            rpc,
            type_name: type_name.map(str::to_string),
        };
        if let Some(journal) = &self.journal {
            journal.record(call.clone());
        }
        self.calls.lock().push(call);
    }

    fn declares(&self, kind: TypeKind, type_name: &str) -> bool {
        match kind {
            TypeKind::Resource => self.schema.resource_schemas.contains_key(type_name),
            TypeKind::DataSource => self.schema.data_source_schemas.contains_key(type_name),
        }
    }

    /// Record a type-keyed call and produce its diagnostics
    fn handle_typed(&self, rpc: Rpc, kind: TypeKind, type_name: &str) -> Vec<Diagnostic> {
        self.record(rpc, Some(type_name));
        if self.declares(kind, type_name) {
            vec![self.handled_diagnostic(rpc, type_name)]
        } else {
            vec![Diagnostic::error(
                format!("Unknown {}", kind),
                format!("{} does not serve {:?}", self.name, type_name),
            )]
        }
    }
}

#[async_trait]
impl ProviderBackend for TestServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_provider_schema(
        &self,
        _req: &GetProviderSchemaRequest,
    ) -> BackendResult<GetProviderSchemaResponse> {
        self.record(Rpc::GetProviderSchema, None);
        match &self.schema_failure {
            Some(msg) => Err(BackendError::Transport(msg.clone())),
            None => Ok(self.schema.clone()),
        }
    }

    async fn prepare_provider_config(
        &self,
        req: &PrepareProviderConfigRequest,
    ) -> BackendResult<PrepareProviderConfigResponse> {
        self.record(Rpc::PrepareProviderConfig, None);
        Ok(PrepareProviderConfigResponse {
            prepared_config: req.config.clone(),
            diagnostics: Vec::new(),
        })
    }

    async fn configure_provider(
        &self,
        _req: &ConfigureProviderRequest,
    ) -> BackendResult<ConfigureProviderResponse> {
        self.record(Rpc::ConfigureProvider, None);
        match &self.configure_failure {
            Some(msg) => Err(BackendError::Transport(msg.clone())),
            None => Ok(ConfigureProviderResponse {
                diagnostics: self.configure_diagnostics.clone(),
            }),
        }
    }

    async fn stop_provider(
        &self,
        _req: &StopProviderRequest,
    ) -> BackendResult<StopProviderResponse> {
        self.record(Rpc::StopProvider, None);
        match &self.stop_failure {
            Some(msg) => Err(BackendError::Transport(msg.clone())),
            None => Ok(StopProviderResponse {
                error: self.stop_error.clone(),
            }),
        }
    }

    async fn validate_resource_type_config(
        &self,
        req: &ValidateResourceTypeConfigRequest,
    ) -> BackendResult<ValidateResourceTypeConfigResponse> {
        let diagnostics =
            self.handle_typed(Rpc::ValidateResourceTypeConfig, TypeKind::Resource, &req.type_name);
        Ok(ValidateResourceTypeConfigResponse { diagnostics })
    }

    async fn upgrade_resource_state(
        &self,
        req: &UpgradeResourceStateRequest,
    ) -> BackendResult<UpgradeResourceStateResponse> {
        let diagnostics =
            self.handle_typed(Rpc::UpgradeResourceState, TypeKind::Resource, &req.type_name);
        let upgraded_state = req
            .raw_state
            .as_ref()
            .and_then(|raw| raw.json.clone())
            .map(DynamicValue::from_json);
        Ok(UpgradeResourceStateResponse {
            upgraded_state,
            diagnostics,
        })
    }

    async fn read_resource(&self, req: &ReadResourceRequest) -> BackendResult<ReadResourceResponse> {
        let diagnostics = self.handle_typed(Rpc::ReadResource, TypeKind::Resource, &req.type_name);
        Ok(ReadResourceResponse {
            new_state: req.current_state.clone(),
            diagnostics,
            private: req.private.clone(),
        })
    }

    async fn plan_resource_change(
        &self,
        req: &PlanResourceChangeRequest,
    ) -> BackendResult<PlanResourceChangeResponse> {
        let diagnostics =
            self.handle_typed(Rpc::PlanResourceChange, TypeKind::Resource, &req.type_name);
        Ok(PlanResourceChangeResponse {
            planned_state: req.proposed_new_state.clone(),
            planned_private: req.prior_private.clone(),
            diagnostics,
            ..Default::default()
        })
    }

    async fn apply_resource_change(
        &self,
        req: &ApplyResourceChangeRequest,
    ) -> BackendResult<ApplyResourceChangeResponse> {
        let diagnostics =
            self.handle_typed(Rpc::ApplyResourceChange, TypeKind::Resource, &req.type_name);
        Ok(ApplyResourceChangeResponse {
            new_state: req.planned_state.clone(),
            private: req.planned_private.clone(),
            diagnostics,
            ..Default::default()
        })
    }

    async fn import_resource_state(
        &self,
        req: &ImportResourceStateRequest,
    ) -> BackendResult<ImportResourceStateResponse> {
        let diagnostics =
            self.handle_typed(Rpc::ImportResourceState, TypeKind::Resource, &req.type_name);
        let state = serde_json::to_vec(&serde_json::json!({ "id": req.id }))
            .map_err(|e| BackendError::Internal(e.to_string()))?;
        Ok(ImportResourceStateResponse {
            imported_resources: vec![ImportedResource {
                type_name: req.type_name.clone(),
                state: Some(DynamicValue::from_json(state)),
                private: Vec::new(),
            }],
            diagnostics,
        })
    }

    async fn validate_data_source_config(
        &self,
        req: &ValidateDataSourceConfigRequest,
    ) -> BackendResult<ValidateDataSourceConfigResponse> {
        let diagnostics = self.handle_typed(
            Rpc::ValidateDataSourceConfig,
            TypeKind::DataSource,
            &req.type_name,
        );
        Ok(ValidateDataSourceConfigResponse { diagnostics })
    }

    async fn read_data_source(
        &self,
        req: &ReadDataSourceRequest,
    ) -> BackendResult<ReadDataSourceResponse> {
        let diagnostics =
            self.handle_typed(Rpc::ReadDataSource, TypeKind::DataSource, &req.type_name);
        Ok(ReadDataSourceResponse {
            state: req.config.clone(),
            diagnostics,
        })
    }
}

/// Builder for [`TestServer`]
pub struct TestServerBuilder {
    name: String,
    schema: GetProviderSchemaResponse,
    schema_failure: Option<String>,
    configure_diagnostics: Vec<Diagnostic>,
    configure_failure: Option<String>,
    stop_error: String,
    stop_failure: Option<String>,
    journal: Option<CallJournal>,
}

impl TestServerBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: GetProviderSchemaResponse::default(),
            schema_failure: None,
            configure_diagnostics: Vec::new(),
            configure_failure: None,
            stop_error: String::new(),
            stop_failure: None,
            journal: None,
        }
    }

    /// Declare an empty provider schema
    pub fn provider_schema(self) -> Self {
        self.provider_schema_with(Schema::default())
    }

    pub fn provider_schema_with(mut self, schema: Schema) -> Self {
        self.schema.provider = Some(schema);
        self
    }

    /// Declare an empty provider_meta schema
    pub fn provider_meta_schema(self) -> Self {
        self.provider_meta_schema_with(Schema::default())
    }

    pub fn provider_meta_schema_with(mut self, schema: Schema) -> Self {
        self.schema.provider_meta = Some(schema);
        self
    }

    /// Declare a resource type with an empty schema
    pub fn resource(self, type_name: impl Into<String>) -> Self {
        self.resource_with(type_name, Schema::default())
    }

    pub fn resource_with(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.schema.resource_schemas.insert(type_name.into(), schema);
        self
    }

    /// Declare a data source type with an empty schema
    pub fn data_source(self, type_name: impl Into<String>) -> Self {
        self.data_source_with(type_name, Schema::default())
    }

    pub fn data_source_with(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        self.schema.data_source_schemas.insert(type_name.into(), schema);
        self
    }

    /// Diagnostic returned alongside the schema
    pub fn schema_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.schema.diagnostics.push(diagnostic);
        self
    }

    /// Make GetProviderSchema fail at the call level
    pub fn fail_schema(mut self, message: impl Into<String>) -> Self {
        self.schema_failure = Some(message.into());
        self
    }

    /// Diagnostic returned from ConfigureProvider
    pub fn configure_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.configure_diagnostics.push(diagnostic);
        self
    }

    /// Make ConfigureProvider fail at the call level
    pub fn fail_configure(mut self, message: impl Into<String>) -> Self {
        self.configure_failure = Some(message.into());
        self
    }

    /// Error string reported in the StopProvider response
    pub fn stop_error(mut self, message: impl Into<String>) -> Self {
        self.stop_error = message.into();
        self
    }

    /// Make StopProvider fail at the call level
    pub fn fail_stop(mut self, message: impl Into<String>) -> Self {
        self.stop_failure = Some(message.into());
        self
    }

    /// Also record calls into a shared journal
    pub fn journal(mut self, journal: &CallJournal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn build(self) -> Arc<TestServer> {
        Arc::new(TestServer {
            name: self.name,
            schema: self.schema,
            schema_failure: self.schema_failure,
            configure_diagnostics: self.configure_diagnostics,
            configure_failure: self.configure_failure,
            stop_error: self.stop_error,
            stop_failure: self.stop_failure,
            calls: Mutex::new(Vec::new()),
            journal: self.journal,
        })
    }
}
