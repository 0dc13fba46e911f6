//! Provider-wide RPC models (schema, config, configure, stop)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Diagnostic, DynamicValue, Schema};

/// Request for a backend's schemas. Carries no fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetProviderSchemaRequest {}

/// Every schema a backend serves, keyed by type name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetProviderSchemaResponse {
    /// Schema of the provider configuration block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Schema>,
    /// Schema of the provider_meta block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_meta: Option<Schema>,
    #[serde(default)]
    pub resource_schemas: BTreeMap<String, Schema>,
    #[serde(default)]
    pub data_source_schemas: BTreeMap<String, Schema>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareProviderConfigRequest {
    pub config: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareProviderConfigResponse {
    pub prepared_config: Option<DynamicValue>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureProviderRequest {
    /// Version of the calling core
    #[serde(default)]
    pub terraform_version: String,
    pub config: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureProviderResponse {
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopProviderRequest {}

/// Result of a stop request. An empty `error` means the stop succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopProviderResponse {
    #[serde(default)]
    pub error: String,
}
