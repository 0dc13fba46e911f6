//! Data source RPC models

use serde::{Deserialize, Serialize};

use super::{Diagnostic, DynamicValue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateDataSourceConfigRequest {
    pub type_name: String,
    pub config: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateDataSourceConfigResponse {
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadDataSourceRequest {
    pub type_name: String,
    pub config: Option<DynamicValue>,
    pub provider_meta: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadDataSourceResponse {
    pub state: Option<DynamicValue>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}
