//! Managed resource RPC models

use serde::{Deserialize, Serialize};

use super::{AttributePath, Diagnostic, DynamicValue, RawState};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateResourceTypeConfigRequest {
    pub type_name: String,
    pub config: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateResourceTypeConfigResponse {
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeResourceStateRequest {
    pub type_name: String,
    /// Schema version the raw state was written with
    pub version: i64,
    pub raw_state: Option<RawState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpgradeResourceStateResponse {
    pub upgraded_state: Option<DynamicValue>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: Option<DynamicValue>,
    #[serde(default)]
    pub private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadResourceResponse {
    pub new_state: Option<DynamicValue>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub private: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResourceChangeRequest {
    pub type_name: String,
    pub prior_state: Option<DynamicValue>,
    pub proposed_new_state: Option<DynamicValue>,
    pub config: Option<DynamicValue>,
    #[serde(default)]
    pub prior_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResourceChangeResponse {
    pub planned_state: Option<DynamicValue>,
    /// Attributes whose change forces replacement of the resource
    #[serde(default)]
    pub requires_replace: Vec<AttributePath>,
    #[serde(default)]
    pub planned_private: Vec<u8>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub unsafe_to_use_legacy_type_system: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyResourceChangeRequest {
    pub type_name: String,
    pub prior_state: Option<DynamicValue>,
    pub planned_state: Option<DynamicValue>,
    pub config: Option<DynamicValue>,
    #[serde(default)]
    pub planned_private: Vec<u8>,
    pub provider_meta: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyResourceChangeResponse {
    pub new_state: Option<DynamicValue>,
    #[serde(default)]
    pub private: Vec<u8>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub unsafe_to_use_legacy_type_system: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResourceStateRequest {
    pub type_name: String,
    /// Caller-supplied import identifier
    pub id: String,
}

/// One resource produced by an import; a single import may yield several
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    pub type_name: String,
    pub state: Option<DynamicValue>,
    #[serde(default)]
    pub private: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResourceStateResponse {
    #[serde(default)]
    pub imported_resources: Vec<ImportedResource>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}
