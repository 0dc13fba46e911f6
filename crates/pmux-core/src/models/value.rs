//! Opaque encoded values passed through the mux untouched

use serde::{Deserialize, Serialize};

/// A value encoded by the caller against a schema.
///
/// The mux never decodes these; exactly one encoding is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgpack: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Vec<u8>>,
}

impl DynamicValue {
    pub fn from_msgpack(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            msgpack: Some(bytes.into()),
            json: None,
        }
    }

    pub fn from_json(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            msgpack: None,
            json: Some(bytes.into()),
        }
    }

    /// Neither encoding is set
    pub fn is_empty(&self) -> bool {
        self.msgpack.is_none() && self.json.is_none()
    }
}

/// Previously stored resource state in a possibly outdated schema version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Vec<u8>>,
    /// Legacy flatmap representation
    #[serde(default, skip_serializing_if = "std::collections::HashMap::is_empty")]
    pub flatmap: std::collections::HashMap<String, String>,
}
