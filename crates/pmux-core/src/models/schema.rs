//! Schema models for providers, resources and data sources

use serde::{Deserialize, Serialize};

/// Schema of a provider, provider_meta block, resource or data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema version, used for resource state upgrades
    #[serde(default)]
    pub version: i64,
    /// Top-level block
    #[serde(default)]
    pub block: SchemaBlock,
}

impl Schema {
    /// Schema at the given version with the given top-level block
    pub fn new(version: i64, block: SchemaBlock) -> Self {
        Self { version, block }
    }
}

/// Format of description strings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringKind {
    #[default]
    Plain,
    Markdown,
}

/// A configuration block: attributes plus nested blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaBlock {
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<SchemaAttribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_types: Vec<SchemaNestedBlock>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub description_kind: StringKind,
    #[serde(default)]
    pub deprecated: bool,
}

impl SchemaBlock {
    /// Builder-style attribute append
    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A single attribute in a block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaAttribute {
    pub name: String,
    /// Type constraint in its JSON form, e.g. `"string"` or `["list","string"]`
    #[serde(rename = "type")]
    pub attribute_type: serde_json::Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub description_kind: StringKind,
    #[serde(default)]
    pub deprecated: bool,
}

impl SchemaAttribute {
    /// Required attribute of the given type
    pub fn required(name: impl Into<String>, attribute_type: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            required: true,
            ..Default::default()
        }
    }

    /// Optional attribute of the given type
    pub fn optional(name: impl Into<String>, attribute_type: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            optional: true,
            ..Default::default()
        }
    }

    /// Computed attribute of the given type
    pub fn computed(name: impl Into<String>, attribute_type: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            attribute_type,
            computed: true,
            ..Default::default()
        }
    }
}

/// How a nested block may repeat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    #[default]
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

/// A block nested inside another block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaNestedBlock {
    pub type_name: String,
    pub block: SchemaBlock,
    pub nesting: NestingMode,
    #[serde(default)]
    pub min_items: i64,
    #[serde(default)]
    pub max_items: i64,
}
