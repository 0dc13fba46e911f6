//! TOML configuration for test servers
//!
//! ```toml
//! name = "network"
//! provider_schema = true
//! resources = ["example_vpc", "example_subnet"]
//! data_sources = ["example_ami"]
//! schema_warnings = ["example_subnet is deprecated"]
//! ```
//!
//! Every declared type gets a small schema with a computed `id` attribute.

use std::sync::Arc;

use pmux_core::{Diagnostic, Schema, SchemaAttribute, SchemaBlock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::TestServer;

/// Errors loading a test server configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse test server config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid test server config: {0}")]
    Invalid(String),
}

/// Declarative description of one [`TestServer`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestServerConfig {
    /// Server name, used in errors and logs
    pub name: String,
    /// Declare a provider schema
    #[serde(default)]
    pub provider_schema: bool,
    /// Declare a provider_meta schema
    #[serde(default)]
    pub provider_meta_schema: bool,
    /// Resource type names served
    #[serde(default)]
    pub resources: Vec<String>,
    /// Data source type names served
    #[serde(default)]
    pub data_sources: Vec<String>,
    /// Warnings returned with the schema
    #[serde(default)]
    pub schema_warnings: Vec<String>,
    /// Warnings returned from ConfigureProvider
    #[serde(default)]
    pub configure_warnings: Vec<String>,
    /// Error string reported by StopProvider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_error: Option<String>,
}

impl TestServerConfig {
    /// Parse and validate a single server table
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs a server cannot be built from.
    ///
    /// Types declared twice by different servers are not checked here; that
    /// is the mux's job.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("server name must not be empty".to_string()));
        }
        if let Some(dup) = first_duplicate(&self.resources) {
            return Err(ConfigError::Invalid(format!(
                "{}: resource {:?} listed twice",
                self.name, dup
            )));
        }
        if let Some(dup) = first_duplicate(&self.data_sources) {
            return Err(ConfigError::Invalid(format!(
                "{}: data source {:?} listed twice",
                self.name, dup
            )));
        }
        Ok(())
    }

    /// Build the server this config describes
    pub fn build(&self) -> Arc<TestServer> {
        let mut builder = TestServer::builder(&self.name);
        if self.provider_schema {
            builder = builder.provider_schema_with(block_schema(&format!(
                "Provider configuration for {}",
                self.name
            )));
        }
        if self.provider_meta_schema {
            builder = builder.provider_meta_schema_with(Schema::default());
        }
        for resource in &self.resources {
            builder = builder.resource_with(resource, typed_schema(resource));
        }
        for data_source in &self.data_sources {
            builder = builder.data_source_with(data_source, typed_schema(data_source));
        }
        for warning in &self.schema_warnings {
            builder = builder.schema_diagnostic(Diagnostic::warning(warning, ""));
        }
        for warning in &self.configure_warnings {
            builder = builder.configure_diagnostic(Diagnostic::warning(warning, ""));
        }
        if let Some(err) = &self.stop_error {
            builder = builder.stop_error(err);
        }
        builder.build()
    }
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    names
        .iter()
        .enumerate()
        .find(|(i, name)| names[..*i].contains(*name))
        .map(|(_, name)| name.as_str())
}

fn block_schema(description: &str) -> Schema {
    Schema::new(
        0,
        SchemaBlock {
            description: description.to_string(),
            ..Default::default()
        },
    )
}

fn typed_schema(type_name: &str) -> Schema {
    let block = SchemaBlock {
        description: format!("Schema for {}", type_name),
        ..Default::default()
    }
    .with_attribute(SchemaAttribute::computed("id", serde_json::json!("string")));
    Schema::new(0, block)
}
