//! TOML configuration for pmux-inspect
//!
//! ```toml
//! [[backends]]
//! name = "network"
//! provider_schema = true
//! resources = ["example_vpc"]
//!
//! [[backends]]
//! name = "compute"
//! resources = ["example_instance"]
//! data_sources = ["example_ami"]
//! ```
//!
//! Backends are muxed in the order they appear in the file.

use std::path::Path;

use anyhow::Context;
use pmux_testserver::TestServerConfig;
use serde::Deserialize;

/// Top-level inspect configuration
#[derive(Debug, Deserialize, Default)]
pub struct InspectConfig {
    /// Backends in declaration order
    #[serde(default)]
    pub backends: Vec<TestServerConfig>,
}

impl InspectConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        for backend in &config.backends {
            backend.validate()?;
        }
        Ok(config)
    }
}
