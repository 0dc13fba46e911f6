//! RPC identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every RPC a provider backend serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rpc {
    GetProviderSchema,
    PrepareProviderConfig,
    ValidateResourceTypeConfig,
    ValidateDataSourceConfig,
    UpgradeResourceState,
    ConfigureProvider,
    ReadResource,
    PlanResourceChange,
    ApplyResourceChange,
    ImportResourceState,
    ReadDataSource,
    StopProvider,
}

impl Rpc {
    /// All RPCs in protocol order
    pub const ALL: [Rpc; 12] = [
        Rpc::GetProviderSchema,
        Rpc::PrepareProviderConfig,
        Rpc::ValidateResourceTypeConfig,
        Rpc::ValidateDataSourceConfig,
        Rpc::UpgradeResourceState,
        Rpc::ConfigureProvider,
        Rpc::ReadResource,
        Rpc::PlanResourceChange,
        Rpc::ApplyResourceChange,
        Rpc::ImportResourceState,
        Rpc::ReadDataSource,
        Rpc::StopProvider,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rpc::GetProviderSchema => "GetProviderSchema",
            Rpc::PrepareProviderConfig => "PrepareProviderConfig",
            Rpc::ValidateResourceTypeConfig => "ValidateResourceTypeConfig",
            Rpc::ValidateDataSourceConfig => "ValidateDataSourceConfig",
            Rpc::UpgradeResourceState => "UpgradeResourceState",
            Rpc::ConfigureProvider => "ConfigureProvider",
            Rpc::ReadResource => "ReadResource",
            Rpc::PlanResourceChange => "PlanResourceChange",
            Rpc::ApplyResourceChange => "ApplyResourceChange",
            Rpc::ImportResourceState => "ImportResourceState",
            Rpc::ReadDataSource => "ReadDataSource",
            Rpc::StopProvider => "StopProvider",
        }
    }
}

impl fmt::Display for Rpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rpc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rpc::ALL
            .iter()
            .copied()
            .find(|rpc| rpc.as_str() == s)
            .ok_or_else(|| format!("Unknown RPC: '{}'", s))
    }
}
