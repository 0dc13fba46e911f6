//! pmux-inspect - Aggregate test backends and report the mux's view of them
//!
//! Builds one `TestServer` per `[[backends]]` entry of the config file, runs
//! schema aggregation over them, and prints the routing decisions and the
//! merged schema as JSON. Aggregation failures (duplicate types, duplicate
//! provider schemas, ...) are reported as errors.
//!
//! Usage:
//!   pmux-inspect --config backends.toml [--pretty] [--exercise]

mod config;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pmux_core::{
    ConfigureProviderRequest, GetProviderSchemaRequest, ProviderBackend, StopProviderRequest,
};
use pmux_server::{aggregate, BackendFactory, MuxServer};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::InspectConfig;

#[derive(Parser, Debug)]
#[command(name = "pmux-inspect")]
#[command(about = "Aggregate provider backends and print the merged schema and routing")]
struct Args {
    /// Backend configuration file (TOML format)
    #[arg(short, long)]
    config: PathBuf,

    /// Pretty-print the JSON report
    #[arg(short, long)]
    pretty: bool,

    /// Also run ConfigureProvider and StopProvider through the mux
    #[arg(long)]
    exercise: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pmux_inspect=info,pmux_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    tracing::info!("Loading config from: {}", args.config.display());
    let config = InspectConfig::load(&args.config)?;

    let factories: Vec<BackendFactory> = config
        .backends
        .iter()
        .map(|backend| backend.build().factory())
        .collect();

    let aggregation = aggregate(factories)
        .await
        .context("Backends cannot be muxed")?;
    let mux = aggregation.server();

    if args.exercise {
        exercise(&mux).await?;
    }

    let report = report(&mux).await?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", rendered);

    Ok(())
}

/// Build the JSON report of backends, routing and merged schema
async fn report(mux: &MuxServer) -> anyhow::Result<serde_json::Value> {
    let schema = mux
        .get_provider_schema(&GetProviderSchemaRequest::default())
        .await?;

    let resources: BTreeMap<&str, Option<&str>> = schema
        .resource_schemas
        .keys()
        .map(|name| (name.as_str(), mux.resource_owner(name)))
        .collect();
    let data_sources: BTreeMap<&str, Option<&str>> = schema
        .data_source_schemas
        .keys()
        .map(|name| (name.as_str(), mux.data_source_owner(name)))
        .collect();

    Ok(json!({
        "backends": mux.backend_names(),
        "routing": {
            "resources": resources,
            "data_sources": data_sources,
        },
        "schema": schema,
    }))
}

/// Run the provider-wide fan-out RPCs and log their outcome
async fn exercise(mux: &MuxServer) -> anyhow::Result<()> {
    let configured = mux
        .configure_provider(&ConfigureProviderRequest::default())
        .await
        .context("ConfigureProvider failed")?;
    for diag in &configured.diagnostics {
        tracing::warn!(severity = ?diag.severity, detail = %diag.detail, "{}", diag.summary);
    }
    tracing::info!(
        diagnostics = configured.diagnostics.len(),
        "ConfigureProvider complete"
    );

    let stopped = mux
        .stop_provider(&StopProviderRequest::default())
        .await
        .context("StopProvider failed")?;
    if stopped.error.is_empty() {
        tracing::info!("StopProvider complete");
    } else {
        tracing::warn!(error = %stopped.error, "StopProvider reported errors");
    }

    Ok(())
}
