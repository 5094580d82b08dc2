//! `xapi` entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse arguments and configuration**: `--config` TOML plus `XAPI_*`
//!    environment overrides, resolved into a [`protocol::ClientContext`].
//! 2. **Wire observability**: `tracing-subscriber` with a JSON layer, and an
//!    OpenTelemetry OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//! 3. **Construct infrastructure**: an [`transport::HttpTransport`] injected
//!    into a [`client::XapiClient`].
//! 4. **Run one command** and print its result as pretty JSON on stdout.

mod commands;
mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use client::XapiClient;
use transport::HttpTransport;

use crate::commands::Cli;
use crate::config::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init()?;

    let outcome = execute(cli).await;
    telemetry.shutdown();

    let output = outcome?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("cannot render output")?
    );
    Ok(())
}

async fn execute(cli: Cli) -> anyhow::Result<serde_json::Value> {
    if let Some(result) = commands::run_offline(&cli.command) {
        return result;
    }

    let context = CliConfig::load(cli.config.as_deref())?
        .with_env_overrides(|name| std::env::var(name).ok())
        .client_context()
        .context("invalid client configuration")?;
    tracing::info!(endpoint = %context.endpoint(), "using record store");

    let client = XapiClient::new(context, Arc::new(HttpTransport::new()));
    commands::run(cli.command, &client).await
}
