//! Command implementations

mod config;
mod detail;
mod search;

use std::sync::Arc;

use anyhow::{Context, Result};
use geonode_core::config::LayeredConfig;
use geonode_core::GeonodeError;
use geonode_csw::{CswClient, ReqwestTransport};

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    let result = match &cli.command {
        Commands::Search(args) => search::execute(&cli, args, &output).await,
        Commands::Detail(args) => detail::execute(&cli, args, &output).await,
        Commands::Config => config::execute(&cli, &output),
    };

    if let Err(err) = &result {
        if err.downcast_ref::<GeonodeError>().is_some_and(GeonodeError::is_auth_failure) {
            output.warning("The catalogue rejected the login; check --username and --password");
        }
    }
    result
}

/// Build a catalogue client over HTTP from the effective configuration
fn connect(config: &LayeredConfig) -> Result<CswClient> {
    let settings = config
        .to_connection_settings()
        .context("Invalid connection settings (set --base-url or GEONODE_BASE_URL)")?;
    tracing::debug!(
        base_url = %settings.base(),
        authenticated = settings.credentials.is_some(),
        "Connecting to catalogue"
    );
    let transport = ReqwestTransport::new().context("Failed to create HTTP client")?;
    Ok(CswClient::new(settings, Arc::new(transport)))
}
