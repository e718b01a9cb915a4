//! Configuration loading for CLI commands

use anyhow::{Context, Result};
use geonode_core::config::{CliConfigOverrides, LayeredConfig};

use crate::cli::Cli;

/// Overrides taken from global command-line flags
pub fn cli_overrides(cli: &Cli, page_size: Option<u32>) -> CliConfigOverrides {
    CliConfigOverrides {
        base_url: cli.base_url.clone(),
        username: cli.username.clone(),
        password: cli.password.clone(),
        auth_config: cli.authcfg.clone(),
        page_size,
    }
}

/// Load layered configuration: defaults, file, environment, then flags
pub fn load_config(cli: &Cli, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    if let Some(path) = &cli.config {
        config = config
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);
    Ok(config)
}
