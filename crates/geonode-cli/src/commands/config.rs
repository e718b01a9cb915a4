//! Config command implementation

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::Cli;
use crate::config_loader::{cli_overrides, load_config};
use crate::output::OutputWriter;

#[derive(Debug, Serialize, Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(cli: &Cli, output: &OutputWriter) -> Result<()> {
    let config = load_config(cli, cli_overrides(cli, None))?;

    let mut rows: Vec<ConfigRow> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigRow { key, value, source: format!("{:?}", source) })
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    if output.is_json() {
        output.result(&rows)?;
    } else {
        output.section("Effective configuration");
        output.table(rows);
    }
    Ok(())
}
