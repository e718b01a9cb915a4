use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// GeoNode - Browse a GeoNode catalogue over CSW
#[derive(Parser, Debug)]
#[command(name = "geonode")]
#[command(about = "Browse a GeoNode catalogue over CSW", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the GeoNode instance
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Username for the GeoNode web login
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Password for the GeoNode web login
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Auth configuration id embedded into service descriptors
    #[arg(long, global = true, value_name = "ID")]
    pub authcfg: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the catalogue
    Search(SearchArgs),

    /// Show the full details of one resource
    Detail(DetailArgs),

    /// Show the effective configuration and where each value comes from
    Config,
}

/// Fields results can be sorted by
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortField {
    Name,
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Page to fetch, starting at 1
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Records per page (overrides the configured page size)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Only resources whose title matches this pattern
    #[arg(long)]
    pub title: Option<String>,

    /// Sort results by this field
    #[arg(long, value_enum)]
    pub sort: Option<SortField>,

    /// Sort in descending order
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

#[derive(Parser, Debug)]
pub struct DetailArgs {
    /// Catalogue identifier of the resource
    pub uuid: uuid::Uuid,
}
