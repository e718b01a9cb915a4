//! Search command implementation

use anyhow::Result;
use geonode_core::models::{BriefResource, OrderingField, SearchFilters};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{Cli, SearchArgs, SortField};
use crate::config_loader::{cli_overrides, load_config};
use crate::output::OutputWriter;

#[derive(Debug, Tabled)]
struct ResourceRow {
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Published")]
    published: String,
    #[tabled(rename = "Services")]
    services: String,
}

impl From<&BriefResource> for ResourceRow {
    fn from(resource: &BriefResource) -> Self {
        Self {
            uuid: resource.uuid.to_string(),
            title: resource.title.clone(),
            name: resource.name.clone(),
            resource_type: resource
                .resource_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            published: resource
                .published_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
            services: resource
                .services()
                .iter()
                .map(|service| service.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    resources: &'a [BriefResource],
    pagination: geonode_core::models::PaginationInfo,
    total_pages: u64,
}

fn filters_from_args(args: &SearchArgs) -> SearchFilters {
    let mut filters = SearchFilters::new();
    if let Some(title) = &args.title {
        filters = filters.with_title(title.clone());
    }
    if let Some(SortField::Name) = args.sort {
        filters = filters.ordered_by(OrderingField::Name, args.desc);
    }
    filters
}

pub async fn execute(cli: &Cli, args: &SearchArgs, output: &OutputWriter) -> Result<()> {
    let config = load_config(cli, cli_overrides(cli, args.page_size))?;
    let client = super::connect(&config)?;
    let page_size = client.settings().page_size;

    let filters = filters_from_args(args);
    let (resources, pagination) = client.search_resources(&filters, args.page, page_size).await?;

    if output.is_json() {
        return output.result(SearchOutput {
            resources: &resources,
            pagination,
            total_pages: pagination.total_pages(),
        });
    }

    output.table(resources.iter().map(ResourceRow::from).collect());
    output.info(format!(
        "Page {} of {} ({} matching resources)",
        pagination.current_page,
        pagination.total_pages(),
        pagination.total_records
    ));
    if pagination.has_next_page() {
        output.info(format!("Next page: --page {}", pagination.current_page + 1));
    }
    Ok(())
}
