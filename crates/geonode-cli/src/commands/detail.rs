//! Detail command implementation

use anyhow::Result;
use geonode_core::models::FullResource;

use crate::cli::{Cli, DetailArgs};
use crate::config_loader::{cli_overrides, load_config};
use crate::output::OutputWriter;

pub async fn execute(cli: &Cli, args: &DetailArgs, output: &OutputWriter) -> Result<()> {
    let config = load_config(cli, cli_overrides(cli, None))?;
    let client = super::connect(&config)?;

    let resource = client.get_resource_detail(&args.uuid).await?;

    if output.is_json() {
        return output.result(&resource);
    }
    print_resource(&resource, output);
    Ok(())
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn print_resource(resource: &FullResource, output: &OutputWriter) {
    let brief = &resource.brief;
    let details = &resource.details;

    output.section(&brief.title);
    output.kv("UUID", brief.uuid);
    output.kv("Name", &brief.name);
    let resource_type = brief.resource_type.map(|t| t.to_string());
    output.kv("Type", resource_type.unwrap_or_else(|| "-".to_string()));
    output.kv("CRS", brief.crs.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()));
    output.kv("Language", or_dash(details.language.as_deref()));
    output.kv("License", or_dash(details.license.as_deref()));
    output.kv("Category", or_dash(brief.category.as_deref()));
    output.kv("Keywords", brief.keywords.join(", "));
    output.kv("Page", or_dash(brief.gui_url.as_deref()));

    let extent = brief.spatial_extent;
    output.kv(
        "Extent",
        format!(
            "{:.4}, {:.4}, {:.4}, {:.4}",
            extent.min().x,
            extent.min().y,
            extent.max().x,
            extent.max().y
        ),
    );
    if let Some(temporal) = &brief.temporal_extent {
        output.kv("Temporal extent", format!("{} / {}", temporal.start, temporal.end));
    }

    if !brief.abstract_text.is_empty() {
        output.section("Abstract");
        println!("{}", brief.abstract_text);
    }

    if let Some(owner) = details.owner.get("username") {
        output.kv("Owner", owner);
    }
    if !details.constraints.is_empty() {
        output.kv("Constraints", &details.constraints);
    }
    if let Some(style) = &details.default_style {
        output.kv("Default style", format!("{} ({})", style.name, style.sld_url));
    }

    if brief.service_urls.is_empty() {
        output.warning("No OGC services are available for this resource");
        return;
    }
    output.section("Services");
    for (service, descriptor) in &brief.service_urls {
        output.kv(service.as_str(), descriptor);
    }
}
