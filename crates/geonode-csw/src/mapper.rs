//! Mapping of catalogue records into the resource model
//!
//! Only fields derivable from the CSW record are filled here. Detail-only data
//! (owner, metadata author, constraints, styles) comes from the legacy API and
//! is passed in by the caller as [`FullDetails`].

pub mod extract;
pub mod service;

use geonode_core::error::{GeonodeError, Result};
use geonode_core::models::{BriefResource, FullDetails, FullResource};

use crate::xml::{gmd, Element};
use extract::*;
use service::build_service_urls;

/// Connection details a record is mapped against
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    /// Catalogue base URL without trailing slash
    pub base_url: &'a str,

    /// Opaque host auth-configuration reference for service descriptors
    pub auth_config: Option<&'a str>,
}

impl<'a> RecordContext<'a> {
    pub fn new(base_url: &'a str, auth_config: Option<&'a str>) -> Self {
        Self { base_url: base_url.trim_end_matches('/'), auth_config }
    }

    /// Resolve a possibly relative URL against the catalogue
    pub fn absolute_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

/// Map a `gmd:MD_Metadata` element into a brief resource
pub fn map_brief_resource(record: &Element, context: &RecordContext) -> Result<BriefResource> {
    if !record.is(gmd("MD_Metadata")) {
        return Err(GeonodeError::MalformedRecord {
            field: "MD_Metadata".to_string(),
            reason: format!("record root is <{}>", record.name()),
        });
    }

    let uuid = extract_uuid(record)?;
    let name = extract_name(record)?;
    let title = extract_title(record)?;
    let published_date = extract_published_date(record)?;
    let spatial_extent = extract_bounding_box(record)?;
    let temporal_extent = extract_temporal_extent(record)?;
    let crs = extract_crs(record);
    let resource_type = extract_resource_type(record);
    let service_urls =
        build_service_urls(record, resource_type, &name, crs.as_ref(), context.auth_config);

    Ok(BriefResource {
        pk: None,
        uuid,
        name,
        resource_type,
        title,
        abstract_text: extract_abstract(record),
        published_date: Some(published_date),
        spatial_extent,
        crs,
        temporal_extent,
        thumbnail_url: extract_thumbnail_url(record).map(|url| context.absolute_url(&url)),
        api_url: None,
        gui_url: extract_gui_url(record).map(|url| context.absolute_url(&url)),
        keywords: extract_keywords(record),
        category: extract_topic_category(record),
        service_urls,
    })
}

/// Upgrade a brief resource using the record's full-detail fields
///
/// Language and license come from the record and take precedence over the
/// values in `details`.
pub fn upgrade_resource(
    record: &Element,
    brief: BriefResource,
    details: FullDetails,
) -> FullResource {
    let details = FullDetails {
        language: extract_language(record).or(details.language),
        license: extract_license(record),
        ..details
    };
    FullResource::from_brief(brief, details)
}

/// Map a `gmd:MD_Metadata` element into a full resource
pub fn map_full_resource(
    record: &Element,
    context: &RecordContext,
    details: FullDetails,
) -> Result<FullResource> {
    let brief = map_brief_resource(record, context)?;
    Ok(upgrade_resource(record, brief, details))
}
