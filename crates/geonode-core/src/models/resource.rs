//! Catalogue resource model
//!
//! Brief resources back list views; full resources add the detail-only fields
//! gathered from the legacy API. A `FullResource` is only ever built from a
//! finished `BriefResource` through [`FullResource::from_brief`].

use chrono::{DateTime, Utc};
use geo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::service::GeonodeService;

/// Geographic bounding box (west/south as min, east/north as max)
pub type BoundingBox = Rect<f64>;

/// Kind of catalogue resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "vector")]
    VectorLayer,
    #[serde(rename = "raster")]
    RasterLayer,
    #[serde(rename = "map")]
    Map,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::VectorLayer => "vector",
            ResourceType::RasterLayer => "raster",
            ResourceType::Map => "map",
        }
    }

    /// Access services that can be synthesised for this kind of resource
    pub fn services(&self) -> &'static [GeonodeService] {
        match self {
            ResourceType::VectorLayer => &[GeonodeService::OgcWms, GeonodeService::OgcWfs],
            ResourceType::RasterLayer => &[GeonodeService::OgcWms, GeonodeService::OgcWcs],
            ResourceType::Map => &[GeonodeService::OgcWms],
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinate reference system as published by the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    /// Code space, e.g. "EPSG"
    pub authority: String,

    /// Code within the authority, e.g. "4326"
    pub code: String,
}

impl Crs {
    pub fn new(authority: impl Into<String>, code: impl Into<String>) -> Self {
        Self { authority: authority.into(), code: code.into() }
    }

    pub fn epsg(code: u32) -> Self {
        Self::new("EPSG", code.to_string())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

/// Time span covered by a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalExtent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A named style and the location of its SLD document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    pub sld_url: String,
}

/// Summary of a catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefResource {
    /// Numeric primary key in the legacy API, when known
    pub pk: Option<i64>,

    /// Stable identity of the resource across requests
    pub uuid: Uuid,

    /// Layer name as known to the OGC services
    pub name: String,

    /// `None` when the record does not describe its content
    pub resource_type: Option<ResourceType>,

    pub title: String,

    #[serde(rename = "abstract")]
    pub abstract_text: String,

    pub published_date: Option<DateTime<Utc>>,

    pub spatial_extent: BoundingBox,

    pub crs: Option<Crs>,

    pub temporal_extent: Option<TemporalExtent>,

    pub thumbnail_url: Option<String>,

    /// Legacy API detail URL
    pub api_url: Option<String>,

    /// Browser URL of the resource page
    pub gui_url: Option<String>,

    /// Keywords in document order
    pub keywords: Vec<String>,

    /// ISO topic category
    pub category: Option<String>,

    /// Ready-to-use access descriptor per service kind
    pub service_urls: BTreeMap<GeonodeService, String>,
}

impl BriefResource {
    /// Service kinds this resource can be loaded through
    pub fn services(&self) -> Vec<GeonodeService> {
        self.service_urls.keys().copied().collect()
    }

    pub fn service_url(&self, service: GeonodeService) -> Option<&str> {
        self.service_urls.get(&service).map(String::as_str)
    }
}

/// Detail-only fields of a full resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullDetails {
    pub language: Option<String>,

    /// License identifier, absent when the record declares none
    pub license: Option<String>,

    /// Usage constraints text
    pub constraints: String,

    pub owner: BTreeMap<String, String>,

    pub metadata_author: BTreeMap<String, String>,

    pub default_style: Option<Style>,

    pub styles: Vec<Style>,
}

/// Fully enriched catalogue entry used by detail views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullResource {
    #[serde(flatten)]
    pub brief: BriefResource,

    #[serde(flatten)]
    pub details: FullDetails,
}

impl FullResource {
    /// Upgrade a brief resource with its detail-only fields
    ///
    /// The default style is always part of the available styles.
    pub fn from_brief(brief: BriefResource, mut details: FullDetails) -> Self {
        if let Some(default_style) = &details.default_style {
            if !details.styles.contains(default_style) {
                details.styles.insert(0, default_style.clone());
            }
        }
        Self { brief, details }
    }

    pub fn uuid(&self) -> Uuid {
        self.brief.uuid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn brief() -> BriefResource {
        BriefResource {
            pk: None,
            uuid: Uuid::nil(),
            name: "geonode:roads".to_string(),
            resource_type: Some(ResourceType::VectorLayer),
            title: "Roads".to_string(),
            abstract_text: String::new(),
            published_date: None,
            spatial_extent: Rect::new(coord! { x: -10.0, y: -5.0 }, coord! { x: 10.0, y: 5.0 }),
            crs: Some(Crs::epsg(4326)),
            temporal_extent: None,
            thumbnail_url: None,
            api_url: None,
            gui_url: None,
            keywords: vec![],
            category: None,
            service_urls: BTreeMap::new(),
        }
    }

    #[test]
    fn test_resource_type_services() {
        assert_eq!(
            ResourceType::VectorLayer.services(),
            &[GeonodeService::OgcWms, GeonodeService::OgcWfs]
        );
        assert_eq!(
            ResourceType::RasterLayer.services(),
            &[GeonodeService::OgcWms, GeonodeService::OgcWcs]
        );
        assert_eq!(ResourceType::Map.services(), &[GeonodeService::OgcWms]);
    }

    #[test]
    fn test_crs_display() {
        assert_eq!(Crs::new("EPSG", "3857").to_string(), "EPSG:3857");
        assert_eq!(Crs::epsg(4326).to_string(), "EPSG:4326");
    }

    #[test]
    fn test_upgrade_includes_default_style() {
        let style = Style {
            name: "roads_style".to_string(),
            sld_url: "http://geonode.test/geoserver/rest/styles/roads_style.sld".to_string(),
        };
        let details = FullDetails { default_style: Some(style.clone()), ..Default::default() };

        let full = FullResource::from_brief(brief(), details);

        assert_eq!(full.uuid(), Uuid::nil());
        assert_eq!(full.details.styles, vec![style]);
        assert_eq!(full.details.license, None);
    }

    #[test]
    fn test_full_resource_serializes_flat() {
        let full = FullResource::from_brief(brief(), FullDetails::default());
        let value = serde_json::to_value(&full).unwrap();

        assert_eq!(value["title"], "Roads");
        assert_eq!(value["resource_type"], "vector");
        assert!(value.get("brief").is_none());
        assert!(value.get("license").is_some());
    }
}
