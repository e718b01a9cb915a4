use serde::{Deserialize, Serialize};

use super::filters::FilterAxis;

/// Kind of access service a resource can be loaded through
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeonodeService {
    #[serde(rename = "wms")]
    OgcWms,
    #[serde(rename = "wfs")]
    OgcWfs,
    #[serde(rename = "wcs")]
    OgcWcs,
    FileDownload,
}

impl GeonodeService {
    /// Protocol identifier used in ISO 19139 transfer options
    pub fn protocol(&self) -> Option<&'static str> {
        match self {
            GeonodeService::OgcWms => Some("ogc:wms"),
            GeonodeService::OgcWfs => Some("ogc:wfs"),
            GeonodeService::OgcWcs => Some("ogc:wcs"),
            GeonodeService::FileDownload => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GeonodeService::OgcWms => "wms",
            GeonodeService::OgcWfs => "wfs",
            GeonodeService::OgcWcs => "wcs",
            GeonodeService::FileDownload => "file_download",
        }
    }
}

/// Optional features an API client may support
///
/// Searching itself is mandatory for every client and therefore not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiCapability {
    FilterByName,
    FilterByAbstract,
    FilterByKeyword,
    FilterByTopicCategory,
    FilterByResourceTypes,
    FilterByTemporalExtent,
    FilterByPublicationDate,
    FilterBySpatialExtent,
    ModifyLayerMetadata,
    ModifyLayerStyle,
    LoadVectorDatasetViaWms,
    LoadVectorDatasetViaWfs,
    LoadRasterDatasetViaWms,
    LoadRasterDatasetViaWcs,
}

impl ApiCapability {
    /// Capability a client needs in order to honour a filter axis
    pub fn for_filter(axis: FilterAxis) -> Self {
        match axis {
            FilterAxis::Title => ApiCapability::FilterByName,
            FilterAxis::Abstract => ApiCapability::FilterByAbstract,
            FilterAxis::Keyword => ApiCapability::FilterByKeyword,
            FilterAxis::TopicCategory => ApiCapability::FilterByTopicCategory,
            FilterAxis::ResourceTypes => ApiCapability::FilterByResourceTypes,
            FilterAxis::TemporalExtent => ApiCapability::FilterByTemporalExtent,
            FilterAxis::PublicationDate => ApiCapability::FilterByPublicationDate,
            FilterAxis::SpatialExtent => ApiCapability::FilterBySpatialExtent,
        }
    }
}
