//! Field accessors for ISO 19139 `gmd:MD_Metadata` records
//!
//! One function per logical field. Required fields return `Result` and fail
//! with `MalformedRecord`; optional fields return `Option`.

use chrono::{DateTime, NaiveDateTime, Utc};
use geo::{coord, Rect};
use uuid::Uuid;

use geonode_core::error::{GeonodeError, Result};
use geonode_core::models::{BoundingBox, Crs, ResourceType, TemporalExtent};

use crate::xml::{gco, gmd, gml, Element, Step};

const FILE_IDENTIFIER: &[Step] = &[gmd("fileIdentifier"), gco("CharacterString")];

const CITATION: &[Step] = &[
    gmd("identificationInfo"),
    gmd("MD_DataIdentification"),
    gmd("citation"),
    gmd("CI_Citation"),
];

const DATA_IDENTIFICATION: &[Step] = &[gmd("identificationInfo"), gmd("MD_DataIdentification")];

const REFERENCE_SYSTEM: &[Step] = &[
    gmd("referenceSystemInfo"),
    gmd("MD_ReferenceSystem"),
    gmd("referenceSystemIdentifier"),
    gmd("RS_Identifier"),
];

const GEOGRAPHIC_BOUNDING_BOX: &[Step] = &[
    gmd("identificationInfo"),
    gmd("MD_DataIdentification"),
    gmd("extent"),
    gmd("EX_Extent"),
    gmd("geographicElement"),
    gmd("EX_GeographicBoundingBox"),
];

const TIME_PERIOD: &[Step] = &[
    gmd("identificationInfo"),
    gmd("MD_DataIdentification"),
    gmd("extent"),
    gmd("EX_Extent"),
    gmd("temporalElement"),
    gmd("EX_TemporalExtent"),
    gmd("extent"),
    gml("TimePeriod"),
];

const LEGAL_CONSTRAINTS: &[Step] = &[
    gmd("identificationInfo"),
    gmd("MD_DataIdentification"),
    gmd("resourceConstraints"),
    gmd("MD_LegalConstraints"),
];

const ONLINE_RESOURCES: &[Step] = &[
    gmd("distributionInfo"),
    gmd("MD_Distribution"),
    gmd("transferOptions"),
    gmd("MD_DigitalTransferOptions"),
    gmd("onLine"),
    gmd("CI_OnlineResource"),
];

const CHARACTER_STRING: &[Step] = &[gco("CharacterString")];

/// Primary timestamp layout, e.g. `2021-03-04T10:20:30+0000`
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// UTC layouts tried after the primary one
const UTC_FALLBACK_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S%.fZ"];

fn required_text<'a>(record: &'a Element, path: &[Step], field: &str) -> Result<&'a str> {
    record.find_text(path).ok_or_else(|| GeonodeError::missing_field(field))
}

fn invalid(field: &str, reason: impl Into<String>) -> GeonodeError {
    GeonodeError::MalformedRecord { field: field.to_string(), reason: reason.into() }
}

pub fn extract_uuid(record: &Element) -> Result<Uuid> {
    let raw = required_text(record, FILE_IDENTIFIER, "fileIdentifier")?;
    Uuid::parse_str(raw).map_err(|e| invalid("fileIdentifier", format!("is not a UUID: {}", e)))
}

pub fn extract_name(record: &Element) -> Result<String> {
    record
        .find(CITATION)
        .and_then(|citation| citation.find_text(&[gmd("name"), gco("CharacterString")]))
        .map(str::to_string)
        .ok_or_else(|| GeonodeError::missing_field("name"))
}

pub fn extract_title(record: &Element) -> Result<String> {
    record
        .find(CITATION)
        .and_then(|citation| citation.find_text(&[gmd("title"), gco("CharacterString")]))
        .map(str::to_string)
        .ok_or_else(|| GeonodeError::missing_field("title"))
}

pub fn extract_abstract(record: &Element) -> String {
    record
        .find(DATA_IDENTIFICATION)
        .and_then(|identification| {
            identification.find_text(&[gmd("abstract"), gco("CharacterString")])
        })
        .unwrap_or_default()
        .to_string()
}

pub fn extract_topic_category(record: &Element) -> Option<String> {
    record
        .find(DATA_IDENTIFICATION)?
        .find_text(&[gmd("topicCategory"), gmd("MD_TopicCategoryCode")])
        .map(str::to_string)
}

pub fn extract_language(record: &Element) -> Option<String> {
    record
        .find(DATA_IDENTIFICATION)?
        .find_text(&[gmd("language"), gco("CharacterString")])
        .map(str::to_string)
}

pub fn extract_thumbnail_url(record: &Element) -> Option<String> {
    record
        .find(DATA_IDENTIFICATION)?
        .find_text(&[
            gmd("graphicOverview"),
            gmd("MD_BrowseGraphic"),
            gmd("fileName"),
            gco("CharacterString"),
        ])
        .map(str::to_string)
}

/// Linkage of the first online resource, which GeoNode points at the resource page
pub fn extract_gui_url(record: &Element) -> Option<String> {
    record
        .find(ONLINE_RESOURCES)?
        .find_text(&[gmd("linkage"), gmd("URL")])
        .map(str::to_string)
}

pub fn extract_crs(record: &Element) -> Option<Crs> {
    let identifier = record.find(REFERENCE_SYSTEM)?;
    let code = identifier.find_text(&[gmd("code"), gco("CharacterString")])?;
    let authority = identifier
        .find_text(&[gmd("codeSpace"), gco("CharacterString")])
        .unwrap_or("EPSG");
    Some(Crs::new(authority, code))
}

/// Parse a decimal that may use a comma as the decimal separator
pub fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().replace(',', ".").parse().ok()
}

pub fn extract_bounding_box(record: &Element) -> Result<BoundingBox> {
    let bbox = record
        .find(GEOGRAPHIC_BOUNDING_BOX)
        .ok_or_else(|| GeonodeError::missing_field("spatial_extent"))?;

    let bound = |name: &'static str| -> Result<f64> {
        let raw = bbox
            .find_text(&[gmd(name), gco("Decimal")])
            .ok_or_else(|| GeonodeError::missing_field(name))?;
        parse_decimal(raw).ok_or_else(|| invalid(name, format!("is not a number: '{}'", raw)))
    };

    let west = bound("westBoundLongitude")?;
    let south = bound("southBoundLatitude")?;
    let east = bound("eastBoundLongitude")?;
    let north = bound("northBoundLatitude")?;

    Ok(Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north }))
}

/// Parse a catalogue timestamp, falling back to UTC layouts with optional fractions
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Some(parsed.with_timezone(&Utc));
    }
    UTC_FALLBACK_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

pub fn extract_temporal_extent(record: &Element) -> Result<Option<TemporalExtent>> {
    let Some(period) = record.find(TIME_PERIOD) else {
        return Ok(None);
    };

    let position = |name: &'static str| -> Result<DateTime<Utc>> {
        let raw = period
            .find_text(&[gml(name)])
            .ok_or_else(|| GeonodeError::missing_field(name))?;
        parse_datetime(raw).ok_or_else(|| invalid(name, format!("is not a timestamp: '{}'", raw)))
    };

    Ok(Some(TemporalExtent { start: position("beginPosition")?, end: position("endPosition")? }))
}

pub fn extract_published_date(record: &Element) -> Result<DateTime<Utc>> {
    let raw = record
        .find(CITATION)
        .and_then(|citation| {
            citation.find_text(&[gmd("date"), gmd("CI_Date"), gmd("date"), gco("DateTime")])
        })
        .ok_or_else(|| GeonodeError::missing_field("published_date"))?;

    parse_datetime(raw)
        .ok_or_else(|| invalid("published_date", format!("is not a timestamp: '{}'", raw)))
}

/// Keyword texts anywhere under the record, in document order
pub fn extract_keywords(record: &Element) -> Vec<String> {
    record
        .descendants(gmd("keyword"))
        .into_iter()
        .filter_map(|keyword| keyword.find_text(CHARACTER_STRING))
        .map(str::to_string)
        .collect()
}

/// Free-text value of the legal constraint whose restriction code is `license`
pub fn extract_license(record: &Element) -> Option<String> {
    record
        .find_all(LEGAL_CONSTRAINTS)
        .into_iter()
        .find(|constraints| {
            constraints
                .find_all(&[gmd("useConstraints"), gmd("MD_RestrictionCode")])
                .into_iter()
                .any(|code| code.attribute("codeListValue") == Some("license"))
        })
        .and_then(|constraints| {
            constraints.find_text(&[gmd("otherConstraints"), gco("CharacterString")])
        })
        .map(str::to_string)
}

/// Detect the resource type from the presence of content-description nodes
pub fn extract_resource_type(record: &Element) -> Option<ResourceType> {
    let content_info = record.find_all(&[gmd("contentInfo")]);

    if content_info.iter().any(|info| info.has_child(gmd("MD_CoverageDescription"))) {
        Some(ResourceType::RasterLayer)
    } else if content_info
        .iter()
        .any(|info| info.has_child(gmd("MD_FeatureCatalogueDescription")))
    {
        Some(ResourceType::VectorLayer)
    } else {
        None
    }
}

/// Linkage URL of the first transfer option whose protocol matches, ignoring case
pub fn find_protocol_linkage(record: &Element, protocol: &str) -> Option<String> {
    record
        .find_all(ONLINE_RESOURCES)
        .into_iter()
        .find(|resource| {
            resource
                .find_text(&[gmd("protocol"), gco("CharacterString")])
                .is_some_and(|reported| reported.eq_ignore_ascii_case(protocol))
        })
        .and_then(|resource| resource.find_text(&[gmd("linkage"), gmd("URL")]))
        .map(str::to_string)
}
