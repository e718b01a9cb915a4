//! CSW GetRecords / GetRecordById requests and search result handling

use geonode_core::error::{GeonodeError, Result};
use geonode_core::models::{BriefResource, PaginationInfo, SearchFilters};
use url::form_urlencoded;
use uuid::Uuid;

use crate::mapper::{map_brief_resource, RecordContext};
use crate::xml::{csw, gmd, ows, Element};

pub const CSW_VERSION: &str = "2.0.2";
pub const OUTPUT_SCHEMA: &str = "http://www.isotc211.org/2005/gmd";
pub const TYPE_NAME: &str = "gmd:MD_Metadata";

fn base_query(request: &str) -> form_urlencoded::Serializer<'static, String> {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("service", "CSW")
        .append_pair("version", CSW_VERSION)
        .append_pair("request", request);
    query
}

fn cql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Build the GetRecords URL for one page of results
///
/// `page` is 1-based. Only the title axis can be expressed as a catalogue
/// constraint; any other active filter is rejected.
pub fn build_search_url(
    catalogue_url: &str,
    filters: &SearchFilters,
    page: u32,
    page_size: u32,
) -> Result<String> {
    if page == 0 {
        return Err(GeonodeError::ConfigInvalid {
            key: "page".to_string(),
            reason: "pages are numbered from 1".to_string(),
        });
    }
    if page_size == 0 {
        return Err(GeonodeError::ConfigInvalid {
            key: "page_size".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if let Some(axis) = filters
        .active_axes()
        .into_iter()
        .find(|axis| *axis != geonode_core::models::FilterAxis::Title)
    {
        return Err(GeonodeError::UnsupportedFilter { filter: axis.as_str().to_string() });
    }

    let start_position = u64::from(page_size) * u64::from(page) + 1 - u64::from(page_size);

    let mut query = base_query("GetRecords");
    query
        .append_pair("resulttype", "results")
        .append_pair("startposition", &start_position.to_string())
        .append_pair("maxrecords", &page_size.to_string())
        .append_pair("typenames", TYPE_NAME)
        .append_pair("outputschema", OUTPUT_SCHEMA)
        .append_pair("elementsetname", "full");

    if let Some(field) = filters.ordering_field {
        let direction = if filters.reverse_ordering { "D" } else { "A" };
        query.append_pair("sortby", &format!("{}:{}", field.as_str(), direction));
    }

    if let Some(title) = &filters.title {
        query
            .append_pair("constraintlanguage", "CQL_TEXT")
            .append_pair("constraint", &format!("dc:title like {}", cql_literal(title)));
    }

    Ok(format!("{}?{}", catalogue_url, query.finish()))
}

/// Build the GetRecordById URL for a single record
pub fn build_record_url(catalogue_url: &str, uuid: &Uuid) -> String {
    let mut query = base_query("GetRecordById");
    query
        .append_pair("outputschema", OUTPUT_SCHEMA)
        .append_pair("elementsetname", "full")
        .append_pair("id", &uuid.to_string());
    format!("{}?{}", catalogue_url, query.finish())
}

/// 1-based page the server just returned
///
/// A `next_record` of 0 means the last page was reached.
pub fn current_page(total_records: u64, next_record: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 1;
    }
    let page = if next_record == 0 {
        total_records.div_ceil(page_size)
    } else {
        (next_record - 1) / page_size
    };
    page.max(1)
}

/// Parse a catalogue response, rejecting OWS exception reports
pub fn parse_response(xml: &str) -> Result<Element> {
    let root = Element::parse(xml)?;
    if root.is(ows("ExceptionReport")) {
        let reason = root
            .descendants(ows("ExceptionText"))
            .into_iter()
            .filter_map(Element::text)
            .collect::<Vec<_>>()
            .join("; ");
        let code = root
            .child(ows("Exception"))
            .and_then(|exception| exception.attribute("exceptionCode"))
            .unwrap_or("unknown");
        return Err(GeonodeError::Protocol {
            reason: format!("catalogue exception {}: {}", code, reason),
        });
    }
    Ok(root)
}

fn required_count(results: &Element, attribute: &str) -> Result<u64> {
    let raw = results.attribute(attribute).ok_or_else(|| GeonodeError::Protocol {
        reason: format!("SearchResults has no {} attribute", attribute),
    })?;
    raw.trim().parse().map_err(|_| GeonodeError::Protocol {
        reason: format!("SearchResults {} is not a count: {:?}", attribute, raw),
    })
}

/// Map a GetRecords response into resources and pagination info
pub fn handle_search_response(
    xml: &str,
    page_size: u32,
    context: &RecordContext,
) -> Result<(Vec<BriefResource>, PaginationInfo)> {
    let root = parse_response(xml)?;
    let results = root.child(csw("SearchResults")).ok_or_else(|| GeonodeError::Protocol {
        reason: "response has no SearchResults element".to_string(),
    })?;

    let total = required_count(results, "numberOfRecordsMatched")?;
    let next_record = required_count(results, "nextRecord")?;
    let page_size = u64::from(page_size);

    let resources = results
        .children()
        .iter()
        .filter(|child| child.is(gmd("MD_Metadata")))
        .map(|record| map_brief_resource(record, context))
        .collect::<Result<Vec<_>>>()?;

    let page = current_page(total, next_record, page_size);
    let pagination = PaginationInfo::new(total, page, page_size);
    tracing::debug!(
        total = total,
        page = pagination.current_page,
        returned = resources.len(),
        "Parsed search results"
    );
    Ok((resources, pagination))
}

/// Extract the single record from a GetRecordById response
pub fn record_from_response(root: &Element) -> Result<&Element> {
    if root.is(gmd("MD_Metadata")) {
        return Ok(root);
    }
    root.child(gmd("MD_Metadata")).ok_or_else(|| GeonodeError::Protocol {
        reason: format!("<{}> response holds no metadata record", root.name()),
    })
}
