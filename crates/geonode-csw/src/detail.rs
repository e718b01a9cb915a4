//! Detail enrichment: catalogue record, legacy layer lookup, style lookup
//!
//! The catalogue carries no styling or ownership information, so a detail
//! fetch chains three calls. The legacy API can only be queried by title,
//! which is not guaranteed unique; ambiguous or empty lookups fail instead of
//! guessing.

use std::collections::BTreeMap;

use geonode_core::error::{GeonodeError, Result};
use geonode_core::models::{FullDetails, FullResource, Style};
use geonode_core::ports::{HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::Value;
use url::{form_urlencoded, Url};
use uuid::Uuid;

use crate::mapper::extract::extract_title;
use crate::mapper::{map_brief_resource, upgrade_resource, RecordContext};
use crate::search::{build_record_url, parse_response, record_from_response};
use crate::session::SessionManager;
use crate::xml::Element;

/// Layer object from the legacy `/api/layers/` listing
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyLayer {
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    pub resource_uri: Option<String>,
    pub default_style: Option<String>,
    #[serde(default)]
    pub owner: Option<Value>,
    #[serde(default)]
    pub metadata_author: Option<Value>,
    #[serde(default)]
    pub poc: Option<Value>,
    #[serde(default)]
    pub constraints_other: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyLayerList {
    objects: Option<Vec<LegacyLayer>>,
}

#[derive(Debug, Deserialize)]
struct StyleDetail {
    name: String,
    sld_url: String,
}

fn decode_json<T: for<'de> Deserialize<'de>>(response: &HttpResponse, url: &str) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| GeonodeError::Protocol {
        reason: format!("unexpected JSON from {}: {}", url, e),
    })
}

fn legacy_request(session: &SessionManager, url: &str) -> HttpRequest {
    HttpRequest::get(url).with_header("Referer", session.settings().base())
}

/// Fetch one catalogue record by identifier
pub async fn fetch_record(session: &SessionManager, uuid: &Uuid) -> Result<Element> {
    let url = build_record_url(&session.settings().catalogue_url(), uuid);
    let response = session
        .send_authenticated(HttpRequest::get(&url))
        .await?
        .error_for_status(&url)?;
    let root = parse_response(response.text()?)?;
    let record = record_from_response(&root)?.clone();
    Ok(record)
}

pub fn legacy_layers_url(base: &str, title: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("title", title)
        .finish();
    format!("{}/api/layers/?{}", base, query)
}

/// Pick the single layer matching `title` from a legacy listing
pub fn select_layer(title: &str, objects: Option<Vec<LegacyLayer>>) -> Result<LegacyLayer> {
    let lookup_error = |reason: String| GeonodeError::Lookup { title: title.to_string(), reason };

    let mut objects =
        objects.ok_or_else(|| lookup_error("response has no objects list".to_string()))?;
    let layer = match objects.len() {
        0 => return Err(lookup_error("no layer has this title".to_string())),
        1 => objects.remove(0),
        count => {
            let mut exact: Vec<LegacyLayer> =
                objects.into_iter().filter(|layer| layer.title == title).collect();
            if exact.len() != 1 {
                return Err(lookup_error(format!("{} layers share this title", count)));
            }
            exact.remove(0)
        }
    };

    if layer.default_style.as_deref().map_or(true, str::is_empty) {
        return Err(lookup_error("layer has no default style".to_string()));
    }
    Ok(layer)
}

/// Look up a layer in the legacy API by its exact title
pub async fn lookup_layer_by_title(session: &SessionManager, title: &str) -> Result<LegacyLayer> {
    let url = legacy_layers_url(session.settings().base(), title);
    let response = session
        .send_authenticated(legacy_request(session, &url))
        .await?
        .error_for_status(&url)?;
    let listing: LegacyLayerList = decode_json(&response, &url)?;
    select_layer(title, listing.objects)
}

/// Rebase a style document URL onto the catalogue base URL
pub fn normalize_sld_url(base: &str, sld_url: &str) -> String {
    let path = match Url::parse(sld_url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => sld_url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Resolve a legacy style URI into a name and absolute SLD URL
pub async fn fetch_style(session: &SessionManager, style_uri: &str) -> Result<Style> {
    let base = session.settings().base();
    let url = format!("{}{}", base, style_uri);
    let response = session
        .send_authenticated(legacy_request(session, &url))
        .await?
        .error_for_status(&url)?;
    let detail: StyleDetail = decode_json(&response, &url)?;
    Ok(Style { name: detail.name, sld_url: normalize_sld_url(base, &detail.sld_url) })
}

/// Flatten a loosely typed identity payload into key/value pairs
fn identity_map(value: Option<&Value>) -> BTreeMap<String, String> {
    match value {
        Some(Value::Object(fields)) => fields
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some((key.clone(), text))
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => {
            BTreeMap::from([("username".to_string(), s.clone())])
        }
        _ => BTreeMap::new(),
    }
}

/// Detail-only fields contributed by the legacy layer and its style
pub fn legacy_details(layer: &LegacyLayer, default_style: Style) -> FullDetails {
    let metadata_author = identity_map(layer.metadata_author.as_ref());
    let metadata_author = if metadata_author.is_empty() {
        identity_map(layer.poc.as_ref())
    } else {
        metadata_author
    };

    FullDetails {
        constraints: layer.constraints_other.clone().unwrap_or_default(),
        owner: identity_map(layer.owner.as_ref()),
        metadata_author,
        styles: vec![default_style.clone()],
        default_style: Some(default_style),
        ..FullDetails::default()
    }
}

/// Merge a catalogue record with its legacy layer and default style
pub fn merge_resource(
    record: &Element,
    context: &RecordContext,
    layer: &LegacyLayer,
    default_style: Style,
) -> Result<FullResource> {
    let mut brief = map_brief_resource(record, context)?;
    brief.pk = layer.id;
    brief.api_url = layer.resource_uri.as_deref().map(|uri| context.absolute_url(uri));
    Ok(upgrade_resource(record, brief, legacy_details(layer, default_style)))
}

/// Fetch and fully enrich a single resource
pub async fn fetch_resource_detail(session: &SessionManager, uuid: &Uuid) -> Result<FullResource> {
    let record = fetch_record(session, uuid).await?;
    let title = extract_title(&record)?;
    tracing::debug!(uuid = %uuid, title = %title, "Resolving legacy layer for record");

    let layer = lookup_layer_by_title(session, &title).await?;
    let style_uri = layer.default_style.as_deref().unwrap_or_default();
    let style = fetch_style(session, style_uri).await?;

    let settings = session.settings();
    let context = RecordContext::new(settings.base(), settings.auth_config.as_deref());
    merge_resource(&record, &context, &layer, style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;
    use geonode_core::config::ConnectionSettings;
    use serde_json::json;
    use std::sync::Arc;

    const RASTER_RECORD: &str = include_str!("../tests/fixtures/record_raster.xml");
    const UUID: &str = "0ab4e0a2-6f41-11eb-8e6b-0242ac130003";

    fn layer(value: Value) -> LegacyLayer {
        serde_json::from_value(value).unwrap()
    }

    fn record_response() -> HttpResponse {
        HttpResponse::new(
            200,
            format!(
                concat!(
                    r#"<csw:GetRecordByIdResponse "#,
                    r#"xmlns:csw="http://www.opengis.net/cat/csw/2.0.2">"#,
                    "{}</csw:GetRecordByIdResponse>"
                ),
                RASTER_RECORD
            ),
        )
    }

    fn session(transport: Arc<MemoryTransport>) -> SessionManager {
        SessionManager::new(ConnectionSettings::new("http://geonode.test").unwrap(), transport)
    }

    #[test]
    fn test_select_single_layer() {
        let objects =
            vec![layer(json!({"id": 7, "title": "Roads", "default_style": "/api/styles/3/"}))];
        let selected = select_layer("Roads", Some(objects)).unwrap();
        assert_eq!(selected.id, Some(7));
    }

    #[test]
    fn test_select_prefers_exact_title_among_many() {
        let objects = vec![
            layer(json!({"id": 1, "title": "Roads 2019", "default_style": "/api/styles/1/"})),
            layer(json!({"id": 2, "title": "Roads", "default_style": "/api/styles/2/"})),
        ];
        assert_eq!(select_layer("Roads", Some(objects)).unwrap().id, Some(2));
    }

    #[test]
    fn test_select_rejects_ambiguous_and_malformed() {
        let duplicates = vec![
            layer(json!({"id": 1, "title": "Roads", "default_style": "/a/"})),
            layer(json!({"id": 2, "title": "Roads", "default_style": "/b/"})),
        ];
        let lookup_failed = |result: Result<LegacyLayer>| {
            matches!(result, Err(GeonodeError::Lookup { .. }))
        };
        assert!(lookup_failed(select_layer("Roads", Some(duplicates))));
        assert!(lookup_failed(select_layer("Roads", None)));
        assert!(lookup_failed(select_layer("Roads", Some(Vec::new()))));

        let no_style = vec![layer(json!({"id": 1, "title": "Roads"}))];
        assert!(matches!(select_layer("Roads", Some(no_style)), Err(GeonodeError::Lookup { .. })));
    }

    #[test]
    fn test_normalize_sld_url() {
        assert_eq!(
            normalize_sld_url(
                "http://geonode.test",
                "http://geoserver:8080/geoserver/rest/styles/roads.sld?x=1"
            ),
            "http://geonode.test/geoserver/rest/styles/roads.sld"
        );
        assert_eq!(
            normalize_sld_url("http://geonode.test", "/geoserver/rest/styles/roads.sld"),
            "http://geonode.test/geoserver/rest/styles/roads.sld"
        );
    }

    #[test]
    fn test_legacy_details_falls_back_to_poc() {
        let legacy = layer(json!({
            "id": 3,
            "title": "Roads",
            "default_style": "/api/styles/3/",
            "owner": {"username": "admin", "first_name": "Ada", "pk": 1},
            "poc": "curator",
            "constraints_other": "Internal use"
        }));
        let style = Style {
            name: "roads".to_string(),
            sld_url: "http://geonode.test/r.sld".to_string(),
        };

        let details = legacy_details(&legacy, style.clone());

        assert_eq!(details.owner.get("username").map(String::as_str), Some("admin"));
        assert_eq!(details.owner.get("pk").map(String::as_str), Some("1"));
        assert_eq!(details.metadata_author.get("username").map(String::as_str), Some("curator"));
        assert_eq!(details.constraints, "Internal use");
        assert_eq!(details.default_style, Some(style.clone()));
        assert_eq!(details.styles, vec![style]);
    }

    #[tokio::test]
    async fn test_detail_pipeline() {
        let transport = Arc::new(MemoryTransport::new());
        transport
            .on_get("http://geonode.test/catalogue/csw", record_response())
            .on_get(
                "http://geonode.test/api/layers/",
                HttpResponse::new(
                    200,
                    json!({"objects": [{
                        "id": 42,
                        "title": "Digital elevation model",
                        "resource_uri": "/api/layers/42/",
                        "default_style": "/api/styles/9/",
                        "owner": {"username": "admin"}
                    }]})
                    .to_string(),
                ),
            )
            .on_get(
                "http://geonode.test/api/styles/9/",
                HttpResponse::new(
                    200,
                    json!({
                        "name": "dem",
                        "sld_url": "http://geoserver:8080/geoserver/rest/styles/dem.sld"
                    })
                    .to_string(),
                ),
            );

        let session = session(transport.clone());
        let uuid = Uuid::parse_str(UUID).unwrap();
        let resource = fetch_resource_detail(&session, &uuid).await.unwrap();

        assert_eq!(resource.brief.pk, Some(42));
        assert_eq!(resource.brief.api_url.as_deref(), Some("http://geonode.test/api/layers/42/"));
        assert_eq!(resource.details.license, None);
        assert_eq!(
            resource.details.default_style.as_ref().map(|s| s.sld_url.as_str()),
            Some("http://geonode.test/geoserver/rest/styles/dem.sld")
        );

        let lookup = &transport.requests_to("http://geonode.test/api/layers/")[0];
        assert_eq!(lookup.url, "http://geonode.test/api/layers/?title=Digital+elevation+model");
        assert_eq!(lookup.header("Referer"), Some("http://geonode.test"));
    }

    #[tokio::test]
    async fn test_empty_lookup_skips_style_call() {
        let transport = Arc::new(MemoryTransport::new());
        transport
            .on_get("http://geonode.test/catalogue/csw", record_response())
            .on_get("http://geonode.test/api/layers/", HttpResponse::new(200, r#"{"objects": []}"#))
            .on_get("http://geonode.test/api/styles/", HttpResponse::new(200, "{}"));

        let session = session(transport.clone());
        let uuid = Uuid::parse_str(UUID).unwrap();
        let err = fetch_resource_detail(&session, &uuid).await.unwrap_err();

        assert!(matches!(err, GeonodeError::Lookup { .. }));
        assert!(transport.requests_to("http://geonode.test/api/styles/").is_empty());
    }

    #[tokio::test]
    async fn test_failed_record_fetch_is_transport_error() {
        let transport = Arc::new(MemoryTransport::new());
        transport.on_get("http://geonode.test/catalogue/csw", HttpResponse::new(500, "boom"));

        let session = session(transport.clone());
        let uuid = Uuid::parse_str(UUID).unwrap();
        let err = fetch_resource_detail(&session, &uuid).await.unwrap_err();

        assert!(matches!(err, GeonodeError::Transport { status: 500, .. }));
        assert!(transport.requests_to("http://geonode.test/api/").is_empty());
    }
}
