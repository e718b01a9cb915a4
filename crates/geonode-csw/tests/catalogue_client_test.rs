//! End-to-end tests for the catalogue client over a scripted transport

use std::sync::Arc;

use geonode_core::config::{ConnectionSettings, Credentials};
use geonode_core::models::{GeonodeService, PaginationInfo, ResourceType, SearchFilters};
use geonode_core::ports::{CookieStore, HttpMethod, HttpResponse, SetCookie};
use geonode_core::GeonodeError;
use geonode_csw::{CookieJar, CswClient, MemoryTransport, SessionState};
use uuid::Uuid;

const BASE: &str = "http://geonode.test";
const CATALOGUE: &str = "http://geonode.test/catalogue/csw";
const LOGIN: &str = "http://geonode.test/account/login/";

const RASTER_RECORD: &str = include_str!("fixtures/record_raster.xml");
const VECTOR_RECORD: &str = include_str!("fixtures/record_vector.xml");

fn search_results(total: u64, next: u64, records: &[&str]) -> HttpResponse {
    HttpResponse::new(
        200,
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<csw:GetRecordsResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2" version="2.0.2">
  <csw:SearchStatus timestamp="2021-02-15T10:00:00Z"/>
  <csw:SearchResults numberOfRecordsMatched="{}" numberOfRecordsReturned="{}"
      nextRecord="{}" elementSet="full">
{}
  </csw:SearchResults>
</csw:GetRecordsResponse>"#,
            total,
            records.len(),
            next,
            records.concat()
        ),
    )
}

fn record_by_id(record: &str) -> HttpResponse {
    HttpResponse::new(
        200,
        format!(
            concat!(
                r#"<csw:GetRecordByIdResponse xmlns:csw="http://www.opengis.net/cat/csw/2.0.2">"#,
                "{}</csw:GetRecordByIdResponse>"
            ),
            record
        ),
    )
}

fn login_page() -> HttpResponse {
    HttpResponse::new(200, "<form/>").with_cookie(SetCookie::new("csrftoken", "tok"))
}

fn script_login(transport: &MemoryTransport) {
    let logged_in =
        HttpResponse::new(200, "ok").with_cookie(SetCookie::new("sessionid", "s3ss10n"));
    transport.on_get(LOGIN, login_page()).on_post(LOGIN, logged_in);
}

fn authenticated_settings() -> ConnectionSettings {
    ConnectionSettings::new(BASE)
        .unwrap()
        .with_credentials(Credentials::new("admin", "admin"))
        .with_auth_config("abc123")
}

#[tokio::test]
async fn test_search_single_raster_page() {
    let transport = Arc::new(MemoryTransport::new());
    script_login(&transport);
    transport.on_get(CATALOGUE, search_results(1, 0, &[RASTER_RECORD]));

    let host_cookies = Arc::new(CookieJar::new());
    let client = CswClient::new(authenticated_settings(), transport.clone())
        .with_host_cookie_store(host_cookies.clone());

    let (resources, pagination) =
        client.search_resources(&SearchFilters::default(), 1, 10).await.unwrap();

    assert_eq!(pagination, PaginationInfo::new(1, 1, 10));
    assert_eq!(resources.len(), 1);

    let raster = &resources[0];
    assert_eq!(raster.resource_type, Some(ResourceType::RasterLayer));
    assert_eq!(raster.services(), vec![GeonodeService::OgcWms, GeonodeService::OgcWcs]);
    assert!(raster.service_url(GeonodeService::OgcWms).unwrap().ends_with("authcfg=abc123"));
    assert_eq!(
        raster.service_url(GeonodeService::OgcWcs),
        Some("identifier=geonode:dem_30m&url=http://geonode.test/geoserver/wcs&authcfg=abc123")
    );

    assert_eq!(client.session_state(), SessionState::Authenticated);
    assert_eq!(host_cookies.get("geonode.test", "/", "sessionid").as_deref(), Some("s3ss10n"));

    let search = &transport.requests_to(CATALOGUE)[0];
    assert_eq!(search.header("Cookie"), Some("csrftoken=tok; sessionid=s3ss10n"));
}

#[tokio::test]
async fn test_search_reports_middle_page() {
    let transport = Arc::new(MemoryTransport::new());
    transport.on_get(CATALOGUE, search_results(23, 21, &[VECTOR_RECORD, RASTER_RECORD]));

    let client = CswClient::new(ConnectionSettings::new(BASE).unwrap(), transport.clone());
    let (resources, pagination) =
        client.search_resources(&SearchFilters::new().with_title("roads"), 2, 10).await.unwrap();

    assert_eq!(resources.len(), 2);
    assert_eq!(pagination.current_page, 2);
    assert_eq!(pagination.total_pages(), 3);
    assert!(pagination.has_next_page());

    let vector = &resources[0];
    assert_eq!(vector.resource_type, Some(ResourceType::VectorLayer));
    assert_eq!(
        vector.service_url(GeonodeService::OgcWfs),
        Some("url='http://geonode.test/geoserver/wfs' typename='geonode:roads' version='auto'")
    );

    // Anonymous settings never touch the login form
    assert!(transport.requests_to(LOGIN).is_empty());
    let url = &transport.requests()[0].url;
    assert!(url.contains("startposition=11"));
    assert!(url.contains("constraintlanguage=CQL_TEXT"));
}

#[tokio::test]
async fn test_search_with_unwired_filter_makes_no_request() {
    let transport = Arc::new(MemoryTransport::new());
    let client = CswClient::new(ConnectionSettings::new(BASE).unwrap(), transport.clone());

    let filters = SearchFilters {
        topic_category: Some("transportation".to_string()),
        ..Default::default()
    };
    let err = client.search_resources(&filters, 1, 10).await.unwrap_err();

    assert!(matches!(err, GeonodeError::UnsupportedFilter { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_search_failure_statuses() {
    let transport = Arc::new(MemoryTransport::new());
    transport.on_get(CATALOGUE, HttpResponse::new(502, "bad gateway"));
    let client = CswClient::new(ConnectionSettings::new(BASE).unwrap(), transport);

    let err = client.search_resources(&SearchFilters::default(), 1, 10).await.unwrap_err();
    assert!(matches!(err, GeonodeError::Transport { status: 502, .. }));
}

#[tokio::test]
async fn test_failed_login_aborts_search() {
    let transport = Arc::new(MemoryTransport::new());
    transport
        .on_get(LOGIN, login_page())
        .on_post(LOGIN, HttpResponse::new(403, "CSRF verification failed"));

    let client = CswClient::new(authenticated_settings(), transport.clone());
    let err = client.search_resources(&SearchFilters::default(), 1, 10).await.unwrap_err();

    assert!(matches!(err, GeonodeError::Authentication { .. }));
    assert!(transport.requests_to(CATALOGUE).is_empty());
}

#[tokio::test]
async fn test_vector_resource_detail() {
    let transport = Arc::new(MemoryTransport::new());
    script_login(&transport);
    transport
        .on_get(CATALOGUE, record_by_id(VECTOR_RECORD))
        .on_get(
            "http://geonode.test/api/layers/",
            HttpResponse::new(
                200,
                r#"{"meta": {"total_count": 1}, "objects": [{
                    "id": 12,
                    "title": "Road network",
                    "resource_uri": "/api/layers/12/",
                    "default_style": "/api/styles/4/",
                    "owner": {"username": "admin", "email": "admin@geonode.test"},
                    "metadata_author": {"username": "curator"},
                    "constraints_other": "Attribution required"
                }]}"#,
            ),
        )
        .on_get(
            "http://geonode.test/api/styles/4/",
            HttpResponse::new(
                200,
                r#"{"name": "roads",
                    "sld_url": "http://localhost:8080/geoserver/rest/styles/roads.sld"}"#,
            ),
        );

    let client = CswClient::new(authenticated_settings(), transport.clone());
    let uuid = Uuid::parse_str("5f0c6b0e-2a1b-4c5d-9e8f-001122334455").unwrap();
    let resource = client.get_resource_detail(&uuid).await.unwrap();

    assert_eq!(resource.uuid(), uuid);
    assert_eq!(resource.brief.pk, Some(12));
    assert_eq!(resource.brief.resource_type, Some(ResourceType::VectorLayer));
    assert_eq!(resource.details.language.as_deref(), Some("eng"));
    assert_eq!(resource.details.license.as_deref(), Some("Creative Commons BY 4.0"));
    assert_eq!(resource.details.constraints, "Attribution required");
    let owner = &resource.details.owner;
    assert_eq!(owner.get("email").map(String::as_str), Some("admin@geonode.test"));
    let author = &resource.details.metadata_author;
    assert_eq!(author.get("username").map(String::as_str), Some("curator"));

    let style = resource.details.default_style.as_ref().unwrap();
    assert_eq!(style.name, "roads");
    assert_eq!(style.sld_url, "http://geonode.test/geoserver/rest/styles/roads.sld");
    assert_eq!(resource.details.styles.len(), 1);

    let record_request = &transport.requests_to(CATALOGUE)[0];
    assert!(record_request.url.contains("request=GetRecordById"));
    assert!(record_request.url.contains("id=5f0c6b0e-2a1b-4c5d-9e8f-001122334455"));

    // One login serves the whole chain
    let posts = transport.requests().into_iter().filter(|r| r.method == HttpMethod::Post).count();
    assert_eq!(posts, 1);
}

#[tokio::test]
async fn test_detail_with_expired_session_logs_in_again() {
    let transport = Arc::new(MemoryTransport::new());
    script_login(&transport);
    transport
        .on_get(CATALOGUE, HttpResponse::new(401, ""))
        .on_get(CATALOGUE, record_by_id(RASTER_RECORD))
        .on_get("http://geonode.test/api/layers/", HttpResponse::new(200, r#"{"objects": []}"#));

    let client = CswClient::new(authenticated_settings(), transport.clone());
    let uuid = Uuid::parse_str("0ab4e0a2-6f41-11eb-8e6b-0242ac130003").unwrap();
    let err = client.get_resource_detail(&uuid).await.unwrap_err();

    assert!(matches!(err, GeonodeError::Lookup { .. }));
    let posts = transport.requests().into_iter().filter(|r| r.method == HttpMethod::Post).count();
    assert_eq!(posts, 2);
    assert_eq!(client.session_state(), SessionState::Authenticated);
}
