//! Catalogue client facade

use std::sync::Arc;

use geonode_core::config::ConnectionSettings;
use geonode_core::error::Result;
use geonode_core::models::{
    ApiCapability, BriefResource, FullResource, PaginationInfo, SearchFilters,
};
use geonode_core::ports::{CookieStore, HttpRequest, HttpTransport};
use uuid::Uuid;

use crate::detail::fetch_resource_detail;
use crate::mapper::RecordContext;
use crate::search::{build_search_url, handle_search_response};
use crate::session::{SessionManager, SessionState};

/// Client for a GeoNode catalogue exposed through CSW 2.0.2
pub struct CswClient {
    session: SessionManager,
}

impl CswClient {
    pub fn new(settings: ConnectionSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self { session: SessionManager::new(settings, transport) }
    }

    /// Publish the session cookie into a host cookie store after each login
    pub fn with_host_cookie_store(self, store: Arc<dyn CookieStore>) -> Self {
        Self { session: self.session.with_host_cookie_store(store) }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        self.session.settings()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Features this client supports
    pub fn capabilities(&self) -> Vec<ApiCapability> {
        vec![
            ApiCapability::FilterByName,
            ApiCapability::LoadVectorDatasetViaWms,
            ApiCapability::LoadVectorDatasetViaWfs,
            ApiCapability::LoadRasterDatasetViaWms,
            ApiCapability::LoadRasterDatasetViaWcs,
        ]
    }

    pub fn supports(&self, capability: ApiCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Whether every active axis of `filters` can be sent to the catalogue
    pub fn supports_filters(&self, filters: &SearchFilters) -> bool {
        filters
            .active_axes()
            .into_iter()
            .all(|axis| self.supports(ApiCapability::for_filter(axis)))
    }

    /// Search one page of the catalogue
    pub async fn search_resources(
        &self,
        filters: &SearchFilters,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<BriefResource>, PaginationInfo)> {
        let settings = self.session.settings();
        let url = build_search_url(&settings.catalogue_url(), filters, page, page_size)?;
        tracing::info!(page = page, page_size = page_size, "Searching catalogue");

        let response = self
            .session
            .send_authenticated(HttpRequest::get(&url))
            .await?
            .error_for_status(&url)?;

        let context = RecordContext::new(settings.base(), settings.auth_config.as_deref());
        let (resources, pagination) =
            handle_search_response(response.text()?, page_size, &context)?;

        tracing::info!(
            total = pagination.total_records,
            page = pagination.current_page,
            returned = resources.len(),
            "Catalogue search completed"
        );
        Ok((resources, pagination))
    }

    /// Fetch one resource with its legacy details and default style
    pub async fn get_resource_detail(&self, uuid: &Uuid) -> Result<FullResource> {
        tracing::info!(uuid = %uuid, "Fetching resource detail");
        let resource = fetch_resource_detail(&self.session, uuid).await?;
        tracing::info!(uuid = %uuid, name = %resource.brief.name, "Resource detail resolved");
        Ok(resource)
    }
}
