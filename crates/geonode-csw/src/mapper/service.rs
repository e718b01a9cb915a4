//! Service access descriptors handed to the host's data providers
//!
//! WMS and WCS descriptors are `key=value` pairs joined with `&`, with any `=`
//! inside a value escaped as `%3D`. WFS descriptors are space separated
//! `key='value'` pairs. Consumers parse each format exactly as produced here.

use std::collections::BTreeMap;

use geonode_core::models::{Crs, GeonodeService, ResourceType};

use super::extract::find_protocol_linkage;
use crate::xml::Element;

/// Image format requested from WMS
pub const DEFAULT_WMS_FORMAT: &str = "image/png";

/// Let the host negotiate the service version
const VERSION_AUTO: &str = "auto";

/// Build the access descriptors a resource type supports
///
/// A service whose transfer option is missing from the record is left out.
pub fn build_service_urls(
    record: &Element,
    resource_type: Option<ResourceType>,
    layer_name: &str,
    crs: Option<&Crs>,
    auth_config: Option<&str>,
) -> BTreeMap<GeonodeService, String> {
    let mut service_urls = BTreeMap::new();
    let Some(resource_type) = resource_type else {
        return service_urls;
    };

    for service in resource_type.services() {
        let Some(protocol) = service.protocol() else {
            continue;
        };
        let Some(linkage) = find_protocol_linkage(record, protocol) else {
            tracing::warn!(
                layer = layer_name,
                protocol = protocol,
                "Record has no transfer option for service, skipping"
            );
            continue;
        };

        let descriptor = match service {
            GeonodeService::OgcWms => wms_descriptor(&linkage, layer_name, crs, auth_config),
            GeonodeService::OgcWfs => wfs_descriptor(&linkage, layer_name, auth_config),
            GeonodeService::OgcWcs => wcs_descriptor(&linkage, layer_name, auth_config),
            GeonodeService::FileDownload => continue,
        };
        service_urls.insert(*service, descriptor);
    }

    service_urls
}

pub fn wms_descriptor(
    url: &str,
    layer_name: &str,
    crs: Option<&Crs>,
    auth_config: Option<&str>,
) -> String {
    let crs = crs.map(Crs::to_string);
    let mut params = vec![("url", url), ("format", DEFAULT_WMS_FORMAT), ("layers", layer_name)];
    if let Some(crs) = crs.as_deref() {
        params.push(("crs", crs));
    }
    params.push(("styles", ""));
    params.push(("version", VERSION_AUTO));
    if let Some(auth_config) = auth_config {
        params.push(("authcfg", auth_config));
    }
    join_escaped(&params)
}

pub fn wcs_descriptor(url: &str, layer_name: &str, auth_config: Option<&str>) -> String {
    let mut params = vec![("identifier", layer_name), ("url", url)];
    if let Some(auth_config) = auth_config {
        params.push(("authcfg", auth_config));
    }
    join_escaped(&params)
}

pub fn wfs_descriptor(url: &str, layer_name: &str, auth_config: Option<&str>) -> String {
    let mut params = vec![("url", url), ("typename", layer_name), ("version", VERSION_AUTO)];
    if let Some(auth_config) = auth_config {
        params.push(("authcfg", auth_config));
    }
    join_quoted(&params)
}

fn join_escaped(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value.replace('=', "%3D")))
        .collect::<Vec<_>>()
        .join("&")
}

fn join_quoted(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}='{}'", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}
