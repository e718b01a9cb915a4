//! HTTP transport backed by reqwest
//!
//! Redirects are followed here rather than by reqwest so that cookies set on
//! intermediate responses reach the session manager. Django answers a
//! successful login with a redirect that carries the session cookie.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE, COOKIE, LOCATION};
use reqwest::redirect::Policy;
use std::time::Duration;

use geonode_core::error::{GeonodeError, Result};
use geonode_core::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, SetCookie};
use url::{form_urlencoded, Url};

use crate::session::host_matches;

/// Maximum number of redirects followed for one request
pub const MAX_REDIRECTS: usize = 10;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HttpTransport implementation over a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .user_agent(concat!("geonode-csw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GeonodeError::Connection {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    async fn send_once(
        &self,
        method: HttpMethod,
        url: &Url,
        request: &HttpRequest,
        cookie_header: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut builder = match method {
            HttpMethod::Get => self.client.get(url.clone()),
            HttpMethod::Post => self.client.post(url.clone()),
        };

        for (name, value) in &request.headers {
            if !name.eq_ignore_ascii_case("cookie") {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if let Some(cookies) = cookie_header {
            builder = builder.header(COOKIE, cookies);
        }
        if let (HttpMethod::Post, Some(form)) = (method, &request.form) {
            let body = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(form)
                .finish();
            let form_type = HeaderValue::from_static("application/x-www-form-urlencoded");
            builder = builder.header(CONTENT_TYPE, form_type).body(body);
        }

        builder.send().await.map_err(|e| GeonodeError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| GeonodeError::Connection {
        url: raw.to_string(),
        reason: format!("invalid URL: {}", e),
    })
}

fn collect_cookies(response: &reqwest::Response, hop_host: &str, into: &mut Vec<SetCookie>) {
    for cookie in response.cookies() {
        let set_cookie = SetCookie {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(str::to_string),
            path: cookie.path().map(str::to_string),
        };
        into.push(scope_to_hop(set_cookie, hop_host));
    }
}

/// Host-only cookies belong to the host of the hop that set them
fn scope_to_hop(mut cookie: SetCookie, hop_host: &str) -> SetCookie {
    if cookie.domain.as_deref().map_or(true, str::is_empty) {
        cookie.domain = Some(hop_host.to_string());
    }
    cookie
}

/// Merge cookies set during a redirect chain into a `Cookie` header value for `host`
///
/// `initial` holds the caller's cookies and is only passed for the original host.
fn merge_cookie_header(
    initial: Option<&str>,
    collected: &[SetCookie],
    host: &str,
) -> Option<String> {
    let mut pairs: Vec<(String, String)> = initial
        .into_iter()
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    let applicable = collected.iter().filter(|cookie| {
        cookie
            .domain
            .as_deref()
            .map(|domain| domain.trim_start_matches('.'))
            .is_some_and(|domain| host_matches(domain, host))
    });
    for cookie in applicable {
        pairs.retain(|(name, _)| name != &cookie.name);
        if !cookie.value.is_empty() {
            pairs.push((cookie.name.clone(), cookie.value.clone()));
        }
    }

    if pairs.is_empty() {
        None
    } else {
        let header = pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        Some(header)
    }
}

fn redirect_method(status: u16, method: HttpMethod) -> HttpMethod {
    match status {
        307 | 308 => method,
        _ => HttpMethod::Get,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let origin = parse_url(&request.url)?;
        let initial_cookies = request.header("Cookie").map(str::to_string);

        let mut url = origin.clone();
        let mut method = request.method;
        let mut collected: Vec<SetCookie> = Vec::new();

        for _ in 0..=MAX_REDIRECTS {
            let hop_host = url.host_str().unwrap_or_default().to_string();
            let initial = if url.host_str() == origin.host_str() {
                initial_cookies.as_deref()
            } else {
                None
            };
            let cookie_header = merge_cookie_header(initial, &collected, &hop_host);

            let response = self
                .send_once(method, &url, &request, cookie_header.as_deref())
                .await?;
            collect_cookies(&response, &hop_host, &mut collected);

            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            if status.is_redirection() {
                if let Some(location) = location {
                    let next = url.join(&location).map_err(|e| GeonodeError::Connection {
                        url: url.to_string(),
                        reason: format!("invalid redirect target {:?}: {}", location, e),
                    })?;
                    tracing::debug!(
                        from = %url,
                        to = %next,
                        status = status.as_u16(),
                        "Following redirect"
                    );
                    method = redirect_method(status.as_u16(), method);
                    url = next;
                    continue;
                }
            }

            let body = response.bytes().await.map_err(|e| GeonodeError::Connection {
                url: url.to_string(),
                reason: format!("Failed to read response body: {}", e),
            })?;

            return Ok(HttpResponse {
                status: status.as_u16(),
                body: body.to_vec(),
                cookies: collected,
            });
        }

        Err(GeonodeError::Connection {
            url: request.url,
            reason: format!("more than {} redirects", MAX_REDIRECTS),
        })
    }
}
