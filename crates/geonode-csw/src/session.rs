//! Session handling for the catalogue web application
//!
//! The CSW endpoint has no token API; it trusts the same browser session as
//! the GeoNode web pages. Logging in means fetching the login page to obtain a
//! CSRF cookie, posting the credentials with that token, and keeping the
//! session cookie the server sets in response.
//!
//! State machine: `Anonymous -> Authenticating -> Authenticated`, and back to
//! `Anonymous` when a protected call is rejected. Logins are serialized per
//! manager so concurrent requests never race on the shared cookie jar.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use geonode_core::config::{ConnectionSettings, Credentials};
use geonode_core::error::{GeonodeError, Result};
use geonode_core::ports::{Cookie, CookieStore, HttpRequest, HttpResponse, HttpTransport, SetCookie};
use url::Url;

/// Cookie carrying Django's CSRF token
pub const CSRF_COOKIE: &str = "csrftoken";

/// Cookie carrying the authenticated session id
pub const SESSION_COOKIE: &str = "sessionid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
}

type CookieKey = (String, String, String);

/// In-memory cookie store keyed by `(host, path, name)`
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<HashMap<CookieKey, String>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the cookies a response set for a request to `request_host`
    ///
    /// An empty value deletes the cookie.
    pub fn absorb(&self, request_host: &str, set_cookies: &[SetCookie]) {
        for set_cookie in set_cookies {
            let host = set_cookie
                .domain
                .as_deref()
                .map(|domain| domain.trim_start_matches('.'))
                .filter(|domain| !domain.is_empty())
                .unwrap_or(request_host);
            let path = set_cookie.path.as_deref().unwrap_or("/");

            if set_cookie.value.is_empty() {
                self.remove(host, path, &set_cookie.name);
            } else {
                self.insert(Cookie::new(host, path, &set_cookie.name, &set_cookie.value));
            }
        }
    }

    pub fn remove(&self, host: &str, path: &str, name: &str) {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(host.to_string(), path.to_string(), name.to_string()));
    }

    /// Value for a `Cookie` request header, if any cookie applies
    pub fn header_value(&self, host: &str, path: &str) -> Option<String> {
        let mut cookies = self.matching(host, path);
        if cookies.is_empty() {
            return None;
        }
        cookies.sort_by(|a, b| a.name.cmp(&b.name));
        Some(
            cookies
                .iter()
                .map(|cookie| format!("{}={}", cookie.name, cookie.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

pub(crate) fn host_matches(cookie_host: &str, request_host: &str) -> bool {
    request_host == cookie_host
        || request_host
            .strip_suffix(cookie_host)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

impl CookieStore for CookieJar {
    fn get(&self, host: &str, path: &str, name: &str) -> Option<String> {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(host.to_string(), path.to_string(), name.to_string()))
            .cloned()
    }

    fn insert(&self, cookie: Cookie) {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((cookie.host, cookie.path, cookie.name), cookie.value);
    }

    fn matching(&self, host: &str, path: &str) -> Vec<Cookie> {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((cookie_host, cookie_path, _), _)| {
                host_matches(cookie_host, host) && path.starts_with(cookie_path.as_str())
            })
            .map(|((cookie_host, cookie_path, name), value)| {
                Cookie::new(cookie_host, cookie_path, name, value)
            })
            .collect()
    }

    fn clear_host(&self, host: &str) {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(cookie_host, _, _), _| cookie_host != host);
    }
}

fn request_scope(url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(url).map_err(|e| GeonodeError::Connection {
        url: url.to_string(),
        reason: format!("invalid URL: {}", e),
    })?;
    let host = parsed.host_str().ok_or_else(|| GeonodeError::Connection {
        url: url.to_string(),
        reason: "URL has no host".to_string(),
    })?;
    Ok((host.to_string(), parsed.path().to_string()))
}

fn is_auth_rejection(status: u16) -> bool {
    status == 401 || status == 403
}

/// Owns the session state and cookie jar for one catalogue connection
pub struct SessionManager {
    settings: ConnectionSettings,
    transport: Arc<dyn HttpTransport>,
    jar: CookieJar,
    host_cookies: Option<Arc<dyn CookieStore>>,
    state: RwLock<SessionState>,
    /// Bumped on every successful login
    epoch: AtomicU64,
    login_lock: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(settings: ConnectionSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            settings,
            transport,
            jar: CookieJar::new(),
            host_cookies: None,
            state: RwLock::new(SessionState::Anonymous),
            epoch: AtomicU64::new(0),
            login_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Also publish the session cookie into the host application's cookie store
    pub fn with_host_cookie_store(mut self, store: Arc<dyn CookieStore>) -> Self {
        self.host_cookies = Some(store);
        self
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of successful logins so far
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn cookie_jar(&self) -> &CookieJar {
        &self.jar
    }

    /// Whether protected calls need a logged-in session
    pub fn requires_login(&self) -> bool {
        self.settings.credentials.is_some()
    }

    /// Execute a request with the jar's cookies and keep any cookies it sets
    pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let (host, path) = request_scope(&request.url)?;
        if let Some(cookie_header) = self.jar.header_value(&host, &path) {
            request.headers.push(("Cookie".to_string(), cookie_header));
        }

        let url = request.url.clone();
        tracing::debug!(method = request.method.as_str(), url = %url, "Sending catalogue request");
        let response = self.transport.execute(request).await?;
        tracing::debug!(url = %url, status = response.status, "Catalogue responded");

        self.jar.absorb(&host, &response.cookies);
        Ok(response)
    }

    /// Fetch `url` and read the CSRF cookie it set for its host
    ///
    /// Returns `None` when the page does not answer with success or sets no token.
    pub async fn fetch_csrf_token(&self, url: &str) -> Result<Option<String>> {
        let (host, _) = request_scope(url)?;
        let response = self.send(HttpRequest::get(url)).await?;
        if !response.is_success() {
            tracing::warn!(
                url = %url,
                status = response.status,
                "Login page did not answer with success"
            );
            return Ok(None);
        }
        Ok(self.jar.get(&host, "/", CSRF_COOKIE))
    }

    /// Log in with the configured credentials
    pub async fn login(&self) -> Result<()> {
        let credentials = self.settings.credentials.as_ref().ok_or_else(|| {
            GeonodeError::Authentication { reason: "no credentials configured".to_string() }
        })?;
        let _guard = self.login_lock.lock().await;
        self.login_locked(credentials).await
    }

    /// Log in unless a session is already established or not needed
    pub async fn ensure_authenticated(&self) -> Result<()> {
        let Some(credentials) = self.settings.credentials.as_ref() else {
            return Ok(());
        };
        if self.state() == SessionState::Authenticated {
            return Ok(());
        }

        let _guard = self.login_lock.lock().await;
        // Another request may have logged in while this one waited
        if self.state() == SessionState::Authenticated {
            return Ok(());
        }
        self.login_locked(credentials).await
    }

    /// Forget the current session
    pub fn invalidate(&self) {
        self.jar.remove(self.settings.host(), "/", SESSION_COOKIE);
        self.set_state(SessionState::Anonymous);
    }

    /// Send a request that needs the session, logging in again once if rejected
    pub async fn send_authenticated(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.ensure_authenticated().await?;
        let epoch = self.epoch();
        let response = self.send(request.clone()).await?;
        if !self.requires_login() || !is_auth_rejection(response.status) {
            return Ok(response);
        }

        tracing::warn!(
            url = %request.url,
            status = response.status,
            "Session rejected by catalogue, logging in again"
        );
        let url = request.url.clone();
        let epoch = self.reauthenticate(epoch).await?;

        let retried = self.send(request).await?;
        if is_auth_rejection(retried.status) {
            let _guard = self.login_lock.lock().await;
            if self.epoch() == epoch {
                self.invalidate();
            }
            return Err(GeonodeError::Authentication {
                reason: format!(
                    "{} answered HTTP {} after logging in again",
                    url, retried.status
                ),
            });
        }
        Ok(retried)
    }

    /// Replace the session rejected at `stale_epoch`, returning the epoch to retry with.
    ///
    /// A request that waited on the lock while another one already logged in again
    /// reuses that newer session instead of discarding it.
    async fn reauthenticate(&self, stale_epoch: u64) -> Result<u64> {
        let Some(credentials) = self.settings.credentials.as_ref() else {
            return Ok(self.epoch());
        };
        let _guard = self.login_lock.lock().await;
        let current = self.epoch();
        if current != stale_epoch && self.state() == SessionState::Authenticated {
            tracing::debug!(epoch = current, "Session already renewed by a concurrent request");
            return Ok(current);
        }
        self.invalidate();
        self.login_locked(credentials).await?;
        Ok(self.epoch())
    }

    async fn login_locked(&self, credentials: &Credentials) -> Result<()> {
        self.set_state(SessionState::Authenticating);
        let result = self.perform_login(credentials).await;
        match result {
            Ok(()) => {
                self.epoch.fetch_add(1, Ordering::AcqRel);
                self.set_state(SessionState::Authenticated);
            }
            Err(_) => self.set_state(SessionState::Anonymous),
        }
        result
    }

    async fn perform_login(&self, credentials: &Credentials) -> Result<()> {
        let login_url = self.settings.login_url();
        let host = self.settings.host().to_string();

        let token = self.fetch_csrf_token(&login_url).await?.ok_or_else(|| {
            GeonodeError::Authentication {
                reason: format!("no CSRF token available from {}", login_url),
            }
        })?;

        let form = vec![
            ("login".to_string(), credentials.username.clone()),
            ("password".to_string(), credentials.password.clone()),
            ("csrfmiddlewaretoken".to_string(), token),
        ];
        let request = HttpRequest::post_form(&login_url, form).with_header("Referer", &login_url);
        let response = self.send(request).await?;
        if response.status != 200 {
            return Err(GeonodeError::Authentication {
                reason: format!("login form answered HTTP {}", response.status),
            });
        }

        let session_id = self.jar.get(&host, "/", SESSION_COOKIE).ok_or_else(|| {
            GeonodeError::Authentication {
                reason: "login did not set a session cookie".to_string(),
            }
        })?;

        if let Some(store) = &self.host_cookies {
            store.insert(Cookie::new(&host, "/", SESSION_COOKIE, session_id));
        }

        tracing::info!(host = %host, username = %credentials.username, "Logged in to catalogue");
        Ok(())
    }
}
