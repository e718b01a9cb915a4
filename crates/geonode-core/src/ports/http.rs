use async_trait::async_trait;

use crate::error::{GeonodeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An outgoing HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,

    /// Form fields, sent `application/x-www-form-urlencoded`
    pub form: Option<Vec<(String, String)>>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: HttpMethod::Get, url: url.into(), headers: Vec::new(), form: None }
    }

    pub fn post_form(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self { method: HttpMethod::Post, url: url.into(), headers: Vec::new(), form: Some(form) }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A cookie set by the server on a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,

    /// Domain attribute; the request host applies when absent
    pub domain: Option<String>,

    /// Path attribute; `/` applies when absent
    pub path: Option<String>,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), domain: None, path: None }
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,

    /// Cookies set while producing this response, redirects included
    pub cookies: Vec<SetCookie>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into(), cookies: Vec::new() }
    }

    pub fn with_cookie(mut self, cookie: SetCookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx status into a transport error
    pub fn error_for_status(self, url: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GeonodeError::Transport { status: self.status, url: url.to_string() })
        }
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|e| GeonodeError::Serialization(format!("Response body is not UTF-8: {}", e)))
    }
}

/// Port for the HTTP transport supplied by the host
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute a request and return the final response
    ///
    /// Non-2xx statuses are returned as responses, not errors. Errors are
    /// reserved for exchanges that could not complete at all.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
