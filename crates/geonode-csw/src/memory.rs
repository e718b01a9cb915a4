//! In-memory transport for development and testing.
//!
//! Responses are scripted per method and URL prefix; every request is
//! recorded so tests can assert on what was sent.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use geonode_core::error::Result;
use geonode_core::ports::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};

#[derive(Debug)]
struct Route {
    method: HttpMethod,
    url_prefix: String,
    responses: VecDeque<HttpResponse>,
}

/// Scripted implementation of HttpTransport
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MemoryTransport {
    /// Create a transport with no routes; unmatched requests get HTTP 404
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for requests whose URL starts with `url_prefix`
    ///
    /// Queued responses are served in order and the last one repeats. When
    /// several routes match, the longest prefix wins.
    pub fn respond(&self, method: HttpMethod, url_prefix: &str, response: HttpResponse) -> &Self {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        match routes
            .iter_mut()
            .find(|route| route.method == method && route.url_prefix == url_prefix)
        {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                url_prefix: url_prefix.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    pub fn on_get(&self, url_prefix: &str, response: HttpResponse) -> &Self {
        self.respond(HttpMethod::Get, url_prefix, response)
    }

    pub fn on_post(&self, url_prefix: &str, response: HttpResponse) -> &Self {
        self.respond(HttpMethod::Post, url_prefix, response)
    }

    /// Every request executed so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Requests whose URL starts with `url_prefix`
    pub fn requests_to(&self, url_prefix: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url.starts_with(url_prefix))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for MemoryTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = {
            let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            routes
                .iter_mut()
                .filter(|route| {
                    route.method == request.method && request.url.starts_with(&route.url_prefix)
                })
                .max_by_key(|route| route.url_prefix.len())
                .and_then(|route| {
                    if route.responses.len() > 1 {
                        route.responses.pop_front()
                    } else {
                        route.responses.front().cloned()
                    }
                })
                .unwrap_or_else(|| HttpResponse::new(404, "no route"))
        };

        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        Ok(response)
    }
}
