use serde::{Deserialize, Serialize};

/// A cookie scoped to a host and path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cookie {
    pub host: String,
    pub path: String,
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self { host: host.into(), path: path.into(), name: name.into(), value: value.into() }
    }
}

/// Port for a cookie store keyed by `(host, path, name)`
pub trait CookieStore: Send + Sync {
    fn get(&self, host: &str, path: &str, name: &str) -> Option<String>;

    /// Insert a cookie, replacing any cookie with the same key
    fn insert(&self, cookie: Cookie);

    /// Cookies whose host matches and whose path is a prefix of `path`
    fn matching(&self, host: &str, path: &str) -> Vec<Cookie>;

    /// Drop every cookie stored for a host
    fn clear_host(&self, host: &str);
}
