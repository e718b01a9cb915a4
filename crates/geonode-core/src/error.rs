//! Error types for the GeoNode catalogue client

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeonodeError {
    // Session errors
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    // Server response errors
    #[error("Unexpected server response: {reason}")]
    Protocol { reason: String },

    #[error("HTTP {status} from {url}")]
    Transport { status: u16, url: String },

    #[error("Could not reach {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("Malformed XML document: {0}")]
    Xml(String),

    // Record mapping errors
    #[error("Malformed metadata record: field '{field}' {reason}")]
    MalformedRecord { field: String, reason: String },

    // Detail enrichment errors
    #[error("Lookup of '{title}' failed: {reason}")]
    Lookup { title: String, reason: String },

    // Search errors
    #[error("Filter '{filter}' is not supported by this catalogue client")]
    UnsupportedFilter { filter: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GeonodeError {
    /// Shorthand for a required record field that is absent
    pub fn missing_field(field: impl Into<String>) -> Self {
        GeonodeError::MalformedRecord {
            field: field.into(),
            reason: "is missing".to_string(),
        }
    }

    /// Whether this error means the session is no longer accepted by the server
    pub fn is_auth_failure(&self) -> bool {
        match self {
            GeonodeError::Authentication { .. } => true,
            GeonodeError::Transport { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GeonodeError>;
