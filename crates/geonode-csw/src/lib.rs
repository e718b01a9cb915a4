//! GeoNode CSW - Catalogue client for GeoNode's CSW endpoint
//!
//! Searches the catalogue through CSW 2.0.2, maps ISO 19139 records into the
//! resource model, and enriches single-resource details through the legacy
//! REST API. The catalogue endpoint relies on the web application's browser
//! session, so the client logs in with a CSRF-protected form before issuing
//! protected calls.

pub mod client;
pub mod detail;
pub mod mapper;
pub mod memory;
pub mod search;
pub mod session;
pub mod transport;
pub mod xml;

pub use client::CswClient;
pub use memory::MemoryTransport;
pub use session::{CookieJar, SessionManager, SessionState};
pub use transport::ReqwestTransport;
