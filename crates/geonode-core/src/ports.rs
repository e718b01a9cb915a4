//! Port trait definitions
//!
//! These traits define what the host environment must provide to the client.

pub mod cookies;
pub mod http;

pub use cookies::{Cookie, CookieStore};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, SetCookie};
