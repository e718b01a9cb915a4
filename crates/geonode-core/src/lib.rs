//! GeoNode Core - Resource model, configuration, and transport ports
//!
//! This crate contains the domain types shared by the catalogue client and the
//! port definitions its environment must provide (HTTP transport, cookie store).

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

pub use error::{GeonodeError, Result};
