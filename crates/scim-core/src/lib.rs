//! # scim-core
//!
//! Core types and utilities for talking to SCIM 2.0 user directories.
//!
//! This crate provides the shared error type, connection configuration and HTTP client
//! construction used by the directory client crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and HTTP status code mapping
//! - [`config`] - Connection configuration and endpoint layout detection
//! - [`client`] - HTTP client settings and construction
//! - [`query`] - Query parameter builder

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;

// Re-export commonly used types
pub use config::{Deployment, ScimConfig};
pub use error::{Error, Result};
