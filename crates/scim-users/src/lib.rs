//! SCIM 2.0 user directory client.
//!
//! Provides typed SCIM user structures and an asynchronous client for looking up, listing,
//! updating and deleting accounts on a Q&A platform's SCIM endpoint.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{DirectoryClient, DirectoryClientBuilder, MAX_DELETE_RETRIES};
pub use models::{
    Email, ListResponse, Meta, Name, PageRequest, PatchOperation, PatchRequest, ScimErrorBody,
    ScimUser, UserRole, PAGE_SIZE, SCHEMA_PATCH_OP, SCHEMA_USER,
};

/// Convenient result alias that reuses the shared SCIM error type.
pub type Result<T> = scim_core::Result<T>;
