//! SQLite-backed cache store for domain-scoped resources.
//!
//! This module provides the persistent key-value store behind the domain
//! resource cache, using SQLite with async access via tokio-rusqlite.
//! It supports:
//!
//! - Rows keyed by `(resource_type, domain)` with upsert semantics
//! - Persisted sellers.json summaries for metadata-only access
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod migrations;
pub mod resources;
pub mod summaries;

pub use crate::Error;

pub use connection::CacheDb;
pub use resources::{CachedResource, FetchStatus, ResourceType, is_expired};
pub use summaries::SellerSummaryRow;
