//! Core types and shared functionality for the ads.txt optimizer.
//!
//! This crate provides:
//! - SQLite-backed resource cache store
//! - Unified error types
//! - Configuration structures
//! - ads.txt record and sellers.json document types

pub mod cache;
pub mod config;
pub mod error;
pub mod records;
pub mod sellers;

pub use cache::{CacheDb, CachedResource, FetchStatus, ResourceType, SellerSummaryRow};
pub use config::AppConfig;
pub use error::Error;
