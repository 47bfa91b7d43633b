//! Fetch and cache plumbing for the ads.txt optimizer.
//!
//! This crate provides the HTTP fetch client, the domain-scoped resource
//! cache, the bounded-concurrency fetch orchestrator with in-flight
//! coalescing, and the partial-access layer over cached sellers.json
//! payloads.

pub mod cache;
pub mod fetch;
pub mod orchestrator;
pub mod sellers;

pub use cache::DomainResourceCache;
pub use fetch::{FetchClient, FetchConfig, FetchOutcome, ResourceFetcher, normalize_domain};
pub use orchestrator::Orchestrator;
pub use sellers::{BatchSellers, MetadataAndSummary, SellerLookup, SellersJsonPartialAccessor, SpecificSellers};
