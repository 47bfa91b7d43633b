//! Domain-scoped resource cache with staleness-gated refresh.
//!
//! `get_or_fetch` is the single read path: a fresh row is returned without
//! touching the network or the store; anything else (absent or stale)
//! triggers one fetch and exactly one upsert.

use std::sync::Arc;
use std::time::Duration;

use adstxt_core::Error;
use adstxt_core::cache::{CacheDb, CachedResource, ResourceType, is_expired};

use crate::fetch::{ResourceFetcher, normalize_domain};

/// Read-through cache over [`CacheDb`] and a [`ResourceFetcher`].
pub struct DomainResourceCache<F: ResourceFetcher> {
    db: CacheDb,
    fetcher: Arc<F>,
}

impl<F: ResourceFetcher> Clone for DomainResourceCache<F> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), fetcher: Arc::clone(&self.fetcher) }
    }
}

impl<F: ResourceFetcher> DomainResourceCache<F> {
    pub fn new(db: CacheDb, fetcher: Arc<F>) -> Self {
        Self { db, fetcher }
    }

    /// Handle to the underlying store, for read-only consumers such as the
    /// sellers.json accessor.
    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Return the cached resource for `(resource_type, domain)`, refetching
    /// if absent or older than `ttl`.
    ///
    /// Remote failures are encoded in the returned record's status; only
    /// store failures surface as `Err`.
    pub async fn get_or_fetch(
        &self, resource_type: ResourceType, domain: &str, ttl: Duration,
    ) -> Result<CachedResource, Error> {
        let domain = normalize_domain(domain);

        if let Some(cached) = self.db.get_resource(resource_type, &domain).await?
            && !is_expired(&cached.updated_at, ttl)
        {
            tracing::debug!(%domain, resource_type = %resource_type, "cache hit");
            return Ok(cached);
        }

        tracing::debug!(%domain, resource_type = %resource_type, "cache miss, fetching");
        let outcome = self.fetcher.fetch(resource_type, &domain).await;

        let record = CachedResource {
            resource_type,
            domain: domain.clone(),
            status: outcome.status,
            status_code: outcome.status_code,
            error_message: outcome.error_message,
            content: outcome.content,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };

        self.db.upsert_resource(&record).await?;

        Ok(record)
    }
}
