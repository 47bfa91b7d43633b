//! Partial-access layer over cached sellers.json payloads.
//!
//! Queries go through a [`SellersView`] seam with two interchangeable
//! backings, selected by what the cache holds:
//!
//! - [`SummaryBacked`]: a persisted summary row answers metadata and
//!   summary queries without touching the (possibly multi-megabyte) seller
//!   array.
//! - [`FullArrayBacked`]: no usable summary yet; one streaming pass over
//!   the cached content answers the query and the derived summary is
//!   persisted for next time.
//!
//! Targeted seller lookups always scan the cached array, one streaming
//! pass per call; the array is never retained. Absence of cached data is
//! not an error: it surfaces as `is_cache_miss` / `found = false` so the
//! classifier can fall back to the "no sellers.json" category.

pub mod scan;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use adstxt_core::Error;
use adstxt_core::cache::{CacheDb, FetchStatus, ResourceType, SellerSummaryRow, is_expired};
use adstxt_core::sellers::{Seller, SellerSummary, SellersJsonMetadata, normalize_seller_id};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

pub use scan::{ScanOutcome, scan_document};

use crate::fetch::normalize_domain;

/// Result of a metadata/summary query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataAndSummary {
    pub metadata: Option<SellersJsonMetadata>,
    pub summary: Option<SellerSummary>,
    /// Status of the cached resource row, when one exists.
    pub cache_status: Option<FetchStatus>,
    /// True when no fresh cached row exists; the caller should run the
    /// fetch path and retry.
    pub is_cache_miss: bool,
}

/// Result of a targeted seller lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecificSellers {
    pub matching_sellers: Vec<Seller>,
    pub found_count: usize,
    pub cache_status: Option<FetchStatus>,
    pub is_cache_miss: bool,
}

/// One entry of a batched lookup result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerLookup {
    pub account_id: String,
    pub seller: Option<Seller>,
    pub found: bool,
}

/// Result of a batched lookup: one entry per requested id, single pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSellers {
    pub results: Vec<SellerLookup>,
    pub metadata: Option<SellersJsonMetadata>,
    pub cache_status: Option<FetchStatus>,
    pub is_cache_miss: bool,
}

/// A readable view over one domain's sellers.json data.
trait SellersView {
    /// Metadata and summary counts. Summary-backed views answer from the
    /// persisted row without materializing the seller array.
    fn metadata_and_summary(&self) -> Result<(SellersJsonMetadata, SellerSummary), Error>;

    /// One streaming pass over the seller array, returning matches for
    /// `wanted` plus the metadata/summary the pass derived.
    fn scan(&self, wanted: &HashSet<String>) -> Result<ScanOutcome, Error>;

    /// Whether answers are derived from content (and the summary should be
    /// persisted for future queries).
    fn derived_from_content(&self) -> bool;
}

/// View backed by a persisted summary row.
struct SummaryBacked {
    row: SellerSummaryRow,
    content: String,
}

impl SellersView for SummaryBacked {
    fn metadata_and_summary(&self) -> Result<(SellersJsonMetadata, SellerSummary), Error> {
        Ok((self.row.metadata()?, self.row.summary()))
    }

    fn scan(&self, wanted: &HashSet<String>) -> Result<ScanOutcome, Error> {
        scan_document(&self.content, wanted).map_err(|e| Error::ParseFailed(e.to_string()))
    }

    fn derived_from_content(&self) -> bool {
        false
    }
}

/// View backed by the raw cached content; every answer is one pass.
struct FullArrayBacked {
    content: String,
}

impl SellersView for FullArrayBacked {
    fn metadata_and_summary(&self) -> Result<(SellersJsonMetadata, SellerSummary), Error> {
        let outcome = self.scan(&HashSet::new())?;
        Ok((outcome.metadata, outcome.summary))
    }

    fn scan(&self, wanted: &HashSet<String>) -> Result<ScanOutcome, Error> {
        scan_document(&self.content, wanted).map_err(|e| Error::ParseFailed(e.to_string()))
    }

    fn derived_from_content(&self) -> bool {
        true
    }
}

enum ViewState {
    /// Fresh successful row; queries can be answered.
    Available { view: Box<dyn SellersView + Send + Sync>, updated_at: String },
    /// Fresh row recording that no usable sellers.json exists.
    NoData { status: FetchStatus },
    /// No row, or a stale one; the caller should fetch.
    Miss { last_status: Option<FetchStatus> },
}

/// Domain-scoped accessor over cached sellers.json data.
#[derive(Clone)]
pub struct SellersJsonPartialAccessor {
    db: CacheDb,
    ttl: Duration,
}

impl SellersJsonPartialAccessor {
    pub fn new(db: CacheDb, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Metadata and summary for a domain, without materializing the seller
    /// array when a persisted summary is available.
    pub async fn get_metadata_and_summary(&self, domain: &str) -> Result<MetadataAndSummary, Error> {
        match self.view_for(domain).await? {
            ViewState::Available { view, updated_at } => {
                let (metadata, summary) = view.metadata_and_summary()?;
                if view.derived_from_content() {
                    self.persist_summary(domain, &metadata, &summary, &updated_at).await;
                }
                Ok(MetadataAndSummary {
                    metadata: Some(metadata),
                    summary: Some(summary),
                    cache_status: Some(FetchStatus::Success),
                    is_cache_miss: false,
                })
            }
            ViewState::NoData { status } => Ok(MetadataAndSummary {
                metadata: None,
                summary: None,
                cache_status: Some(status),
                is_cache_miss: false,
            }),
            ViewState::Miss { last_status } => Ok(MetadataAndSummary {
                metadata: None,
                summary: None,
                cache_status: last_status,
                is_cache_miss: true,
            }),
        }
    }

    /// Sellers whose id matches one of `account_ids`, in one streaming
    /// pass over the cached array.
    pub async fn get_specific_sellers(&self, domain: &str, account_ids: &[String]) -> Result<SpecificSellers, Error> {
        match self.view_for(domain).await? {
            ViewState::Available { view, updated_at } => {
                let wanted: HashSet<String> = account_ids.iter().map(|id| normalize_seller_id(id)).collect();
                let outcome = view.scan(&wanted)?;
                if view.derived_from_content() {
                    self.persist_summary(domain, &outcome.metadata, &outcome.summary, &updated_at)
                        .await;
                }
                let found_count = outcome.matches.len();
                Ok(SpecificSellers {
                    matching_sellers: outcome.matches,
                    found_count,
                    cache_status: Some(FetchStatus::Success),
                    is_cache_miss: false,
                })
            }
            ViewState::NoData { status } => Ok(SpecificSellers {
                matching_sellers: Vec::new(),
                found_count: 0,
                cache_status: Some(status),
                is_cache_miss: false,
            }),
            ViewState::Miss { last_status } => Ok(SpecificSellers {
                matching_sellers: Vec::new(),
                found_count: 0,
                cache_status: last_status,
                is_cache_miss: true,
            }),
        }
    }

    /// Batched lookup: one result per requested id, resolved in a single
    /// pass, plus document metadata.
    pub async fn batch_get_sellers(&self, domain: &str, account_ids: &[String]) -> Result<BatchSellers, Error> {
        match self.view_for(domain).await? {
            ViewState::Available { view, updated_at } => {
                let wanted: HashSet<String> = account_ids.iter().map(|id| normalize_seller_id(id)).collect();
                let outcome = view.scan(&wanted)?;
                if view.derived_from_content() {
                    self.persist_summary(domain, &outcome.metadata, &outcome.summary, &updated_at)
                        .await;
                }

                let by_id: HashMap<String, Seller> = outcome
                    .matches
                    .into_iter()
                    .map(|s| (normalize_seller_id(&s.seller_id), s))
                    .collect();

                // A repeated id gets the same answer in every slot.
                let results = account_ids
                    .iter()
                    .map(|id| {
                        let seller = by_id.get(&normalize_seller_id(id)).cloned();
                        let found = seller.is_some();
                        SellerLookup { account_id: id.clone(), seller, found }
                    })
                    .collect();

                Ok(BatchSellers {
                    results,
                    metadata: Some(outcome.metadata),
                    cache_status: Some(FetchStatus::Success),
                    is_cache_miss: false,
                })
            }
            ViewState::NoData { status } => Ok(BatchSellers {
                results: missing_lookups(account_ids),
                metadata: None,
                cache_status: Some(status),
                is_cache_miss: false,
            }),
            ViewState::Miss { last_status } => Ok(BatchSellers {
                results: missing_lookups(account_ids),
                metadata: None,
                cache_status: last_status,
                is_cache_miss: true,
            }),
        }
    }

    /// Select the view backing for a domain from what the cache holds.
    async fn view_for(&self, domain: &str) -> Result<ViewState, Error> {
        let domain = normalize_domain(domain);

        let Some(resource) = self.db.get_resource(ResourceType::SellersJson, &domain).await? else {
            return Ok(ViewState::Miss { last_status: None });
        };

        if is_expired(&resource.updated_at, self.ttl) {
            return Ok(ViewState::Miss { last_status: Some(resource.status) });
        }

        let Some(content) = resource.content else {
            return Ok(ViewState::NoData { status: resource.status });
        };

        // A summary row backs the view only if it is at least as new as the
        // content it was derived from.
        let view: Box<dyn SellersView + Send + Sync> = match self.db.get_seller_summary(&domain).await? {
            Some(row) if at_least_as_new(&row.updated_at, &resource.updated_at) => {
                tracing::debug!(%domain, "sellers.json view: summary-backed");
                Box::new(SummaryBacked { row, content })
            }
            _ => {
                tracing::debug!(%domain, "sellers.json view: full-array pass");
                Box::new(FullArrayBacked { content })
            }
        };

        Ok(ViewState::Available { view, updated_at: resource.updated_at })
    }

    /// Persist a freshly derived summary. Failure to persist only loses a
    /// future optimization, so it is logged rather than propagated.
    async fn persist_summary(
        &self, domain: &str, metadata: &SellersJsonMetadata, summary: &SellerSummary, updated_at: &str,
    ) {
        let domain = normalize_domain(domain);
        match SellerSummaryRow::from_parts(&domain, metadata, summary, updated_at) {
            Ok(row) => {
                if let Err(e) = self.db.upsert_seller_summary(&row).await {
                    tracing::warn!(%domain, error = %e, "failed to persist seller summary");
                }
            }
            Err(e) => tracing::warn!(%domain, error = %e, "failed to encode seller summary"),
        }
    }
}

/// Instant comparison of two RFC 3339 timestamps. Offsets and fractional
/// precision vary between writers, so lexicographic comparison is not
/// sound here; unparseable timestamps count as stale.
fn at_least_as_new(candidate: &str, reference: &str) -> bool {
    match (DateTime::parse_from_rfc3339(candidate), DateTime::parse_from_rfc3339(reference)) {
        (Ok(c), Ok(r)) => c >= r,
        _ => false,
    }
}

fn missing_lookups(account_ids: &[String]) -> Vec<SellerLookup> {
    account_ids
        .iter()
        .map(|id| SellerLookup { account_id: id.clone(), seller: None, found: false })
        .collect()
}
