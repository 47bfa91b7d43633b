//! Record classification against cached sellers.json data.
//!
//! Every valid entry lands in exactly one category:
//!
//! - `NoSellerJson`: no sellers.json data is available for the domain
//!   (never fetched, fetch failed, or the lookup itself errored; the
//!   pipeline is fail-open).
//! - `MissingSellerId`: sellers.json exists but has no matching seller.
//! - `Confidential`: the matching seller is marked confidential.
//! - `Other`: confirmed seller. Certification authority ids are
//!   back-filled from sibling entries or the document's TAG-ID identifier.

use std::collections::HashMap;

use adstxt_core::records::{ClassifiedRecord, ParsedAdsTxtEntry, RecordCategory};
use adstxt_core::sellers::normalize_seller_id;
use adstxt_client::sellers::{BatchSellers, SellersJsonPartialAccessor};

/// Classifies parsed entries using batched per-domain seller lookups.
pub struct RecordClassifier<'a> {
    accessor: &'a SellersJsonPartialAccessor,
}

impl<'a> RecordClassifier<'a> {
    pub fn new(accessor: &'a SellersJsonPartialAccessor) -> Self {
        Self { accessor }
    }

    /// Classify all valid entries, preserving input order.
    ///
    /// Entries with `is_valid = false` must be excluded by the caller.
    pub async fn classify(&self, entries: &[ParsedAdsTxtEntry]) -> Vec<ClassifiedRecord> {
        // Sibling TAG-ID back-fill: the first declared certification
        // authority id per domain carries over to siblings lacking one.
        let mut sibling_certs: HashMap<&str, &str> = HashMap::new();
        for entry in entries {
            if let Some(cert) = entry.certification_authority_id.as_deref() {
                sibling_certs.entry(entry.domain.as_str()).or_insert(cert);
            }
        }

        // One batched lookup per distinct domain.
        let mut ids_by_domain: HashMap<&str, Vec<String>> = HashMap::new();
        for entry in entries {
            let ids = ids_by_domain.entry(entry.domain.as_str()).or_default();
            if !ids.contains(&entry.account_id) {
                ids.push(entry.account_id.clone());
            }
        }

        let mut lookups: HashMap<&str, Option<BatchSellers>> = HashMap::new();
        for (domain, ids) in &ids_by_domain {
            let lookup = match self.accessor.batch_get_sellers(domain, ids).await {
                Ok(batch) => Some(batch),
                Err(e) => {
                    tracing::warn!(%domain, error = %e, "seller lookup failed, treating as no sellers.json");
                    None
                }
            };
            lookups.insert(domain, lookup);
        }

        entries
            .iter()
            .map(|entry| self.classify_one(entry, &sibling_certs, &lookups))
            .collect()
    }

    fn classify_one(
        &self, entry: &ParsedAdsTxtEntry, sibling_certs: &HashMap<&str, &str>,
        lookups: &HashMap<&str, Option<BatchSellers>>,
    ) -> ClassifiedRecord {
        let sibling_cert = sibling_certs.get(entry.domain.as_str()).map(|c| c.to_string());
        let mut cert = entry.certification_authority_id.clone().or(sibling_cert);

        let batch = match lookups.get(entry.domain.as_str()) {
            Some(Some(batch)) if !batch.is_cache_miss && batch.metadata.is_some() => batch,
            // Lookup error, cache miss with no history, or a fetch that
            // never produced usable data.
            _ => {
                return ClassifiedRecord {
                    entry: entry.clone(),
                    category: RecordCategory::NoSellerJson,
                    certification_authority_id: cert,
                };
            }
        };

        let wanted = normalize_seller_id(&entry.account_id);
        let seller = batch
            .results
            .iter()
            .find(|r| normalize_seller_id(&r.account_id) == wanted)
            .and_then(|r| r.seller.as_ref());

        let category = match seller {
            None => RecordCategory::MissingSellerId,
            Some(s) if s.is_confidential => RecordCategory::Confidential,
            Some(_) => {
                if cert.is_none() {
                    cert = batch
                        .metadata
                        .as_ref()
                        .and_then(|m| m.tag_id())
                        .map(str::to_string);
                }
                RecordCategory::Other
            }
        };

        ClassifiedRecord { entry: entry.clone(), category, certification_authority_id: cert }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adstxt_core::cache::{CacheDb, CachedResource, FetchStatus, ResourceType};
    use adstxt_core::records::Relationship;
    use std::time::Duration;

    fn entry(domain: &str, account_id: &str, relationship: Relationship) -> ParsedAdsTxtEntry {
        ParsedAdsTxtEntry {
            domain: domain.into(),
            account_id: account_id.into(),
            account_type: relationship.as_str().into(),
            relationship,
            certification_authority_id: None,
            is_valid: true,
            validation_key: None,
            severity: None,
        }
    }

    async fn seed_sellers_json(db: &CacheDb, domain: &str, content: &str) {
        db.upsert_resource(&CachedResource {
            resource_type: ResourceType::SellersJson,
            domain: domain.into(),
            status: FetchStatus::Success,
            status_code: Some(200),
            error_message: None,
            content: Some(content.into()),
            updated_at: chrono::Utc::now().to_rfc3339(),
        })
        .await
        .unwrap();
    }

    async fn seed_failure(db: &CacheDb, domain: &str) {
        db.upsert_resource(&CachedResource {
            resource_type: ResourceType::SellersJson,
            domain: domain.into(),
            status: FetchStatus::Error,
            status_code: None,
            error_message: Some("connection timed out".into()),
            content: None,
            updated_at: chrono::Utc::now().to_rfc3339(),
        })
        .await
        .unwrap();
    }

    const OPENX_DOC: &str = r#"{
        "identifiers": [{"name": "TAG-ID", "value": "6a698e2ec38604c6"}],
        "sellers": [
            {"seller_id": "pub-1", "is_confidential": 0},
            {"seller_id": "123", "is_confidential": 1}
        ]
    }"#;

    async fn classify(db: &CacheDb, entries: &[ParsedAdsTxtEntry]) -> Vec<ClassifiedRecord> {
        let accessor = SellersJsonPartialAccessor::new(db.clone(), Duration::from_secs(3600));
        RecordClassifier::new(&accessor).classify(entries).await
    }

    #[tokio::test]
    async fn test_confirmed_seller_is_other() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed_sellers_json(&db, "openx.com", OPENX_DOC).await;

        let records = classify(&db, &[entry("openx.com", "pub-1", Relationship::Direct)]).await;
        assert_eq!(records[0].category, RecordCategory::Other);
        // TAG-ID adopted from the identifiers list.
        assert_eq!(records[0].certification_authority_id.as_deref(), Some("6a698e2ec38604c6"));
    }

    #[tokio::test]
    async fn test_confidential_seller() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed_sellers_json(&db, "openx.com", OPENX_DOC).await;

        let records = classify(&db, &[entry("openx.com", "123", Relationship::Direct)]).await;
        assert_eq!(records[0].category, RecordCategory::Confidential);
    }

    #[tokio::test]
    async fn test_unlisted_account_is_missing_seller_id() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed_sellers_json(&db, "openx.com", OPENX_DOC).await;

        let records = classify(&db, &[entry("openx.com", "pub-999", Relationship::Reseller)]).await;
        assert_eq!(records[0].category, RecordCategory::MissingSellerId);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_no_seller_json() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed_failure(&db, "unknown-ssp.test").await;

        let records = classify(&db, &[entry("unknown-ssp.test", "1", Relationship::Direct)]).await;
        assert_eq!(records[0].category, RecordCategory::NoSellerJson);
    }

    #[tokio::test]
    async fn test_never_fetched_is_no_seller_json() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let records = classify(&db, &[entry("cold.test", "1", Relationship::Direct)]).await;
        assert_eq!(records[0].category, RecordCategory::NoSellerJson);
    }

    #[tokio::test]
    async fn test_corrupt_content_fails_open() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed_sellers_json(&db, "bad.test", "{ not json").await;

        let records = classify(&db, &[entry("bad.test", "1", Relationship::Direct)]).await;
        assert_eq!(records[0].category, RecordCategory::NoSellerJson);
    }

    #[tokio::test]
    async fn test_sibling_cert_backfill() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed_sellers_json(&db, "openx.com", r#"{"sellers": [{"seller_id": "a"}, {"seller_id": "b"}]}"#).await;

        let mut with_cert = entry("openx.com", "a", Relationship::Direct);
        with_cert.certification_authority_id = Some("abc123".into());
        let without_cert = entry("openx.com", "b", Relationship::Direct);

        let records = classify(&db, &[with_cert, without_cert]).await;
        assert_eq!(records[1].certification_authority_id.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_partition_is_exhaustive_and_ordered() {
        let db = CacheDb::open_in_memory().await.unwrap();
        seed_sellers_json(&db, "openx.com", OPENX_DOC).await;
        seed_failure(&db, "down.test").await;

        let entries = vec![
            entry("openx.com", "pub-1", Relationship::Direct),
            entry("openx.com", "123", Relationship::Reseller),
            entry("openx.com", "nope", Relationship::Direct),
            entry("down.test", "1", Relationship::Direct),
        ];
        let records = classify(&db, &entries).await;

        // Order preserved, every record categorized.
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].category, RecordCategory::Other);
        assert_eq!(records[1].category, RecordCategory::Confidential);
        assert_eq!(records[2].category, RecordCategory::MissingSellerId);
        assert_eq!(records[3].category, RecordCategory::NoSellerJson);
    }
}
