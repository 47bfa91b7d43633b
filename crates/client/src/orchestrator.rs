//! Bounded-concurrency fetch orchestration with in-flight coalescing.
//!
//! Two separable layers:
//!
//! - [`Orchestrator::coalesce`] deduplicates concurrent work per normalized
//!   domain: callers arriving while an operation is pending await the same
//!   shared future instead of starting another one. ads.txt files commonly
//!   reference one advertising system from many lines; without coalescing
//!   each line would trigger its own sellers.json fetch.
//! - [`Orchestrator::run_bounded`] caps simultaneous work: domains are
//!   processed in sequential chunks of `concurrency_limit`, with an optional
//!   pause between chunks as a crude backpressure heuristic.
//!
//! One orchestrator instance is constructed per optimize call; the
//! in-flight registry is not shared process-wide.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared, join_all};

use adstxt_core::Error;
use adstxt_core::cache::CachedResource;

use crate::fetch::normalize_domain;

/// Per-domain operation result. Errors are `Arc`-wrapped so coalesced
/// callers can all observe the same failure.
pub type DomainResult = Result<CachedResource, Arc<Error>>;

type InFlight = Shared<BoxFuture<'static, DomainResult>>;

/// Orchestrates per-domain async operations with a concurrency ceiling and
/// in-flight deduplication.
pub struct Orchestrator {
    concurrency_limit: usize,
    chunk_pause: Duration,
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
}

impl Orchestrator {
    /// Create an orchestrator with the given ceiling and inter-chunk pause.
    ///
    /// A `concurrency_limit` of 0 is treated as 1.
    pub fn new(concurrency_limit: usize, chunk_pause: Duration) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
            chunk_pause,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `op` for `domain`, joining an already-pending operation for the
    /// same normalized domain instead of starting a duplicate.
    ///
    /// The registry entry is removed when the operation completes (success
    /// or failure), before any caller resolves; a later call for the same
    /// domain starts a fresh operation.
    pub async fn coalesce<Op, Fut>(&self, domain: &str, op: Op) -> DomainResult
    where
        Op: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<CachedResource, Error>> + Send + 'static,
    {
        let key = normalize_domain(domain);

        let handle = {
            let mut registry = self.in_flight.lock().expect("in-flight registry poisoned");
            if let Some(pending) = registry.get(&key) {
                tracing::debug!(domain = %key, "coalescing onto in-flight operation");
                pending.clone()
            } else {
                let registry_ref = Arc::clone(&self.in_flight);
                let cleanup_key = key.clone();
                let fut = op(key.clone());
                let shared: InFlight = async move {
                    let result = fut.await.map_err(Arc::new);
                    registry_ref
                        .lock()
                        .expect("in-flight registry poisoned")
                        .remove(&cleanup_key);
                    result
                }
                .boxed()
                .shared();
                registry.insert(key, shared.clone());
                shared
            }
        };

        handle.await
    }

    /// Run `op` for every domain in `domains` with at most
    /// `concurrency_limit` operations in flight.
    ///
    /// Domains are normalized and deduplicated, then processed in
    /// sequential chunks; each chunk's operations run concurrently and are
    /// awaited together. A failed operation occupies its result slot; it
    /// never cancels the batch. Results are keyed by normalized domain.
    pub async fn run_bounded<Op, Fut>(
        &self, domains: impl IntoIterator<Item = String>, op: Op,
    ) -> Vec<(String, DomainResult)>
    where
        Op: Fn(String) -> Fut,
        Fut: Future<Output = Result<CachedResource, Error>> + Send + 'static,
    {
        let unique: BTreeSet<String> = domains.into_iter().map(|d| normalize_domain(&d)).collect();
        let unique: Vec<String> = unique.into_iter().collect();
        let total_chunks = unique.len().div_ceil(self.concurrency_limit);

        let mut results = Vec::with_capacity(unique.len());

        for (index, chunk) in unique.chunks(self.concurrency_limit).enumerate() {
            tracing::debug!(
                chunk = index + 1,
                total_chunks,
                size = chunk.len(),
                "running orchestration chunk"
            );

            let chunk_results = join_all(chunk.iter().map(|domain| async {
                let result = self.coalesce(domain, &op).await;
                (domain.clone(), result)
            }))
            .await;
            results.extend(chunk_results);

            let more_chunks_remain = index + 1 < total_chunks;
            if more_chunks_remain && !self.chunk_pause.is_zero() {
                tokio::time::sleep(self.chunk_pause).await;
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adstxt_core::cache::{FetchStatus, ResourceType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fake_record(domain: &str) -> CachedResource {
        CachedResource {
            resource_type: ResourceType::SellersJson,
            domain: domain.to_string(),
            status: FetchStatus::Success,
            status_code: Some(200),
            error_message: None,
            content: Some("{}".into()),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_coalesce_single_underlying_call() {
        let orchestrator = Orchestrator::new(10, Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        let op = |calls: Arc<AtomicUsize>| {
            move |domain: String| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(fake_record(&domain))
                }
            }
        };

        let (a, b, c) = tokio::join!(
            orchestrator.coalesce("openx.com", op(calls.clone())),
            orchestrator.coalesce("OPENX.COM", op(calls.clone())),
            orchestrator.coalesce(" openx.com ", op(calls.clone())),
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registry_cleared_after_completion() {
        let orchestrator = Orchestrator::new(10, Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let result = orchestrator
                .coalesce("openx.com", move |domain| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(fake_record(&domain)) }
                })
                .await;
            assert!(result.is_ok());
        }

        // Sequential calls are not coalesced; each ran its own op.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_registry_cleared_after_failure() {
        let orchestrator = Orchestrator::new(10, Duration::ZERO);

        let failed = orchestrator
            .coalesce("openx.com", |_| async { Err(Error::InvalidInput("boom".into())) })
            .await;
        assert!(failed.is_err());

        let ok = orchestrator
            .coalesce("openx.com", |domain| async move { Ok(fake_record(&domain)) })
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_run_bounded_dedupes_input() {
        let orchestrator = Orchestrator::new(10, Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_ref = calls.clone();

        let results = orchestrator
            .run_bounded(
                vec![
                    "pubmatic.com".to_string(),
                    "PubMatic.com".to_string(),
                    "openx.com".to_string(),
                ],
                move |domain| {
                    calls_ref.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(fake_record(&domain)) }
                },
            )
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_bounded_respects_ceiling() {
        let orchestrator = Orchestrator::new(2, Duration::ZERO);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let domains: Vec<String> = (0..8).map(|i| format!("ssp{i}.example.com")).collect();

        let current_ref = current.clone();
        let peak_ref = peak.clone();
        orchestrator
            .run_bounded(domains, move |domain| {
                let current = current_ref.clone();
                let peak = peak_ref.clone();
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(fake_record(&domain))
                }
            })
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_run_bounded_failure_does_not_cancel_batch() {
        let orchestrator = Orchestrator::new(10, Duration::ZERO);

        let results = orchestrator
            .run_bounded(
                vec!["good.example.com".to_string(), "bad.example.com".to_string()],
                |domain| async move {
                    if domain.starts_with("bad") {
                        Err(Error::InvalidInput("store unavailable".into()))
                    } else {
                        Ok(fake_record(&domain))
                    }
                },
            )
            .await;

        assert_eq!(results.len(), 2);
        let by_domain: HashMap<_, _> = results.into_iter().collect();
        assert!(by_domain["good.example.com"].is_ok());
        assert!(by_domain["bad.example.com"].is_err());
    }
}
