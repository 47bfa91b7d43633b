//! ads.txt optimization pipeline.
//!
//! The [`Optimizer`] composes the fetch/cache plumbing with the syntax
//! parser, the record classifier, and the content assembler:
//!
//! parse input → extract domains → orchestrate sellers.json fetches →
//! classify every record → assemble deterministic output.
//!
//! The pipeline is fail-open: an unreachable advertising-system domain
//! degrades classification for its own records only and never aborts the
//! optimize call.

pub mod assemble;
pub mod classify;
pub mod parse;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use adstxt_core::cache::{CacheDb, ResourceType};
use adstxt_core::records::RecordCategory;
use adstxt_core::{AppConfig, Error};
use adstxt_client::cache::DomainResourceCache;
use adstxt_client::fetch::ResourceFetcher;
use adstxt_client::orchestrator::Orchestrator;
use adstxt_client::sellers::SellersJsonPartialAccessor;

use classify::RecordClassifier;
use parse::normalize_and_dedupe;

/// Optimization depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationLevel {
    /// Normalize and deduplicate only; no sellers.json cross-referencing.
    #[serde(rename = "level1")]
    Level1,
    /// Full classification against sellers.json data.
    #[serde(rename = "level2")]
    Level2,
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationLevel::Level1 => f.write_str("level1"),
            OptimizationLevel::Level2 => f.write_str("level2"),
        }
    }
}

impl FromStr for OptimizationLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "level1" | "1" => Ok(OptimizationLevel::Level1),
            "level2" | "2" => Ok(OptimizationLevel::Level2),
            other => Err(Error::InvalidInput(format!("unknown optimization level: {other}"))),
        }
    }
}

/// Per-category record counts for a level-2 run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub other: usize,
    pub confidential: usize,
    pub missing_seller_id: usize,
    pub no_seller_json: usize,
}

/// Result of one optimize call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub optimized_content: String,
    pub original_length: usize,
    pub optimized_length: usize,
    pub optimization_level: OptimizationLevel,
    /// Present for level-2 runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<CategoryCounts>,
}

/// Composed optimization entry point.
///
/// Collaborators are injected at construction; one orchestrator instance
/// is created per optimize call so in-flight state never outlives it.
pub struct Optimizer<F: ResourceFetcher> {
    cache: DomainResourceCache<F>,
    accessor: SellersJsonPartialAccessor,
    config: AppConfig,
}

impl<F: ResourceFetcher + 'static> Optimizer<F> {
    pub fn new(db: CacheDb, fetcher: Arc<F>, config: AppConfig) -> Self {
        let cache = DomainResourceCache::new(db.clone(), fetcher);
        let accessor = SellersJsonPartialAccessor::new(db, config.sellers_json_ttl());
        Self { cache, accessor, config }
    }

    /// Accessor for direct metadata/lookup queries outside the optimize
    /// flow.
    pub fn accessor(&self) -> &SellersJsonPartialAccessor {
        &self.accessor
    }

    /// Optimize raw ads.txt content.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for empty content; store-level failures propagate.
    /// Remote fetch failures never error: affected records fall into the
    /// "no sellers.json" category.
    pub async fn optimize(
        &self, content: &str, publisher_domain: Option<&str>, level: OptimizationLevel,
    ) -> Result<OptimizeReport, Error> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("ads.txt content is empty".into()));
        }

        let lines = parse::parse(content, publisher_domain);
        let (variables, records) = normalize_and_dedupe(lines);

        tracing::debug!(
            records = records.len(),
            variables = variables.len(),
            %level,
            "parsed ads.txt input"
        );

        let (optimized_content, categories) = match level {
            OptimizationLevel::Level1 => {
                let classified: Vec<_> = records
                    .into_iter()
                    .map(|entry| {
                        let certification_authority_id = entry.certification_authority_id.clone();
                        adstxt_core::records::ClassifiedRecord {
                            entry,
                            category: RecordCategory::Other,
                            certification_authority_id,
                        }
                    })
                    .collect();
                (assemble::assemble(&classified, &variables), None)
            }
            OptimizationLevel::Level2 => {
                self.prefetch_sellers_json(records.iter().map(|r| r.domain.clone()))
                    .await;

                let classifier = RecordClassifier::new(&self.accessor);
                let classified = classifier.classify(&records).await;

                let mut counts = CategoryCounts::default();
                for record in &classified {
                    match record.category {
                        RecordCategory::Other => counts.other += 1,
                        RecordCategory::Confidential => counts.confidential += 1,
                        RecordCategory::MissingSellerId => counts.missing_seller_id += 1,
                        RecordCategory::NoSellerJson => counts.no_seller_json += 1,
                    }
                }

                (assemble::assemble(&classified, &variables), Some(counts))
            }
        };

        let optimized_length = optimized_content.len();
        Ok(OptimizeReport {
            optimized_content,
            original_length: content.len(),
            optimized_length,
            optimization_level: level,
            categories,
        })
    }

    /// Warm the cache for every referenced domain, bounded and coalesced.
    ///
    /// Store failures for individual domains are logged and left to the
    /// classifier, which treats the domain as having no data.
    async fn prefetch_sellers_json(&self, domains: impl IntoIterator<Item = String>) {
        let orchestrator = Orchestrator::new(self.config.concurrency_limit, self.config.chunk_pause());
        let ttl = self.config.sellers_json_ttl();
        let cache = self.cache.clone();

        let results = orchestrator
            .run_bounded(domains, move |domain| {
                let cache = cache.clone();
                async move { cache.get_or_fetch(ResourceType::SellersJson, &domain, ttl).await }
            })
            .await;

        for (domain, result) in &results {
            if let Err(e) = result {
                tracing::warn!(%domain, error = %e, "sellers.json prefetch failed at the store level");
            }
        }
    }
}
