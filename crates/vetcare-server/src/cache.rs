//! Short-lived cache for report summaries using moka

use crate::reports::ReportSummary;
use chrono::NaiveDate;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_entries() -> u64 {
    256
}

fn default_cache_ttl() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Report summaries keyed by date range.
///
/// Entries expire after the TTL; `dispatch` also clears the cache after
/// every successful portal write.
#[derive(Clone)]
pub struct ReportCache {
    cache: Cache<String, Arc<ReportSummary>>,
}

impl ReportCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(Duration::from_secs(config.ttl_secs))
            .build();
        Self { cache }
    }

    pub async fn get(&self, from: NaiveDate, to: NaiveDate) -> Option<Arc<ReportSummary>> {
        self.cache.get(&Self::make_key(from, to)).await
    }

    pub async fn insert(&self, summary: ReportSummary) -> Arc<ReportSummary> {
        let summary = Arc::new(summary);
        self.cache
            .insert(Self::make_key(summary.from, summary.to), summary.clone())
            .await;
        summary
    }

    /// Drop every cached summary
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn make_key(from: NaiveDate, to: NaiveDate) -> String {
        format!("summary:{from}:{to}")
    }
}
