//! Category-tagged, TTL-bound cache for catalog results.
//!
//! Values are stored as serialized JSON and replaced wholesale on recomputation.
//! Two concurrent misses on the same key may both compute; the last write wins.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CacheConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    Brands,
    Models,
    EngineVariants,
    Search,
    Compatibility,
    Enrichment,
}

impl CacheCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Brands => "brands",
            Self::Models => "models",
            Self::EngineVariants => "engine_variants",
            Self::Search => "search",
            Self::Compatibility => "compatibility",
            Self::Enrichment => "enrichment",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub brands: Duration,
    pub models: Duration,
    pub engine_variants: Duration,
    pub search: Duration,
    pub compatibility: Duration,
    pub enrichment: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            brands: Duration::from_secs(config.brands_ttl_seconds),
            models: Duration::from_secs(config.models_ttl_seconds),
            engine_variants: Duration::from_secs(config.engine_variants_ttl_seconds),
            search: Duration::from_secs(config.search_ttl_seconds),
            compatibility: Duration::from_secs(config.compatibility_ttl_seconds),
            enrichment: Duration::from_secs(config.enrichment_ttl_seconds),
        }
    }
}

impl CacheTtls {
    #[must_use]
    pub const fn ttl(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Brands => self.brands,
            CacheCategory::Models => self.models,
            CacheCategory::EngineVariants => self.engine_variants,
            CacheCategory::Search => self.search,
            CacheCategory::Compatibility => self.compatibility,
            CacheCategory::Enrichment => self.enrichment,
        }
    }
}

/// When cached results may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub enabled: bool,
    /// Skip the cache for every year-scoped listing, compatibility sets included.
    pub bypass_year_filtered: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            bypass_year_filtered: false,
        }
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            bypass_year_filtered: config.bypass_year_filtered,
        }
    }
}

impl CachePolicy {
    #[must_use]
    pub const fn applies_to(&self, year: Option<i32>) -> bool {
        self.enabled && !(self.bypass_year_filtered && year.is_some())
    }
}

/// Category plus a canonical encoding of every query input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    category: CacheCategory,
    canonical: String,
}

impl CacheKey {
    #[must_use]
    pub const fn builder(category: CacheCategory) -> CacheKeyBuilder {
        CacheKeyBuilder {
            category,
            parts: Vec::new(),
        }
    }

    #[must_use]
    pub const fn category(&self) -> CacheCategory {
        self.category
    }

    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.canonical)
    }
}

#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    category: CacheCategory,
    parts: Vec<(&'static str, Option<String>)>,
}

impl CacheKeyBuilder {
    #[must_use]
    pub fn field(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.parts.push((name, Some(value.to_string())));
        self
    }

    #[must_use]
    pub fn opt_field<T: fmt::Display>(mut self, name: &'static str, value: Option<T>) -> Self {
        self.parts.push((name, value.map(|v| v.to_string())));
        self
    }

    /// Text filters match case-insensitively, so the key folds case and whitespace.
    #[must_use]
    pub fn text(mut self, name: &'static str, value: Option<&str>) -> Self {
        let folded = value
            .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
            .filter(|v| !v.is_empty());
        self.parts.push((name, folded));
        self
    }

    #[must_use]
    pub fn build(self) -> CacheKey {
        // JSON keeps arbitrary user text from colliding with the separators.
        let canonical = serde_json::to_string(&self.parts).unwrap_or_else(|_| {
            self.parts
                .iter()
                .map(|(k, v)| format!("{k}={}", v.as_deref().unwrap_or("-")))
                .collect::<Vec<_>>()
                .join("|")
        });
        CacheKey {
            category: self.category,
            canonical,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Arc<str>,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

pub struct CatalogCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttls: CacheTtls,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(CacheTtls::default())
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttls,
        }
    }

    #[must_use]
    pub const fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Returns the live value under `key`. Expired or undecodable entries count
    /// as a miss and are dropped.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let now = Instant::now();
        let payload = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .get(key)
                .filter(|entry| !entry.is_expired(now))
                .map(|entry| Arc::clone(&entry.payload))
        };

        let Some(payload) = payload else {
            self.remove_if_expired(key, now);
            metrics::counter!("catalog_cache_misses_total", "category" => key.category.as_str())
                .increment(1);
            debug!(key = %key, "cache miss");
            return None;
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                metrics::counter!("catalog_cache_hits_total", "category" => key.category.as_str())
                    .increment(1);
                debug!(key = %key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                self.entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(key);
                None
            }
        }
    }

    /// Stores `value` under `key` with its category's TTL, replacing any entry.
    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %key, error = %e, "Value not cacheable, skipping");
                return;
            }
        };

        let entry = CacheEntry {
            payload: Arc::from(payload),
            inserted_at: Instant::now(),
            ttl: self.ttls.ttl(key.category),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), entry);
    }

    /// Returns the cached value or runs `compute`, caching only a successful result.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key) {
            return Ok(hit);
        }

        let value = compute().await?;
        self.set(key, &value);
        Ok(value)
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove_if_expired(&self, key: &CacheKey, now: Instant) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(category: CacheCategory, brand: i32) -> CacheKey {
        CacheKey::builder(category).field("brand", brand).build()
    }

    #[test]
    fn keys_distinguish_every_input() {
        let a = CacheKey::builder(CacheCategory::Models)
            .field("brand", 1)
            .opt_field("year", Some(2010))
            .text("q", Some("clio"))
            .field("page", 0)
            .field("limit", 50)
            .build();
        let b = CacheKey::builder(CacheCategory::Models)
            .field("brand", 1)
            .opt_field::<i32>("year", None)
            .text("q", Some("clio"))
            .field("page", 0)
            .field("limit", 50)
            .build();
        let c = CacheKey::builder(CacheCategory::EngineVariants)
            .field("brand", 1)
            .opt_field("year", Some(2010))
            .text("q", Some("clio"))
            .field("page", 0)
            .field("limit", 50)
            .build();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn text_is_case_and_whitespace_folded() {
        let a = CacheKey::builder(CacheCategory::Search)
            .text("q", Some("  Golf   GTI "))
            .build();
        let b = CacheKey::builder(CacheCategory::Search)
            .text("q", Some("golf gti"))
            .build();
        let blank = CacheKey::builder(CacheCategory::Search)
            .text("q", Some("   "))
            .build();
        let none = CacheKey::builder(CacheCategory::Search).text("q", None).build();
        assert_eq!(a, b);
        assert_eq!(blank, none);
    }

    #[test]
    fn user_text_cannot_forge_another_key() {
        let a = CacheKey::builder(CacheCategory::Search)
            .text("q", Some("a|page=1"))
            .field("page", 0)
            .build();
        let b = CacheKey::builder(CacheCategory::Search)
            .text("q", Some("a"))
            .field("page", 1)
            .build();
        assert_ne!(a, b);
    }

    #[test]
    fn year_bypass_only_skips_year_scoped_queries() {
        let policy = CachePolicy {
            enabled: true,
            bypass_year_filtered: true,
        };
        assert!(policy.applies_to(None));
        assert!(!policy.applies_to(Some(2010)));
        assert!(CachePolicy::default().applies_to(Some(2010)));
        let disabled = CachePolicy {
            enabled: false,
            bypass_year_filtered: false,
        };
        assert!(!disabled.applies_to(None));
    }

    #[tokio::test]
    async fn hit_skips_computation() {
        let cache = CatalogCache::default();
        let calls = AtomicUsize::new(0);
        let k = key(CacheCategory::Brands, 1);

        for _ in 0..2 {
            let value: Result<Vec<i32>, String> = cache
                .get_or_compute(&k, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await;
            assert_eq!(value.unwrap(), vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_computation_is_not_cached() {
        let cache = CatalogCache::default();
        let k = key(CacheCategory::Models, 1);

        let failed: Result<Vec<i32>, String> = cache
            .get_or_compute(&k, || async { Err("store down".to_string()) })
            .await;
        assert_eq!(failed.unwrap_err(), "store down");
        assert!(cache.is_empty());

        let recovered: Result<Vec<i32>, String> =
            cache.get_or_compute(&k, || async { Ok(vec![7]) }).await;
        assert_eq!(recovered.unwrap(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_per_category() {
        let cache = CatalogCache::default();
        let search = key(CacheCategory::Search, 1);
        let brands = key(CacheCategory::Brands, 1);
        cache.set(&search, &"s");
        cache.set(&brands, &"b");

        tokio::time::advance(Duration::from_secs(31 * 60)).await;
        assert_eq!(cache.get::<String>(&search), None);
        assert_eq!(cache.get::<String>(&brands), Some("b".to_string()));

        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn type_mismatch_counts_as_miss() {
        let cache = CatalogCache::default();
        let k = key(CacheCategory::Enrichment, 1);
        cache.set(&k, &"not a number");
        assert_eq!(cache.get::<u32>(&k), None);
        assert!(cache.is_empty());
    }
}
