//! Display-page queries over the catalog.
//!
//! Every listing issues a range-limited main query and a separate count query
//! with the same predicate; the two run concurrently. Year-scoped model listings
//! first resolve the compatible model set and stop there when it is empty.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cache::{CacheCategory, CacheKey, CachePolicy, CatalogCache};
use super::compatibility::{CompatibilityResolver, CompatibleModelSet};
use super::{CatalogError, ExhaustivePaginator, normalize_search, run_query};
use crate::config::CatalogConfig;
use crate::domain::{BrandId, EngineVariantId, ModelId, SearchScope};
use crate::models::{Brand, EngineCode, EngineVariant, SearchHit, VehicleModel, map_rows};
use crate::rows::{Filter, FromRow, RowQuery, RowStore, Table};

const BRAND_SEARCH_COLUMNS: &[&str] = &["name", "alias"];
const MODEL_SEARCH_COLUMNS: &[&str] = &["name", "full_name", "alias"];
const VARIANT_SEARCH_COLUMNS: &[&str] = &["name", "fuel"];

/// One display page plus the size of the whole matching set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> CatalogPage<T> {
    #[must_use]
    pub const fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            page: request.page,
            page_size: request.page_size,
        }
    }

    fn map<U>(self, f: impl FnMut(T) -> U) -> CatalogPage<U> {
        CatalogPage {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PageBounds {
    fn default() -> Self {
        Self {
            default_size: 50,
            max_size: 100,
        }
    }
}

impl From<&CatalogConfig> for PageBounds {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            default_size: config.default_page_size,
            max_size: config.max_page_size,
        }
    }
}

/// Zero-based display page with its size clamped to `[1, max_size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>, bounds: PageBounds) -> Self {
        let max = bounds.max_size.max(1);
        Self {
            page: page.unwrap_or(0),
            page_size: limit.unwrap_or(bounds.default_size).clamp(1, max),
        }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.page_size)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandQuery {
    pub search: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelQuery {
    pub brand_id: BrandId,
    pub year: Option<i32>,
    pub search: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVariantQuery {
    pub model_id: ModelId,
    pub search: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    pub query: String,
    pub scope: SearchScope,
    pub page: PageRequest,
}

pub struct CatalogQueryService {
    store: Arc<dyn RowStore>,
    resolver: CompatibilityResolver,
    paginator: ExhaustivePaginator,
    cache: Arc<CatalogCache>,
    cache_policy: CachePolicy,
}

impl CatalogQueryService {
    #[must_use]
    pub fn new(
        store: Arc<dyn RowStore>,
        paginator: ExhaustivePaginator,
        cache: Arc<CatalogCache>,
        cache_policy: CachePolicy,
    ) -> Self {
        Self {
            resolver: CompatibilityResolver::new(Arc::clone(&store), paginator),
            store,
            paginator,
            cache,
            cache_policy,
        }
    }

    #[must_use]
    pub const fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub async fn list_brands(&self, query: &BrandQuery) -> Result<CatalogPage<Brand>, CatalogError> {
        let base = Self::brand_predicate(query.search.as_deref());
        self.fetch_page(base, &["sort_order", "name"], query.page)
            .await
    }

    pub async fn list_models(
        &self,
        query: &ModelQuery,
    ) -> Result<CatalogPage<VehicleModel>, CatalogError> {
        let mut base = Self::model_predicate(query.search.as_deref())
            .filter(Filter::eq("brand_id", query.brand_id.value()));

        if let Some(year) = query.year {
            let compatible = self.compatible_models(query.brand_id, year).await?;
            // An empty `in` filter reads as "no constraint" on some stores.
            if compatible.is_empty() {
                debug!(
                    brand_id = query.brand_id.value(),
                    year, "No compatible models, skipping listing queries"
                );
                return Ok(CatalogPage::empty(query.page));
            }
            base = base.filter(Filter::is_in("id", compatible.iter().map(|id| id.value())));
        }

        self.fetch_page(base, &["name"], query.page).await
    }

    pub async fn list_engine_variants(
        &self,
        query: &EngineVariantQuery,
    ) -> Result<CatalogPage<EngineVariant>, CatalogError> {
        let base = Self::variant_predicate(query.search.as_deref())
            .filter(Filter::eq("model_id", query.model_id.value()));

        let mut page: CatalogPage<EngineVariant> = self
            .fetch_page(base, &["year_from", "name"], query.page)
            .await?;

        let ids: Vec<EngineVariantId> = page.items.iter().map(|v| v.id).collect();
        let mut codes = self.engine_codes(&ids).await?;
        for variant in &mut page.items {
            variant.codes = codes.remove(&variant.id).unwrap_or_default();
        }

        Ok(page)
    }

    /// Free-text search. `All` lays one display window over brands, then models,
    /// then engine variants, and only queries the tables the window touches.
    pub async fn search(&self, query: &TextSearch) -> Result<CatalogPage<SearchHit>, CatalogError> {
        let Some(needle) = normalize_search(Some(&query.query)) else {
            return Ok(CatalogPage::empty(query.page));
        };
        let needle = Some(needle.as_str());

        match query.scope {
            SearchScope::Brands => Ok(self
                .fetch_page::<Brand>(Self::brand_predicate(needle), &["sort_order", "name"], query.page)
                .await?
                .map(SearchHit::Brand)),
            SearchScope::Models => Ok(self
                .fetch_page::<VehicleModel>(Self::model_predicate(needle), &["name"], query.page)
                .await?
                .map(SearchHit::Model)),
            SearchScope::EngineVariants => Ok(self
                .fetch_page::<EngineVariant>(
                    Self::variant_predicate(needle),
                    &["year_from", "name"],
                    query.page,
                )
                .await?
                .map(SearchHit::EngineVariant)),
            SearchScope::All => self.search_all(needle, query.page).await,
        }
    }

    /// Compatible model set for `(brand, year)`, cached unless the policy bypasses
    /// year-scoped data.
    pub async fn compatible_models(
        &self,
        brand_id: BrandId,
        year: i32,
    ) -> Result<CompatibleModelSet, CatalogError> {
        if !self.cache_policy.applies_to(Some(year)) {
            return self.resolver.resolve(brand_id, year).await;
        }

        let key = CacheKey::builder(CacheCategory::Compatibility)
            .field("brand", brand_id)
            .field("year", year)
            .build();
        self.cache
            .get_or_compute(&key, || self.resolver.resolve(brand_id, year))
            .await
    }

    async fn search_all(
        &self,
        needle: Option<&str>,
        page: PageRequest,
    ) -> Result<CatalogPage<SearchHit>, CatalogError> {
        let brands = Self::brand_predicate(needle).order_asc("sort_order").order_asc("name");
        let models = Self::model_predicate(needle).order_asc("name");
        let variants = Self::variant_predicate(needle)
            .order_asc("year_from")
            .order_asc("name");

        let (brand_count, model_count, variant_count) = tokio::try_join!(
            self.count(&brands),
            self.count(&models),
            self.count(&variants),
        )?;

        let start = page.offset();
        let end = start + page.limit();
        let mut cursor = 0_u64;
        let mut windows = Vec::new();
        for (query, total) in [
            (brands, brand_count),
            (models, model_count),
            (variants, variant_count),
        ] {
            let lo = start.max(cursor);
            let hi = end.min(cursor + total);
            if lo < hi {
                windows.push(query.order_asc("id").range(lo - cursor, hi - lo));
            }
            cursor += total;
        }

        let fetched = futures::future::try_join_all(
            windows.iter().map(|window| self.fetch_hits(window)),
        )
        .await?;

        Ok(CatalogPage {
            items: fetched.into_iter().flatten().collect(),
            total_count: cursor,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn fetch_hits(&self, window: &RowQuery) -> Result<Vec<SearchHit>, CatalogError> {
        let rows = run_query(self.store.as_ref(), window).await?.rows;
        let hits = match window.table {
            Table::Brands => map_rows::<Brand>(&rows)?
                .into_iter()
                .map(SearchHit::Brand)
                .collect(),
            Table::VehicleModels => map_rows::<VehicleModel>(&rows)?
                .into_iter()
                .map(SearchHit::Model)
                .collect(),
            Table::EngineVariants => map_rows::<EngineVariant>(&rows)?
                .into_iter()
                .map(SearchHit::EngineVariant)
                .collect(),
            Table::EngineCodes => Vec::new(),
        };
        Ok(hits)
    }

    /// Codes for the given variants, swept exhaustively and cached as enrichment.
    async fn engine_codes(
        &self,
        ids: &[EngineVariantId],
    ) -> Result<HashMap<EngineVariantId, Vec<EngineCode>>, CatalogError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut sorted: Vec<i32> = ids.iter().map(|id| id.value()).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let sweep = RowQuery::select(Table::EngineCodes)
            .filter(Filter::is_in("engine_variant_id", sorted.iter().copied()));
        let lookup = || self.paginator.collect_mapped::<EngineCode>(self.store.as_ref(), &sweep);

        let codes = if self.cache_policy.enabled {
            let key = CacheKey::builder(CacheCategory::Enrichment)
                .field("variants", format!("{sorted:?}"))
                .build();
            self.cache.get_or_compute(&key, lookup).await?
        } else {
            lookup().await?
        };

        let mut by_variant: HashMap<EngineVariantId, Vec<EngineCode>> = HashMap::new();
        for code in codes {
            by_variant.entry(code.engine_variant_id).or_default().push(code);
        }
        Ok(by_variant)
    }

    async fn fetch_page<T: FromRow>(
        &self,
        base: RowQuery,
        order: &[&'static str],
        page: PageRequest,
    ) -> Result<CatalogPage<T>, CatalogError> {
        let count_query = base.count_only();
        let main = order
            .iter()
            .fold(base, |q, column| q.order_asc(*column))
            .order_asc("id")
            .range(page.offset(), page.limit());

        let (rows, total_count) = tokio::try_join!(
            run_query(self.store.as_ref(), &main),
            self.count(&count_query),
        )?;

        Ok(CatalogPage {
            items: map_rows(&rows.rows)?,
            total_count,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn count(&self, query: &RowQuery) -> Result<u64, CatalogError> {
        let counted = run_query(self.store.as_ref(), &query.count_only()).await?;
        counted.count.ok_or(CatalogError::MissingCount(query.table))
    }

    fn brand_predicate(search: Option<&str>) -> RowQuery {
        Self::with_search(
            RowQuery::select(Table::Brands).filter(Filter::eq("active", true)),
            BRAND_SEARCH_COLUMNS,
            search,
        )
    }

    fn model_predicate(search: Option<&str>) -> RowQuery {
        Self::with_search(
            RowQuery::select(Table::VehicleModels).filter(Filter::eq("active", true)),
            MODEL_SEARCH_COLUMNS,
            search,
        )
    }

    fn variant_predicate(search: Option<&str>) -> RowQuery {
        Self::with_search(
            RowQuery::select(Table::EngineVariants).filter(Filter::eq("active", true)),
            VARIANT_SEARCH_COLUMNS,
            search,
        )
    }

    fn with_search(query: RowQuery, columns: &[&'static str], search: Option<&str>) -> RowQuery {
        match normalize_search(search) {
            Some(needle) => query.filter(Filter::contains_any(columns, needle)),
            None => query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_limit() {
        let bounds = PageBounds::default();
        assert_eq!(PageRequest::new(None, None, bounds).page_size, 50);
        assert_eq!(PageRequest::new(None, Some(0), bounds).page_size, 1);
        assert_eq!(PageRequest::new(None, Some(500), bounds).page_size, 100);
        let request = PageRequest::new(Some(3), Some(20), bounds);
        assert_eq!(request.offset(), 60);
        assert_eq!(request.limit(), 20);
    }

    #[test]
    fn blank_search_adds_no_filter() {
        let query = CatalogQueryService::brand_predicate(Some("  "));
        assert_eq!(query.filters, vec![Filter::eq("active", true)]);

        let query = CatalogQueryService::model_predicate(Some("clio"));
        assert!(query.filters.contains(&Filter::contains_any(
            MODEL_SEARCH_COLUMNS,
            "clio"
        )));
    }
}
