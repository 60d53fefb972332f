//! Catalog façade.
//!
//! Wraps the query service with the cache and turns every result into a
//! [`PageEnvelope`]. This is the only layer that absorbs errors: failures are
//! logged with their cause and reported to callers as `success: false` with an
//! empty page and a generic message.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cache::{CacheCategory, CacheKey, CatalogCache};
use super::query::{
    BrandQuery, CatalogPage, CatalogQueryService, EngineVariantQuery, ModelQuery, PageBounds,
    PageRequest, TextSearch,
};
use super::{CatalogError, normalize_search};
use crate::domain::{BrandId, ModelId, SearchScope};
use crate::models::{Brand, EngineVariant, SearchHit, VehicleModel};

/// Uniform response for every catalog operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> PageEnvelope<T> {
    #[must_use]
    pub fn from_page(page: CatalogPage<T>) -> Self {
        Self {
            success: true,
            data: page.items,
            total: page.total_count,
            page: page.page,
            limit: page.page_size,
            message: None,
        }
    }

    #[must_use]
    pub fn failure(request: PageRequest, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            total: 0,
            page: request.page,
            limit: request.page_size,
            message: Some(message.into()),
        }
    }
}

pub struct CatalogOrchestrator {
    service: Arc<CatalogQueryService>,
    cache: Arc<CatalogCache>,
    bounds: PageBounds,
}

impl CatalogOrchestrator {
    #[must_use]
    pub const fn new(
        service: Arc<CatalogQueryService>,
        cache: Arc<CatalogCache>,
        bounds: PageBounds,
    ) -> Self {
        Self {
            service,
            cache,
            bounds,
        }
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    pub async fn list_brands(
        &self,
        search: Option<&str>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> PageEnvelope<Brand> {
        let query = BrandQuery {
            search: normalize_search(search),
            page: PageRequest::new(page, limit, self.bounds),
        };
        let key = CacheKey::builder(CacheCategory::Brands)
            .text("q", query.search.as_deref())
            .field("page", query.page.page)
            .field("limit", query.page.page_size)
            .build();

        let result = self
            .cached(key, None, || self.service.list_brands(&query))
            .await;
        Self::envelope("list_brands", query.page, result)
    }

    pub async fn list_models(
        &self,
        brand_id: BrandId,
        year: Option<i32>,
        search: Option<&str>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> PageEnvelope<VehicleModel> {
        let query = ModelQuery {
            brand_id,
            year,
            search: normalize_search(search),
            page: PageRequest::new(page, limit, self.bounds),
        };
        let key = CacheKey::builder(CacheCategory::Models)
            .field("brand", brand_id)
            .opt_field("year", year)
            .text("q", query.search.as_deref())
            .field("page", query.page.page)
            .field("limit", query.page.page_size)
            .build();

        let result = self
            .cached(key, year, || self.service.list_models(&query))
            .await;
        Self::envelope("list_models", query.page, result)
    }

    pub async fn list_engine_variants(
        &self,
        model_id: ModelId,
        search: Option<&str>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> PageEnvelope<EngineVariant> {
        let query = EngineVariantQuery {
            model_id,
            search: normalize_search(search),
            page: PageRequest::new(page, limit, self.bounds),
        };
        let key = CacheKey::builder(CacheCategory::EngineVariants)
            .field("model", model_id)
            .text("q", query.search.as_deref())
            .field("page", query.page.page)
            .field("limit", query.page.page_size)
            .build();

        let result = self
            .cached(key, None, || self.service.list_engine_variants(&query))
            .await;
        Self::envelope("list_engine_variants", query.page, result)
    }

    pub async fn search_by_text(
        &self,
        text: &str,
        scope: Option<SearchScope>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> PageEnvelope<SearchHit> {
        let query = TextSearch {
            query: text.trim().to_string(),
            scope: scope.unwrap_or_default(),
            page: PageRequest::new(page, limit, self.bounds),
        };
        let key = CacheKey::builder(CacheCategory::Search)
            .text("q", Some(&query.query))
            .field("scope", query.scope)
            .field("page", query.page.page)
            .field("limit", query.page.page_size)
            .build();

        let result = self
            .cached(key, None, || self.service.search(&query))
            .await;
        Self::envelope("search_by_text", query.page, result)
    }

    async fn cached<T, F, Fut>(
        &self,
        key: CacheKey,
        year: Option<i32>,
        compute: F,
    ) -> Result<CatalogPage<T>, CatalogError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CatalogPage<T>, CatalogError>>,
    {
        if self.service.cache_policy().applies_to(year) {
            self.cache.get_or_compute(&key, compute).await
        } else {
            compute().await
        }
    }

    fn envelope<T>(
        operation: &'static str,
        request: PageRequest,
        result: Result<CatalogPage<T>, CatalogError>,
    ) -> PageEnvelope<T> {
        match result {
            Ok(page) => PageEnvelope::from_page(page),
            Err(e) => {
                warn!(operation, error = %e, "Catalog operation failed");
                metrics::counter!("catalog_orchestrator_failures_total", "operation" => operation)
                    .increment(1);
                PageEnvelope::failure(request, failure_message(operation))
            }
        }
    }
}

fn failure_message(operation: &str) -> String {
    let what = match operation {
        "list_brands" => "brands",
        "list_models" => "models",
        "list_engine_variants" => "engine variants",
        _ => "search results",
    };
    format!("The catalog is temporarily unavailable, {what} could not be loaded")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_envelope_is_empty_and_keeps_paging() {
        let request = PageRequest::new(Some(2), Some(10), PageBounds::default());
        let envelope: PageEnvelope<Brand> = PageEnvelope::failure(request, failure_message("list_brands"));
        assert!(!envelope.success);
        assert!(envelope.data.is_empty());
        assert_eq!(envelope.page, 2);
        assert_eq!(envelope.limit, 10);
        assert!(envelope.message.unwrap().contains("brands"));
    }

    #[test]
    fn message_is_omitted_on_success() {
        let page = CatalogPage::<Brand> {
            items: Vec::new(),
            total_count: 0,
            page: 0,
            page_size: 50,
        };
        let json = serde_json::to_value(PageEnvelope::from_page(page)).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("message").is_none());
    }
}
