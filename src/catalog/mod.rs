//! Vehicle catalog resolution and caching.
//!
//! Request flow: [`CatalogOrchestrator`] → [`CatalogCache`] → [`CatalogQueryService`]
//! → [`CompatibilityResolver`] (year-scoped listings only) → [`ExhaustivePaginator`]
//! → [`RowStore`](crate::rows::RowStore).

pub mod cache;
pub mod compatibility;
pub mod error;
pub mod orchestrator;
pub mod paginator;
pub mod query;

pub use cache::{CacheCategory, CacheKey, CachePolicy, CacheTtls, CatalogCache};
pub use compatibility::{CompatibilityResolver, CompatibleModelSet};
pub use error::CatalogError;
pub use orchestrator::{CatalogOrchestrator, PageEnvelope};
pub use paginator::ExhaustivePaginator;
pub use query::{
    BrandQuery, CatalogPage, CatalogQueryService, EngineVariantQuery, ModelQuery, PageBounds,
    PageRequest, TextSearch,
};

use crate::rows::{QueryMode, RowPage, RowQuery, RowStore};

/// Runs one store request, tagging failures with the table they hit.
pub(crate) async fn run_query(
    store: &dyn RowStore,
    query: &RowQuery,
) -> Result<RowPage, CatalogError> {
    let kind = match query.mode {
        QueryMode::Rows => "rows",
        QueryMode::CountOnly => "count",
    };
    metrics::counter!(
        "catalog_store_requests_total",
        "table" => query.table.name(),
        "kind" => kind
    )
    .increment(1);

    store
        .select(query)
        .await
        .map_err(|e| CatalogError::upstream(query.table, e))
}

/// Trims a user-supplied text filter; blank input means no filter.
#[must_use]
pub fn normalize_search(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_is_no_filter() {
        assert_eq!(normalize_search(None), None);
        assert_eq!(normalize_search(Some("   ")), None);
        assert_eq!(normalize_search(Some(" clio ")), Some("clio".to_string()));
    }
}
