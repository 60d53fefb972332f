use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CatalogError, ExhaustivePaginator};
use crate::domain::{BrandId, ModelId};
use crate::rows::{Filter, RowQuery, RowStore, Table};

/// Distinct models of a brand with at least one active engine variant built in
/// a given year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibleModelSet {
    pub brand_id: BrandId,
    pub year: i32,
    model_ids: BTreeSet<ModelId>,
}

impl CompatibleModelSet {
    #[must_use]
    pub fn new(brand_id: BrandId, year: i32, model_ids: impl IntoIterator<Item = ModelId>) -> Self {
        Self {
            brand_id,
            year,
            model_ids: model_ids.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.model_ids.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.model_ids.len()
    }

    #[must_use]
    pub fn contains(&self, id: ModelId) -> bool {
        self.model_ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.model_ids.iter().copied()
    }
}

/// Resolves which models of a brand were in production in a given year.
///
/// The open-ended and closed window cases cannot be expressed as one comparison
/// against the nullable `year_to` column, so the engine-variant table is swept
/// twice and the model ids of both sweeps are unioned.
pub struct CompatibilityResolver {
    store: Arc<dyn RowStore>,
    paginator: ExhaustivePaginator,
}

impl CompatibilityResolver {
    #[must_use]
    pub fn new(store: Arc<dyn RowStore>, paginator: ExhaustivePaginator) -> Self {
        Self { store, paginator }
    }

    /// Active variants still in production: `year_from <= year AND year_to IS NULL`.
    #[must_use]
    pub fn open_window_sweep(brand_id: BrandId, year: i32) -> RowQuery {
        Self::sweep_base(brand_id, year).filter(Filter::IsNull("year_to"))
    }

    /// Active variants whose closed window covers the year:
    /// `year_from <= year AND year_to >= year`.
    #[must_use]
    pub fn closed_window_sweep(brand_id: BrandId, year: i32) -> RowQuery {
        Self::sweep_base(brand_id, year).filter(Filter::gte("year_to", year))
    }

    fn sweep_base(brand_id: BrandId, year: i32) -> RowQuery {
        RowQuery::select(Table::EngineVariants)
            .filter(Filter::eq("brand_id", brand_id.value()))
            .filter(Filter::eq("active", true))
            .filter(Filter::lte("year_from", year))
            .project(&["model_id"])
    }

    pub async fn resolve(
        &self,
        brand_id: BrandId,
        year: i32,
    ) -> Result<CompatibleModelSet, CatalogError> {
        let open = Self::open_window_sweep(brand_id, year);
        let closed = Self::closed_window_sweep(brand_id, year);

        let (open_rows, closed_rows) = tokio::try_join!(
            self.paginator.collect(self.store.as_ref(), &open),
            self.paginator.collect(self.store.as_ref(), &closed),
        )?;

        let mut model_ids = BTreeSet::new();
        for row in open_rows.iter().chain(closed_rows.iter()) {
            model_ids.insert(ModelId::new(row.int32(Table::EngineVariants, "model_id")?));
        }

        info!(
            brand_id = brand_id.value(),
            year,
            open_rows = open_rows.len(),
            closed_rows = closed_rows.len(),
            models = model_ids.len(),
            "Resolved compatible models"
        );

        Ok(CompatibleModelSet {
            brand_id,
            year,
            model_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{MemoryRowStore, Row};

    fn variant(id: i32, model_id: i32, brand_id: i32, from: i32, to: Option<i32>) -> Row {
        Row::new()
            .with("id", id)
            .with("model_id", model_id)
            .with("brand_id", brand_id)
            .with("name", format!("type {id}"))
            .with("year_from", from)
            .with("year_to", to)
            .with("active", true)
    }

    fn resolver(store: Arc<MemoryRowStore>) -> CompatibilityResolver {
        CompatibilityResolver::new(store, ExhaustivePaginator::default())
    }

    #[tokio::test]
    async fn unions_open_and_closed_windows() {
        let store = Arc::new(MemoryRowStore::new());
        store.insert(Table::EngineVariants, variant(1, 10, 1, 2010, None));
        store.insert(Table::EngineVariants, variant(2, 20, 1, 2005, Some(2012)));
        store.insert(Table::EngineVariants, variant(3, 30, 1, 2000, Some(2004)));

        let set = resolver(store.clone()).resolve(BrandId::new(1), 2011).await.unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![ModelId::new(10), ModelId::new(20)]);
        // one page per sweep
        assert_eq!(store.request_count(), 2);
    }

    #[tokio::test]
    async fn ignores_other_brands_and_inactive_variants() {
        let store = Arc::new(MemoryRowStore::new());
        store.insert(Table::EngineVariants, variant(1, 10, 2, 2000, None));
        store.insert(
            Table::EngineVariants,
            variant(2, 20, 1, 2000, None).with("active", false),
        );

        let set = resolver(store).resolve(BrandId::new(1), 2015).await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn sweep_failure_propagates() {
        let store = Arc::new(MemoryRowStore::new());
        store.insert(Table::EngineVariants, variant(1, 10, 1, 2010, None));
        store.fail_table(Table::EngineVariants);

        let result = resolver(store).resolve(BrandId::new(1), 2015).await;
        assert!(matches!(result, Err(CatalogError::Upstream { .. })));
    }

    #[test]
    fn sweeps_project_only_the_model_column() {
        let open = CompatibilityResolver::open_window_sweep(BrandId::new(1), 2010);
        assert_eq!(open.projection, Some(vec!["model_id"]));
        assert!(open.filters.contains(&Filter::IsNull("year_to")));

        let closed = CompatibilityResolver::closed_window_sweep(BrandId::new(1), 2010);
        assert!(closed.filters.contains(&Filter::gte("year_to", 2010)));
    }
}
