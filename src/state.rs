use std::sync::Arc;

use crate::catalog::{
    CachePolicy, CacheTtls, CatalogCache, CatalogOrchestrator, CatalogQueryService,
    ExhaustivePaginator, PageBounds,
};
use crate::config::Config;
use crate::db::Store;
use crate::rows::RowStore;

/// Everything a request or CLI command needs, built once from [`Config`].
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    /// `None` when the catalog is served from a non-database row store.
    pub store: Option<Store>,

    pub row_store: Arc<dyn RowStore>,

    pub cache: Arc<CatalogCache>,

    pub service: Arc<CatalogQueryService>,

    pub orchestrator: Arc<CatalogOrchestrator>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;
        let row_store = store.row_store(config.catalog.store_row_cap);

        Ok(Self::assemble(config, Some(store), row_store))
    }

    /// Wires the catalog over an arbitrary row store.
    #[must_use]
    pub fn with_row_store(config: Config, row_store: Arc<dyn RowStore>) -> Self {
        Self::assemble(config, None, row_store)
    }

    fn assemble(config: Config, store: Option<Store>, row_store: Arc<dyn RowStore>) -> Self {
        let paginator = ExhaustivePaginator::new(
            config.catalog.exhaustive_page_size,
            config.catalog.max_exhaustive_pages,
        );
        let cache = Arc::new(CatalogCache::new(CacheTtls::from(&config.cache)));
        let service = Arc::new(CatalogQueryService::new(
            Arc::clone(&row_store),
            paginator,
            Arc::clone(&cache),
            CachePolicy::from(&config.cache),
        ));
        let orchestrator = Arc::new(CatalogOrchestrator::new(
            Arc::clone(&service),
            Arc::clone(&cache),
            PageBounds::from(&config.catalog),
        ));

        Self {
            config: Arc::new(config),
            store,
            row_store,
            cache,
            service,
            orchestrator,
        }
    }
}
