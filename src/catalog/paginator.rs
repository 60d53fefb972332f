use tracing::debug;

use super::{CatalogError, run_query};
use crate::models::map_rows;
use crate::rows::{FromRow, Row, RowQuery, RowStore, STORE_ROW_CAP};

/// Fetches every row matching a query by walking fixed-size pages until a short
/// page comes back.
///
/// Pages are requested one after another: whether page `k + 1` is needed depends
/// on the length of page `k`. The result is only ever used to build identifier
/// sets, never shown directly. Any failed page fails the whole sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExhaustivePaginator {
    page_size: u64,
    max_pages: Option<u32>,
}

impl Default for ExhaustivePaginator {
    fn default() -> Self {
        Self::new(STORE_ROW_CAP, None)
    }
}

impl ExhaustivePaginator {
    /// `page_size` must not exceed the store's row cap, otherwise a capped page
    /// would look like the last one.
    #[must_use]
    pub const fn new(page_size: u64, max_pages: Option<u32>) -> Self {
        let page_size = if page_size == 0 { 1 } else { page_size };
        Self {
            page_size,
            max_pages,
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> u64 {
        self.page_size
    }

    #[must_use]
    pub const fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    pub async fn collect(
        &self,
        store: &dyn RowStore,
        query: &RowQuery,
    ) -> Result<Vec<Row>, CatalogError> {
        let table = query.table;
        // Offset paging needs a total order to neither skip nor repeat rows.
        let ordered = if query.order.is_empty() {
            query.clone().order_asc("id")
        } else {
            query.clone()
        };

        let mut rows = Vec::new();
        let mut page: u32 = 0;

        loop {
            let request = ordered
                .clone()
                .range(u64::from(page) * self.page_size, self.page_size);
            let batch = run_query(store, &request).await?;
            let fetched = batch.rows.len() as u64;

            metrics::counter!("catalog_exhaustive_pages_total", "table" => table.name())
                .increment(1);
            debug!(table = %table, page, fetched, "exhaustive page");

            // Past the ceiling only an empty page is acceptable.
            if let Some(max_pages) = self.max_pages
                && page >= max_pages
            {
                if fetched > 0 {
                    return Err(CatalogError::PageLimitExceeded {
                        table,
                        pages: max_pages,
                    });
                }
                break;
            }

            rows.extend(batch.rows);

            if fetched < self.page_size {
                break;
            }
            page += 1;
        }

        Ok(rows)
    }

    pub async fn collect_mapped<T: FromRow>(
        &self,
        store: &dyn RowStore,
        query: &RowQuery,
    ) -> Result<Vec<T>, CatalogError> {
        let rows = self.collect(store, query).await?;
        Ok(map_rows(&rows)?)
    }
}
