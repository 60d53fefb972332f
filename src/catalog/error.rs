use thiserror::Error;

use crate::rows::{MappingError, StoreError, Table};

/// Failures below the orchestrator. None of these are retried or softened:
/// a partial compatibility set would silently narrow results.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Upstream query on {table} failed: {source}")]
    Upstream {
        table: Table,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("Exhaustive sweep over {table} stopped after {pages} full pages")]
    PageLimitExceeded { table: Table, pages: u32 },

    #[error("Store returned no count for {0}")]
    MissingCount(Table),
}

impl CatalogError {
    #[must_use]
    pub const fn upstream(table: Table, source: StoreError) -> Self {
        Self::Upstream { table, source }
    }
}
