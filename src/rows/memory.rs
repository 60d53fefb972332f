//! In-process row store.
//!
//! Behaves like the hosted store as far as the catalog can observe: the same
//! per-request row cap, SQL null semantics for comparisons, and an empty `in`
//! filter that constrains nothing. Every request is recorded so callers can
//! check how many round trips an operation cost.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

use super::{
    Cell, Filter, QueryMode, Row, RowPage, RowQuery, RowStore, STORE_ROW_CAP, StoreError, Table,
    fold_case,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Rows,
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub table: Table,
    pub kind: RequestKind,
    pub offset: u64,
    pub returned: usize,
}

pub struct MemoryRowStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    requests: Mutex<Vec<RequestRecord>>,
    failing: RwLock<HashSet<Table>>,
    row_cap: u64,
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_row_cap(STORE_ROW_CAP)
    }

    #[must_use]
    pub fn with_row_cap(row_cap: u64) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
            row_cap,
        }
    }

    pub fn insert(&self, table: Table, row: Row) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table)
            .or_default()
            .push(row);
    }

    pub fn insert_many(&self, table: Table, rows: impl IntoIterator<Item = Row>) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table)
            .or_default()
            .extend(rows);
    }

    #[must_use]
    pub fn row_count(&self, table: Table) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table)
            .map_or(0, Vec::len)
    }

    /// Every subsequent request against `table` fails until [`Self::recover_table`].
    pub fn fail_table(&self, table: Table) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table);
    }

    pub fn recover_table(&self, table: Table) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&table);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn requests_for(&self, table: Table) -> Vec<RequestRecord> {
        self.requests()
            .into_iter()
            .filter(|r| r.table == table)
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, query: &RowQuery, returned: usize) {
        let kind = match query.mode {
            QueryMode::Rows => RequestKind::Rows,
            QueryMode::CountOnly => RequestKind::Count,
        };
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RequestRecord {
                table: query.table,
                kind,
                offset: query.offset,
                returned,
            });
    }

    fn is_failing(&self, table: Table) -> bool {
        self.failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&table)
    }
}

fn cell_matches(cell: &Cell, value: &Cell, accept: &[Ordering]) -> bool {
    cell.partial_cmp_sql(value)
        .is_some_and(|ordering| accept.contains(&ordering))
}

fn row_matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => cell_matches(row.get(column), value, &[Ordering::Equal]),
        Filter::In(column, values) => {
            values.is_empty()
                || values
                    .iter()
                    .any(|v| cell_matches(row.get(column), v, &[Ordering::Equal]))
        }
        Filter::Lte(column, value) => cell_matches(
            row.get(column),
            value,
            &[Ordering::Less, Ordering::Equal],
        ),
        Filter::Gte(column, value) => cell_matches(
            row.get(column),
            value,
            &[Ordering::Greater, Ordering::Equal],
        ),
        Filter::IsNull(column) => row.get(column).is_null(),
        Filter::ContainsAny { columns, needle } => {
            let needle = fold_case(needle);
            columns.iter().any(|column| match row.get(column) {
                Cell::Text(text) => fold_case(text).contains(&needle),
                _ => false,
            })
        }
    }
}

#[async_trait::async_trait]
impl RowStore for MemoryRowStore {
    async fn select(&self, query: &RowQuery) -> Result<RowPage, StoreError> {
        query.validate()?;

        if self.is_failing(query.table) {
            self.record(query, 0);
            return Err(StoreError::Database(format!(
                "simulated outage on {}",
                query.table
            )));
        }

        let page = {
            let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
            let mut matching: Vec<&Row> = tables
                .get(&query.table)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| query.filters.iter().all(|f| row_matches(row, f)))
                        .collect()
                })
                .unwrap_or_default();

            match query.mode {
                QueryMode::CountOnly => RowPage {
                    rows: Vec::new(),
                    count: Some(matching.len() as u64),
                },
                QueryMode::Rows => {
                    matching.sort_by(|a, b| {
                        query
                            .order
                            .iter()
                            .map(|o| {
                                let ordering = a.get(o.column).sort_cmp(b.get(o.column));
                                if o.descending {
                                    ordering.reverse()
                                } else {
                                    ordering
                                }
                            })
                            .find(|ordering| ordering.is_ne())
                            .unwrap_or(Ordering::Equal)
                    });

                    let columns = query.selected_columns();
                    let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
                    let limit =
                        usize::try_from(query.effective_limit(self.row_cap)).unwrap_or(usize::MAX);
                    let rows = matching
                        .into_iter()
                        .skip(offset)
                        .take(limit)
                        .map(|row| row.project(&columns))
                        .collect();
                    RowPage { rows, count: None }
                }
            }
        };

        self.record(query, page.rows.len());
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: i32, model_id: i32, year_from: i32, year_to: Option<i32>) -> Row {
        Row::new()
            .with("id", id)
            .with("model_id", model_id)
            .with("brand_id", 1)
            .with("name", format!("variant {id}"))
            .with("year_from", year_from)
            .with("year_to", year_to)
            .with("active", true)
    }

    #[tokio::test]
    async fn caps_rows_per_request() {
        let store = MemoryRowStore::with_row_cap(10);
        store.insert_many(
            Table::EngineVariants,
            (1..=25).map(|id| variant(id, 1, 2000, None)),
        );

        let page = store
            .select(&RowQuery::select(Table::EngineVariants).range(0, 100))
            .await
            .unwrap();
        assert_eq!(page.rows.len(), 10);
    }

    #[tokio::test]
    async fn null_year_to_never_satisfies_comparison() {
        let store = MemoryRowStore::new();
        store.insert(Table::EngineVariants, variant(1, 1, 2000, None));
        store.insert(Table::EngineVariants, variant(2, 1, 2000, Some(2005)));

        let page = store
            .select(&RowQuery::select(Table::EngineVariants).filter(Filter::gte("year_to", 2001)))
            .await
            .unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].get("id"), &Cell::Int(2));

        let page = store
            .select(&RowQuery::select(Table::EngineVariants).filter(Filter::IsNull("year_to")))
            .await
            .unwrap();
        assert_eq!(page.rows[0].get("id"), &Cell::Int(1));
    }

    #[tokio::test]
    async fn empty_in_filter_constrains_nothing() {
        let store = MemoryRowStore::new();
        store.insert(Table::EngineVariants, variant(1, 1, 2000, None));
        store.insert(Table::EngineVariants, variant(2, 2, 2000, None));

        let page = store
            .select(
                &RowQuery::select(Table::EngineVariants)
                    .filter(Filter::is_in("model_id", Vec::<i32>::new())),
            )
            .await
            .unwrap();
        assert_eq!(page.rows.len(), 2);
    }

    #[tokio::test]
    async fn orders_projects_and_counts() {
        let store = MemoryRowStore::new();
        for id in [3, 1, 2] {
            store.insert(Table::EngineVariants, variant(id, id * 10, 2000, None));
        }

        let query = RowQuery::select(Table::EngineVariants)
            .project(&["model_id"])
            .order_desc("id")
            .range(1, 5);
        let page = store.select(&query).await.unwrap();
        let models: Vec<&Cell> = page.rows.iter().map(|r| r.get("model_id")).collect();
        assert_eq!(models, vec![&Cell::Int(20), &Cell::Int(10)]);
        assert_eq!(page.rows[0].get("name"), &Cell::Null);

        let count = store.select(&query.count_only()).await.unwrap();
        assert_eq!(count.count, Some(3));
        assert!(count.rows.is_empty());

        let kinds: Vec<RequestKind> = store.requests().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RequestKind::Rows, RequestKind::Count]);
    }

    #[tokio::test]
    async fn substring_filter_is_case_insensitive() {
        let store = MemoryRowStore::new();
        store.insert(
            Table::Brands,
            Row::new()
                .with("id", 1)
                .with("name", "Peugeot")
                .with("alias", "peugeot")
                .with("active", true)
                .with("sort_order", 1),
        );

        let page = store
            .select(
                &RowQuery::select(Table::Brands).filter(Filter::contains_any(&["name"], "GEO")),
            )
            .await
            .unwrap();
        assert_eq!(page.rows.len(), 1);
    }

    #[tokio::test]
    async fn failing_table_reports_error_and_logs_attempt() {
        let store = MemoryRowStore::new();
        store.fail_table(Table::Brands);

        let result = store.select(&RowQuery::select(Table::Brands)).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.request_count(), 1);

        store.recover_table(Table::Brands);
        assert!(store.select(&RowQuery::select(Table::Brands)).await.is_ok());
    }
}
