//! Row store client seam.
//!
//! The catalog core never talks to the database directly. It describes a read as
//! a [`RowQuery`] (table, filters, projection, ordering, range) and hands it to a
//! [`RowStore`]. Every implementation returns at most [`STORE_ROW_CAP`] rows per
//! request no matter how large the matching set is; callers that need the whole
//! set go through the exhaustive paginator.

pub mod memory;
pub mod sea_orm_store;

pub use memory::{MemoryRowStore, RequestKind, RequestRecord};
pub use sea_orm_store::SeaOrmRowStore;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Hard per-request row ceiling of the hosted store.
pub const STORE_ROW_CAP: u64 = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown column '{column}' on table {table}")]
    UnknownColumn { table: Table, column: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

/// Raw row could not be turned into a typed record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cannot map column '{column}' of {table}: {reason}")]
pub struct MappingError {
    pub table: Table,
    pub column: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Brands,
    VehicleModels,
    EngineVariants,
    EngineCodes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec { name, kind }
}

const BRAND_COLUMNS: &[ColumnSpec] = &[
    col("id", ColumnKind::Integer),
    col("name", ColumnKind::Text),
    col("alias", ColumnKind::Text),
    col("active", ColumnKind::Boolean),
    col("sort_order", ColumnKind::Integer),
];

const MODEL_COLUMNS: &[ColumnSpec] = &[
    col("id", ColumnKind::Integer),
    col("brand_id", ColumnKind::Integer),
    col("name", ColumnKind::Text),
    col("full_name", ColumnKind::Text),
    col("alias", ColumnKind::Text),
    col("active", ColumnKind::Boolean),
];

const ENGINE_VARIANT_COLUMNS: &[ColumnSpec] = &[
    col("id", ColumnKind::Integer),
    col("model_id", ColumnKind::Integer),
    col("brand_id", ColumnKind::Integer),
    col("name", ColumnKind::Text),
    col("fuel", ColumnKind::Text),
    col("power_kw", ColumnKind::Integer),
    col("power_hp", ColumnKind::Integer),
    col("year_from", ColumnKind::Integer),
    col("month_from", ColumnKind::Integer),
    col("year_to", ColumnKind::Integer),
    col("month_to", ColumnKind::Integer),
    col("active", ColumnKind::Boolean),
];

const ENGINE_CODE_COLUMNS: &[ColumnSpec] = &[
    col("id", ColumnKind::Integer),
    col("engine_variant_id", ColumnKind::Integer),
    col("kind", ColumnKind::Text),
    col("code", ColumnKind::Text),
];

impl Table {
    pub const ALL: [Self; 4] = [
        Self::Brands,
        Self::VehicleModels,
        Self::EngineVariants,
        Self::EngineCodes,
    ];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Brands => "brands",
            Self::VehicleModels => "vehicle_models",
            Self::EngineVariants => "engine_variants",
            Self::EngineCodes => "engine_codes",
        }
    }

    #[must_use]
    pub const fn columns(&self) -> &'static [ColumnSpec] {
        match self {
            Self::Brands => BRAND_COLUMNS,
            Self::VehicleModels => MODEL_COLUMNS,
            Self::EngineVariants => ENGINE_VARIANT_COLUMNS,
            Self::EngineCodes => ENGINE_CODE_COLUMNS,
        }
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns().iter().find(|c| c.name == name)
    }

    /// Stored [`fold_case`] copy of a text column. Only columns that have one
    /// can take part in a substring filter.
    #[must_use]
    pub fn folded_column(&self, name: &str) -> Option<&'static str> {
        match (self, name) {
            (Self::Brands | Self::VehicleModels | Self::EngineVariants, "name") => {
                Some("name_folded")
            }
            (Self::Brands | Self::VehicleModels, "alias") => Some("alias_folded"),
            (Self::VehicleModels, "full_name") => Some("full_name_folded"),
            (Self::EngineVariants, "fuel") => Some("fuel_folded"),
            _ => None,
        }
    }
}

/// Case folding applied to both the needle and the haystack of a substring match.
#[must_use]
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single untyped value as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Null,
    Int(i64),
    Text(String),
    Bool(bool),
}

impl Cell {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// SQL-like comparison: `None` whenever either side is null or the types differ.
    #[must_use]
    pub fn partial_cmp_sql(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting; nulls sort first as in SQLite.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        const fn rank(cell: &Cell) -> u8 {
            match cell {
                Cell::Null => 0,
                Cell::Int(_) | Cell::Bool(_) => 1,
                Cell::Text(_) => 2,
            }
        }
        self.partial_cmp_sql(other)
            .unwrap_or_else(|| rank(self).cmp(&rank(other)))
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A raw row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: BTreeMap<&'static str, Cell>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, column: &'static str, value: impl Into<Cell>) -> Self {
        self.cells.insert(column, value.into());
        self
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<Cell>) {
        self.cells.insert(column, value.into());
    }

    #[must_use]
    pub fn get(&self, column: &str) -> &Cell {
        self.cells.get(column).unwrap_or(&Cell::Null)
    }

    #[must_use]
    pub fn project(&self, columns: &[&'static str]) -> Self {
        let cells = columns
            .iter()
            .map(|c| (*c, self.get(c).clone()))
            .collect();
        Self { cells }
    }

    pub fn int(&self, table: Table, column: &'static str) -> Result<i64, MappingError> {
        self.opt_int(table, column)?
            .ok_or_else(|| mapping_error(table, column, "unexpected null"))
    }

    pub fn int32(&self, table: Table, column: &'static str) -> Result<i32, MappingError> {
        let value = self.int(table, column)?;
        i32::try_from(value).map_err(|_| mapping_error(table, column, "out of i32 range"))
    }

    pub fn opt_int32(&self, table: Table, column: &'static str) -> Result<Option<i32>, MappingError> {
        self.opt_int(table, column)?
            .map(|v| {
                i32::try_from(v).map_err(|_| mapping_error(table, column, "out of i32 range"))
            })
            .transpose()
    }

    pub fn opt_int(&self, table: Table, column: &'static str) -> Result<Option<i64>, MappingError> {
        match self.get(column) {
            Cell::Null => Ok(None),
            Cell::Int(v) => Ok(Some(*v)),
            Cell::Bool(b) => Ok(Some(i64::from(*b))),
            Cell::Text(_) => Err(mapping_error(table, column, "expected integer, got text")),
        }
    }

    pub fn text(&self, table: Table, column: &'static str) -> Result<String, MappingError> {
        self.opt_text(table, column)?
            .ok_or_else(|| mapping_error(table, column, "unexpected null"))
    }

    pub fn opt_text(&self, table: Table, column: &'static str) -> Result<Option<String>, MappingError> {
        match self.get(column) {
            Cell::Null => Ok(None),
            Cell::Text(s) => Ok(Some(s.clone())),
            Cell::Int(_) | Cell::Bool(_) => {
                Err(mapping_error(table, column, "expected text"))
            }
        }
    }

    /// SQLite stores booleans as integers, so `0`/`1` are accepted too.
    pub fn boolean(&self, table: Table, column: &'static str) -> Result<bool, MappingError> {
        match self.get(column) {
            Cell::Bool(b) => Ok(*b),
            Cell::Int(0) => Ok(false),
            Cell::Int(1) => Ok(true),
            Cell::Null => Err(mapping_error(table, column, "unexpected null")),
            _ => Err(mapping_error(table, column, "expected boolean")),
        }
    }
}

fn mapping_error(table: Table, column: &'static str, reason: &str) -> MappingError {
    MappingError {
        table,
        column,
        reason: reason.to_string(),
    }
}

/// Typed record built from a raw row. This is the only place raw rows are read.
pub trait FromRow: Sized {
    const TABLE: Table;

    fn from_row(row: &Row) -> Result<Self, MappingError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(&'static str, Cell),
    /// Membership. An empty list is passed through to the store untouched; some
    /// stores read it as "no constraint", so callers must never send one.
    In(&'static str, Vec<Cell>),
    Lte(&'static str, Cell),
    Gte(&'static str, Cell),
    IsNull(&'static str),
    /// Case-insensitive substring match on any of the columns (ILIKE `%needle%`).
    ContainsAny {
        columns: Vec<&'static str>,
        needle: String,
    },
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Cell>) -> Self {
        Self::Eq(column, value.into())
    }

    pub fn lte(column: &'static str, value: impl Into<Cell>) -> Self {
        Self::Lte(column, value.into())
    }

    pub fn gte(column: &'static str, value: impl Into<Cell>) -> Self {
        Self::Gte(column, value.into())
    }

    pub fn is_in<I, V>(column: &'static str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Cell>,
    {
        Self::In(column, values.into_iter().map(Into::into).collect())
    }

    pub fn contains_any(columns: &[&'static str], needle: impl Into<String>) -> Self {
        Self::ContainsAny {
            columns: columns.to_vec(),
            needle: needle.into(),
        }
    }

    fn columns(&self) -> Vec<&'static str> {
        match self {
            Self::Eq(c, _) | Self::In(c, _) | Self::Lte(c, _) | Self::Gte(c, _) | Self::IsNull(c) => {
                vec![*c]
            }
            Self::ContainsAny { columns, .. } => columns.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Rows,
    CountOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub projection: Option<Vec<&'static str>>,
    pub order: Vec<OrderBy>,
    pub offset: u64,
    pub limit: Option<u64>,
    pub mode: QueryMode,
}

impl RowQuery {
    #[must_use]
    pub const fn select(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            projection: None,
            order: Vec::new(),
            offset: 0,
            limit: None,
            mode: QueryMode::Rows,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    #[must_use]
    pub fn project(mut self, columns: &[&'static str]) -> Self {
        self.projection = Some(columns.to_vec());
        self
    }

    #[must_use]
    pub fn order_asc(mut self, column: &'static str) -> Self {
        self.order.push(OrderBy {
            column,
            descending: false,
        });
        self
    }

    #[must_use]
    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order.push(OrderBy {
            column,
            descending: true,
        });
        self
    }

    #[must_use]
    pub const fn range(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Same predicate, no rows, exact count only.
    #[must_use]
    pub fn count_only(&self) -> Self {
        Self {
            table: self.table,
            filters: self.filters.clone(),
            projection: None,
            order: Vec::new(),
            offset: 0,
            limit: None,
            mode: QueryMode::CountOnly,
        }
    }

    /// Rows actually served for this request once the store cap applies.
    #[must_use]
    pub fn effective_limit(&self, cap: u64) -> u64 {
        self.limit.map_or(cap, |l| l.min(cap))
    }

    #[must_use]
    pub fn selected_columns(&self) -> Vec<&'static str> {
        self.projection
            .clone()
            .unwrap_or_else(|| self.table.columns().iter().map(|c| c.name).collect())
    }

    /// Every referenced column must exist on the table.
    pub fn validate(&self) -> Result<(), StoreError> {
        let referenced = self
            .filters
            .iter()
            .flat_map(Filter::columns)
            .chain(self.projection.iter().flatten().copied())
            .chain(self.order.iter().map(|o| o.column));

        for column in referenced {
            if self.table.column(column).is_none() {
                return Err(StoreError::UnknownColumn {
                    table: self.table,
                    column: column.to_string(),
                });
            }
        }

        for filter in &self.filters {
            let Filter::ContainsAny { columns, .. } = filter else {
                continue;
            };
            if columns.is_empty() {
                return Err(StoreError::InvalidQuery(format!(
                    "substring filter on {} names no columns",
                    self.table
                )));
            }
            if let Some(column) = columns
                .iter()
                .find(|c| self.table.folded_column(c).is_none())
            {
                return Err(StoreError::InvalidQuery(format!(
                    "{}.{column} is not searchable",
                    self.table
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowPage {
    pub rows: Vec<Row>,
    pub count: Option<u64>,
}

/// Filtered, ordered, range-limited reads over a named table.
#[async_trait::async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, query: &RowQuery) -> Result<RowPage, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_unknown_columns() {
        let query = RowQuery::select(Table::Brands).filter(Filter::eq("model_id", 1));
        assert!(matches!(
            query.validate(),
            Err(StoreError::UnknownColumn { table: Table::Brands, .. })
        ));

        let query = RowQuery::select(Table::EngineVariants)
            .filter(Filter::eq("brand_id", 1))
            .project(&["model_id"])
            .order_asc("id");
        assert!(query.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_substring_columns() {
        let query = RowQuery::select(Table::Brands).filter(Filter::contains_any(&[], "a"));
        assert!(matches!(query.validate(), Err(StoreError::InvalidQuery(_))));
    }

    #[test]
    fn substring_filters_need_a_folded_column() {
        let query = RowQuery::select(Table::EngineCodes).filter(Filter::contains_any(&["code"], "k9"));
        assert!(matches!(query.validate(), Err(StoreError::InvalidQuery(_))));

        let query = RowQuery::select(Table::VehicleModels)
            .filter(Filter::contains_any(&["name", "full_name", "alias"], "clio"));
        assert!(query.validate().is_ok());
    }

    #[test]
    fn fold_case_lowers_beyond_ascii() {
        assert_eq!(fold_case("ŠKODA Octavia"), "škoda octavia");
        assert_eq!(fold_case("CITROËN"), "citroën");
    }

    #[test]
    fn count_only_keeps_predicate_and_drops_range() {
        let query = RowQuery::select(Table::VehicleModels)
            .filter(Filter::eq("brand_id", 3))
            .order_asc("name")
            .range(50, 50);
        let count = query.count_only();
        assert_eq!(count.filters, query.filters);
        assert_eq!(count.limit, None);
        assert!(count.order.is_empty());
        assert_eq!(count.mode, QueryMode::CountOnly);
    }

    #[test]
    fn effective_limit_never_exceeds_cap() {
        let query = RowQuery::select(Table::Brands).range(0, 5000);
        assert_eq!(query.effective_limit(STORE_ROW_CAP), STORE_ROW_CAP);
        assert_eq!(
            RowQuery::select(Table::Brands).effective_limit(STORE_ROW_CAP),
            STORE_ROW_CAP
        );
        assert_eq!(
            RowQuery::select(Table::Brands)
                .range(0, 20)
                .effective_limit(STORE_ROW_CAP),
            20
        );
    }

    #[test]
    fn row_accessors_map_sqlite_booleans() {
        let row = Row::new()
            .with("id", 4)
            .with("active", 1)
            .with("alias", Option::<String>::None);
        assert_eq!(row.int32(Table::Brands, "id"), Ok(4));
        assert_eq!(row.boolean(Table::Brands, "active"), Ok(true));
        assert_eq!(row.opt_text(Table::Brands, "alias"), Ok(None));
        assert!(row.text(Table::Brands, "name").is_err());
    }

    #[test]
    fn nulls_sort_first() {
        let mut cells = vec![Cell::Int(3), Cell::Null, Cell::Int(1)];
        cells.sort_by(Cell::sort_cmp);
        assert_eq!(cells, vec![Cell::Null, Cell::Int(1), Cell::Int(3)]);
    }
}
