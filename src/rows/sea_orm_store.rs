use sea_orm::sea_query::{Alias, Asterisk, Condition, Expr, Func, LikeExpr, Order, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, QueryResult, Value};
use tracing::debug;

use super::{
    Cell, ColumnKind, Filter, QueryMode, Row, RowPage, RowQuery, RowStore, STORE_ROW_CAP,
    StoreError, Table, fold_case,
};

/// [`RowStore`] over a sea-orm connection.
///
/// Queries are built with sea-query against the table and column names declared
/// on [`Table`], so only known columns ever reach SQL. The row cap is applied
/// here to match the hosted store the catalog is deployed against.
#[derive(Clone)]
pub struct SeaOrmRowStore {
    conn: DatabaseConnection,
    row_cap: u64,
}

impl SeaOrmRowStore {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self::with_row_cap(conn, STORE_ROW_CAP)
    }

    #[must_use]
    pub const fn with_row_cap(conn: DatabaseConnection, row_cap: u64) -> Self {
        Self { conn, row_cap }
    }

    fn condition(query: &RowQuery) -> Condition {
        query
            .filters
            .iter()
            .fold(Condition::all(), |cond, filter| {
                cond.add(Self::filter_condition(query.table, filter))
            })
    }

    fn filter_condition(table: Table, filter: &Filter) -> Condition {
        match filter {
            Filter::Eq(column, Cell::Null) | Filter::IsNull(column) => {
                Condition::all().add(Expr::col(Alias::new(*column)).is_null())
            }
            Filter::Eq(column, value) => {
                Condition::all().add(Expr::col(Alias::new(*column)).eq(cell_value(value)))
            }
            Filter::In(column, values) => Condition::all()
                .add(Expr::col(Alias::new(*column)).is_in(values.iter().map(cell_value))),
            Filter::Lte(column, value) => {
                Condition::all().add(Expr::col(Alias::new(*column)).lte(cell_value(value)))
            }
            Filter::Gte(column, value) => {
                Condition::all().add(Expr::col(Alias::new(*column)).gte(cell_value(value)))
            }
            // SQLite only folds ASCII, so match the folded copies written on import.
            Filter::ContainsAny { columns, needle } => {
                let pattern = format!("%{}%", escape_like(&fold_case(needle)));
                columns
                    .iter()
                    .filter_map(|column| table.folded_column(column))
                    .fold(Condition::any(), |cond, folded| {
                        cond.add(
                            Expr::col(Alias::new(folded))
                                .like(LikeExpr::new(pattern.clone()).escape('\\')),
                        )
                    })
            }
        }
    }

    fn decode_row(
        table: Table,
        columns: &[&'static str],
        result: &QueryResult,
    ) -> Result<Row, StoreError> {
        let mut row = Row::new();
        for &name in columns {
            let spec = table.column(name).ok_or_else(|| StoreError::UnknownColumn {
                table,
                column: name.to_string(),
            })?;
            let cell = match spec.kind {
                ColumnKind::Integer => Cell::from(result.try_get::<Option<i64>>("", name)?),
                ColumnKind::Text => Cell::from(result.try_get::<Option<String>>("", name)?),
                ColumnKind::Boolean => Cell::from(result.try_get::<Option<bool>>("", name)?),
            };
            row.set(name, cell);
        }
        Ok(row)
    }
}

fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::BigInt(None),
        Cell::Int(v) => (*v).into(),
        Cell::Text(s) => s.clone().into(),
        Cell::Bool(b) => (*b).into(),
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait::async_trait]
impl RowStore for SeaOrmRowStore {
    async fn select(&self, query: &RowQuery) -> Result<RowPage, StoreError> {
        query.validate()?;

        let mut select = Query::select();
        select
            .from(Alias::new(query.table.name()))
            .cond_where(Self::condition(query));

        let backend = self.conn.get_database_backend();

        match query.mode {
            QueryMode::CountOnly => {
                select.expr_as(Func::count(Expr::col(Asterisk)), Alias::new("total"));
                let results = self.conn.query_all(backend.build(&select)).await?;
                let total = match results.first() {
                    Some(row) => row.try_get::<i64>("", "total")?,
                    None => 0,
                };
                let total = u64::try_from(total)
                    .map_err(|_| StoreError::Database(format!("negative count {total}")))?;
                debug!(table = %query.table, total, "count request");
                Ok(RowPage {
                    rows: Vec::new(),
                    count: Some(total),
                })
            }
            QueryMode::Rows => {
                let columns = query.selected_columns();
                for column in &columns {
                    select.column(Alias::new(*column));
                }
                for order in &query.order {
                    let direction = if order.descending {
                        Order::Desc
                    } else {
                        Order::Asc
                    };
                    select.order_by(Alias::new(order.column), direction);
                }
                select
                    .limit(query.effective_limit(self.row_cap))
                    .offset(query.offset);

                let results = self.conn.query_all(backend.build(&select)).await?;
                let rows = results
                    .iter()
                    .map(|r| Self::decode_row(query.table, &columns, r))
                    .collect::<Result<Vec<_>, _>>()?;

                debug!(
                    table = %query.table,
                    offset = query.offset,
                    rows = rows.len(),
                    "row request"
                );
                Ok(RowPage { rows, count: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("clio"), "clio");
    }
}
