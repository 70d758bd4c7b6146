//! Rendering of a parsed [`ResultQuery`] into parameterized SQL.
//!
//! Column names come only from the static field tables in
//! `devcamper_core::models`, so they are pushed verbatim; every operand is
//! bound.

use chrono::{DateTime, Utc};
use devcamper_core::AppError;
use devcamper_core::query::{
    FieldKind, Filter, FilterOp, FilterValue, ResultQuery, SortKey, TotalCount,
};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::db_error;

/// Restricts a listing to the children of one parent record.
#[derive(Debug, Clone, Copy)]
pub struct Scope {
    pub column: &'static str,
    pub id: Uuid,
}

impl Scope {
    pub fn new(column: &'static str, id: Uuid) -> Self {
        Self { column, id }
    }
}

fn comparison(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq | FilterOp::In => "=",
        FilterOp::Gt => ">",
        FilterOp::Gte => ">=",
        FilterOp::Lt => "<",
        FilterOp::Lte => "<=",
    }
}

fn bind_scalar(qb: &mut QueryBuilder<'static, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Id(v) => qb.push_bind(*v),
        FilterValue::Text(v) => qb.push_bind(v.clone()),
        FilterValue::Number(v) => qb.push_bind(*v),
        FilterValue::Boolean(v) => qb.push_bind(*v),
        FilterValue::Timestamp(v) => qb.push_bind(*v),
        // Nested lists never come out of the parser.
        FilterValue::List(_) => qb.push("NULL"),
    };
}

/// Bind a homogeneous list as a typed Postgres array.
fn bind_array(qb: &mut QueryBuilder<'static, Postgres>, kind: FieldKind, values: &[FilterValue]) {
    match kind {
        FieldKind::Id => {
            let ids: Vec<Uuid> = values
                .iter()
                .filter_map(|v| match v {
                    FilterValue::Id(id) => Some(*id),
                    _ => None,
                })
                .collect();
            qb.push_bind(ids);
        }
        FieldKind::Number => {
            let numbers: Vec<f64> = values
                .iter()
                .filter_map(|v| match v {
                    FilterValue::Number(n) => Some(*n),
                    _ => None,
                })
                .collect();
            qb.push_bind(numbers);
        }
        FieldKind::Boolean => {
            let flags: Vec<bool> = values
                .iter()
                .filter_map(|v| match v {
                    FilterValue::Boolean(b) => Some(*b),
                    _ => None,
                })
                .collect();
            qb.push_bind(flags);
        }
        FieldKind::Timestamp => {
            let stamps: Vec<DateTime<Utc>> = values
                .iter()
                .filter_map(|v| match v {
                    FilterValue::Timestamp(t) => Some(*t),
                    _ => None,
                })
                .collect();
            qb.push_bind(stamps);
        }
        FieldKind::Text | FieldKind::TextList | FieldKind::Object => {
            let texts: Vec<String> = values
                .iter()
                .filter_map(|v| match v {
                    FilterValue::Text(t) => Some(t.clone()),
                    _ => None,
                })
                .collect();
            qb.push_bind(texts);
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    let column = filter.field.column;

    match (&filter.value, filter.field.kind) {
        (FilterValue::List(values), _) if values.is_empty() => {
            qb.push("FALSE");
        }
        (FilterValue::List(values), FieldKind::TextList) => {
            // Array overlap: any listed value appears in the column.
            qb.push(column).push(" && ");
            bind_array(qb, FieldKind::TextList, values);
        }
        (FilterValue::List(values), kind) => {
            qb.push(column).push(" = ANY(");
            bind_array(qb, kind, values);
            qb.push(")");
        }
        (value, FieldKind::TextList) => {
            // Scalar equality on a list column means membership.
            bind_scalar(qb, value);
            qb.push(" = ANY(").push(column).push(")");
        }
        (value, _) => {
            qb.push(column)
                .push(" ")
                .push(comparison(filter.op))
                .push(" ");
            bind_scalar(qb, value);
        }
    }
}

/// Append `WHERE ...` for the filters and optional scope. Emits nothing when
/// both are empty.
pub fn push_where(qb: &mut QueryBuilder<'static, Postgres>, filters: &[Filter], scope: Option<Scope>) {
    let mut first = true;
    let mut conjoin = |qb: &mut QueryBuilder<'static, Postgres>| {
        qb.push(if first { " WHERE " } else { " AND " });
        first = false;
    };

    if let Some(scope) = scope {
        conjoin(qb);
        qb.push(scope.column).push(" = ").push_bind(scope.id);
    }
    for filter in filters {
        conjoin(qb);
        qb.push("(");
        push_filter(qb, filter);
        qb.push(")");
    }
}

/// Append `ORDER BY ...`, always ending on `id` so paging is stable.
pub fn push_order(qb: &mut QueryBuilder<'static, Postgres>, sort: &[SortKey]) {
    qb.push(" ORDER BY ");
    for key in sort {
        qb.push(key.field.column)
            .push(if key.descending { " DESC, " } else { " ASC, " });
    }
    qb.push("id ASC");
}

/// Run a listing query and its count, returning the page rows and the total.
pub async fn fetch_page<R>(
    pool: &PgPool,
    table: &'static str,
    columns: &'static str,
    query: &ResultQuery,
    scope: Option<Scope>,
) -> Result<(Vec<R>, u64), AppError>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut select = QueryBuilder::new(format!("SELECT {columns} FROM {table}"));
    push_where(&mut select, &query.filters, scope);
    push_order(&mut select, &query.sort);
    select
        .push(" LIMIT ")
        .push_bind(to_i64(query.page.limit))
        .push(" OFFSET ")
        .push_bind(to_i64(query.page.offset()));

    let rows = select
        .build_query_as::<R>()
        .fetch_all(pool)
        .await
        .map_err(db_error)?;

    let counted: &[Filter] = match query.total {
        TotalCount::Filtered => &query.filters,
        TotalCount::Collection => &[],
    };
    let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM {table}"));
    push_where(&mut count, counted, scope);
    let total = count
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await
        .map_err(db_error)?;

    Ok((rows, total.max(0) as u64))
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
