//! Query-string to typed result-set query translation.
//!
//! A listing endpoint hands the raw `(name, value)` pairs of its query string
//! to [`ResultQuery::parse`] together with the declared [`Field`]s of the
//! record kind. Reserved parameters (`select`, `sort`, `page`, `limit`) are
//! pulled out first; every remaining pair must name a declared field, either
//! bare (`housing=true`) or with a bracketed operator (`averageCost[lte]=1000`).
//! The repository layer renders the resulting [`ResultQuery`] into SQL.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 20;

const RESERVED: [&str; 4] = ["select", "sort", "page", "limit"];

/// How a field's values are parsed and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Id,
    Text,
    Number,
    Boolean,
    Timestamp,
    /// A text array column; `Eq` means "contains", `In` means "overlaps".
    TextList,
    /// A composite or related value: selectable, never filtered or sorted.
    Object,
}

/// A queryable field: its public (JSON / query-string) name and backing column.
#[derive(Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self { name, column, kind }
    }
}

fn lookup(fields: &'static [Field], name: &str) -> Option<&'static Field> {
    fields.iter().find(|f| f.name == name)
}

/// Comparison operator of a single filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(self, FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte)
    }
}

impl FromStr for FilterOp {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            "in" => Ok(FilterOp::In),
            other => Err(AppError::Validation(format!(
                "Unsupported filter operator '{other}'"
            ))),
        }
    }
}

/// A parsed, typed filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Id(Uuid),
    Text(String),
    Number(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    List(Vec<FilterValue>),
}

impl FilterValue {
    fn parse(field: &Field, raw: &str) -> Result<Self, AppError> {
        let invalid = |expected: &str| {
            AppError::Validation(format!(
                "Invalid value '{raw}' for {}: expected {expected}",
                field.name
            ))
        };

        match field.kind {
            FieldKind::Text | FieldKind::TextList => Ok(FilterValue::Text(raw.to_string())),
            FieldKind::Id => raw
                .trim()
                .parse()
                .map(FilterValue::Id)
                .map_err(|_| invalid("an id")),
            FieldKind::Number => match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(FilterValue::Number(n)),
                _ => Err(invalid("a number")),
            },
            FieldKind::Boolean => match raw.trim() {
                "true" => Ok(FilterValue::Boolean(true)),
                "false" => Ok(FilterValue::Boolean(false)),
                _ => Err(invalid("true or false")),
            },
            FieldKind::Timestamp => parse_timestamp(raw.trim())
                .map(FilterValue::Timestamp)
                .ok_or_else(|| invalid("an RFC 3339 timestamp or YYYY-MM-DD date")),
            FieldKind::Object => Err(invalid("a scalar field")),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: &'static Field,
    pub op: FilterOp,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static Field,
    pub descending: bool,
}

/// A 1-indexed page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Parse raw `page`/`limit` values. Anything that is not a positive
    /// integer falls back to the default; `max_limit` clamps the page size.
    pub fn parse(page: Option<&str>, limit: Option<&str>, max_limit: Option<u64>) -> Self {
        let positive = |raw: Option<&str>| {
            raw.and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
        };

        let page = positive(page).unwrap_or(DEFAULT_PAGE);
        let mut limit = positive(limit).unwrap_or(DEFAULT_LIMIT);
        if let Some(max) = max_limit {
            limit = limit.min(max.max(1));
        }

        Self { page, limit }
    }

    /// Number of records skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Which population the pagination total is counted over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TotalCount {
    /// Records matching the query-string filters.
    #[default]
    Filtered,
    /// Every record reachable by the route, ignoring query-string filters.
    Collection,
}

impl FromStr for TotalCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filtered" => Ok(TotalCount::Filtered),
            "collection" => Ok(TotalCount::Collection),
            other => Err(format!(
                "Invalid pagination total '{other}': expected 'filtered' or 'collection'"
            )),
        }
    }
}

/// Per-deployment knobs for query parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    pub max_limit: Option<u64>,
    pub total: TotalCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl Pagination {
    pub fn compute(window: PageRequest, total: u64) -> Self {
        let end = window.page.saturating_mul(window.limit);

        let next = (end < total).then(|| PageRef {
            page: window.page + 1,
            limit: window.limit,
        });
        let prev = (window.page > 1).then(|| PageRef {
            page: window.page - 1,
            limit: window.limit,
        });

        Self { next, prev }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_prev(&self) -> bool {
        self.prev.is_some()
    }
}

/// One page of results plus the size of the counted population.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, window: PageRequest) -> Self {
        Self {
            items,
            total,
            pagination: Pagination::compute(window, total),
        }
    }
}

/// A related record (or records) joined into each result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub path: &'static str,
    pub select: Option<Vec<String>>,
}

impl Relation {
    pub fn new(path: &'static str) -> Self {
        Self { path, select: None }
    }

    /// Restrict the expanded record to a comma-separated field list.
    pub fn select(mut self, fields: &str) -> Self {
        self.select = Some(split_list(fields).map(str::to_string).collect());
        self
    }
}

/// A fully parsed listing query.
#[derive(Debug, Clone)]
pub struct ResultQuery {
    pub filters: Vec<Filter>,
    pub select: Option<Vec<&'static Field>>,
    pub sort: Vec<SortKey>,
    pub page: PageRequest,
    pub total: TotalCount,
}

impl ResultQuery {
    pub fn parse(
        params: &[(String, String)],
        fields: &'static [Field],
        options: &QueryOptions,
    ) -> Result<Self, AppError> {
        let reserved = |name: &str| {
            params
                .iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .filter(|v| !v.trim().is_empty())
        };

        let select = reserved("select")
            .map(|raw| parse_field_list(raw, fields, "select"))
            .transpose()?;

        let sort = match reserved("sort") {
            Some(raw) => parse_sort(raw, fields)?,
            None => default_sort(fields),
        };

        let page = PageRequest::parse(reserved("page"), reserved("limit"), options.max_limit);

        let mut filters: Vec<Filter> = Vec::new();
        for (key, raw) in params {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }
            let filter = parse_filter(key, raw, fields)?;

            // Repeated `field[in]` keys widen one list rather than AND-ing.
            if filter.op == FilterOp::In
                && let Some(existing) = filters
                    .iter_mut()
                    .find(|f| f.op == FilterOp::In && f.field == filter.field)
                && let (FilterValue::List(into), FilterValue::List(from)) =
                    (&mut existing.value, filter.value.clone())
            {
                into.extend(from);
                continue;
            }
            filters.push(filter);
        }

        Ok(Self {
            filters,
            select,
            sort,
            page,
            total: options.total,
        })
    }

    /// Public names of the projected fields, if a projection was requested.
    pub fn selected_names(&self) -> Option<Vec<&'static str>> {
        self.select
            .as_ref()
            .map(|fields| fields.iter().map(|f| f.name).collect())
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_field_list(
    raw: &str,
    fields: &'static [Field],
    param: &str,
) -> Result<Vec<&'static Field>, AppError> {
    split_list(raw)
        .map(|name| {
            lookup(fields, name).ok_or_else(|| {
                AppError::Validation(format!("Unknown field '{name}' in {param}"))
            })
        })
        .collect()
}

fn parse_sort(raw: &str, fields: &'static [Field]) -> Result<Vec<SortKey>, AppError> {
    split_list(raw)
        .map(|part| {
            let (name, descending) = match part.strip_prefix('-') {
                Some(name) => (name, true),
                None => (part.strip_prefix('+').unwrap_or(part), false),
            };
            let field = lookup(fields, name)
                .filter(|f| f.kind != FieldKind::Object)
                .ok_or_else(|| AppError::Validation(format!("Unknown field '{name}' in sort")))?;
            Ok(SortKey { field, descending })
        })
        .collect()
}

fn default_sort(fields: &'static [Field]) -> Vec<SortKey> {
    lookup(fields, "createdAt")
        .map(|field| SortKey {
            field,
            descending: true,
        })
        .into_iter()
        .collect()
}

/// Split `averageCost[lte]` into `("averageCost", Some("lte"))`.
fn split_key(key: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = key.strip_suffix(']')
        && let Some((name, op)) = stripped.split_once('[')
    {
        return (name, Some(op));
    }
    (key, None)
}

fn parse_filter(key: &str, raw: &str, fields: &'static [Field]) -> Result<Filter, AppError> {
    let (name, op) = split_key(key);
    let field = lookup(fields, name)
        .filter(|f| f.kind != FieldKind::Object)
        .ok_or_else(|| AppError::Validation(format!("Unknown filter field '{name}'")))?;
    let op = match op {
        Some(op) => op.parse()?,
        None => FilterOp::Eq,
    };

    if op.is_ordering()
        && matches!(
            field.kind,
            FieldKind::TextList | FieldKind::Boolean | FieldKind::Id
        )
    {
        return Err(AppError::Validation(format!(
            "Operator '{}' is not supported on {}",
            op.as_str(),
            field.name
        )));
    }

    let value = if op == FilterOp::In {
        FilterValue::List(
            split_list(raw)
                .map(|v| FilterValue::parse(field, v))
                .collect::<Result<_, _>>()?,
        )
    } else {
        FilterValue::parse(field, raw)?
    };

    Ok(Filter { field, op, value })
}

/// Keep only `id` and the selected keys of a serialized record.
///
/// Dotted names (`location.city`) select inside nested objects.
pub fn project(record: Value, select: &[&str]) -> Value {
    let Value::Object(mut source) = record else {
        return record;
    };

    let mut out = Map::new();
    if let Some(id) = source.remove("id") {
        out.insert("id".to_string(), id);
    }

    for name in select {
        match name.split_once('.') {
            None => {
                if let Some(v) = source.get(*name) {
                    out.insert((*name).to_string(), v.clone());
                }
            }
            Some((head, rest)) => {
                let Some(Value::Object(nested)) = source.get(head) else {
                    continue;
                };
                let Some(v) = nested.get(rest) else {
                    continue;
                };
                let slot = out
                    .entry(head.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(slot) = slot {
                    slot.insert(rest.to_string(), v.clone());
                }
            }
        }
    }

    Value::Object(out)
}
