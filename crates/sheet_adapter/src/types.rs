use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the synthetic identifier field carried by every row.
pub const ROWID: &str = "rowid";

/// A scalar cell value.
///
/// Untagged on the wire: JSON `null`, booleans, integers, floats and strings
/// map directly. Temporal values serialize as ISO-8601 strings and come back
/// as `String` when deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Time(_) => "time",
        }
    }
}

// Integers and floats compare numerically; any other cross-type pair is
// incomparable.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Boolean(a), Boolean(b)) => a.partial_cmp(b),
            (Integer(a), Integer(b)) => a.partial_cmp(b),
            (Integer(a), Number(b)) => (*a as f64).partial_cmp(b),
            (Number(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Number(a), Number(b)) => a.partial_cmp(b),
            (String(a), String(b)) => a.partial_cmp(b),
            (Date(a), Date(b)) => a.partial_cmp(b),
            (DateTime(a), DateTime(b)) => a.partial_cmp(b),
            (Time(a), Time(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Local scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
    DateTime,
    #[serde(rename = "timeofday", alias = "time")]
    Time,
}

impl ColumnType {
    /// Map a gviz type tag to a local type. Unknown tags fall back to `String`.
    pub fn from_gviz(tag: &str) -> Self {
        match tag {
            "number" => ColumnType::Number,
            "boolean" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "datetime" => ColumnType::DateTime,
            "timeofday" => ColumnType::Time,
            _ => ColumnType::String,
        }
    }

    /// Bound kinds this type can push down, in the order they are tried.
    pub fn filters(&self) -> &'static [FilterKind] {
        match self {
            ColumnType::String | ColumnType::Boolean => &[FilterKind::Equality],
            ColumnType::Number | ColumnType::Date | ColumnType::DateTime | ColumnType::Time => {
                &[FilterKind::Range]
            }
        }
    }
}

/// Kind of bound a column accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Equality,
    Range,
}

/// Sort capability declared by a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    None,
    Ascending,
    Descending,
    Any,
}

/// Direction of a requested sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedOrder {
    Ascending,
    Descending,
}

/// Column descriptor, fixed for the adapter's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Externally visible name
    pub label: String,
    /// Identifier used in remote queries (e.g. the sheet column letter)
    pub remote_id: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub filters: Vec<FilterKind>,
    #[serde(default)]
    pub order: Order,
}

impl Column {
    /// Build a descriptor whose filters follow from its type. Sort capability
    /// starts at `Order::None`.
    pub fn new(label: impl Into<String>, remote_id: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            label: label.into(),
            remote_id: remote_id.into(),
            column_type,
            filters: column_type.filters().to_vec(),
            order: Order::None,
        }
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }
}

/// A row keyed by column label, plus the synthetic `rowid` mutation handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowid: Option<i64>,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { rowid: None, values }
    }

    pub fn with_rowid(mut self, rowid: i64) -> Self {
        self.rowid = Some(rowid);
        self
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        self.values.get(label)
    }
}

/// Lazily produced rows of one query result.
///
/// The payload is already fully in memory; rows are materialized one at a
/// time as the caller pulls them. Not restartable.
pub struct Rows {
    columns: Vec<String>,
    inner: Box<dyn Iterator<Item = Row>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, inner: Box<dyn Iterator<Item = Row>>) -> Self {
        Self { columns, inner }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Box::new(std::iter::empty()))
    }

    /// Column labels in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.inner.next()
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows").field("columns", &self.columns).finish_non_exhaustive()
    }
}
