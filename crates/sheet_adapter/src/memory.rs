//! In-memory table.
//!
//! Implements the whole `Adapter` contract locally: bounds are evaluated with
//! `Bound::admits`, every column sorts in any direction, and rowids are
//! stable storage keys rather than result positions.

use crate::adapter::Adapter;
use crate::bound::Bound;
use crate::error::{AdapterError, Result};
use crate::types::{Column, ColumnType, Order, RequestedOrder, Row, Rows, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Column declaration for a memory table.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    columns: BTreeMap<String, Column>,
    rows: BTreeMap<i64, BTreeMap<String, Value>>,
    next_rowid: i64,
}

impl MemoryAdapter {
    pub fn new(specs: Vec<ColumnSpec>) -> Result<Self> {
        let mut columns = BTreeMap::new();
        for spec in specs {
            if columns.contains_key(&spec.label) {
                return Err(AdapterError::Configuration(format!(
                    "duplicate column label '{}'",
                    spec.label
                )));
            }
            let column = Column::new(spec.label.clone(), spec.label.clone(), spec.column_type)
                .with_order(Order::Any);
            columns.insert(spec.label, column);
        }
        Ok(Self {
            columns,
            rows: BTreeMap::new(),
            next_rowid: 0,
        })
    }

    /// Build a table and load `rows` into it.
    pub fn with_rows(specs: Vec<ColumnSpec>, rows: Vec<Row>) -> Result<Self> {
        let mut adapter = Self::new(specs)?;
        for row in &rows {
            adapter.insert_row(row)?;
        }
        Ok(adapter)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Known columns only, each value coerced to its column type; absent
    /// columns become null.
    fn normalize(&self, row: &Row) -> Result<BTreeMap<String, Value>> {
        if let Some(unknown) = row.values.keys().find(|label| !self.columns.contains_key(*label)) {
            return Err(AdapterError::UnknownColumn(unknown.clone()));
        }
        self.columns
            .iter()
            .map(|(label, column)| {
                let value = match row.values.get(label) {
                    Some(value) => coerce(column.column_type, value).map_err(|reason| {
                        AdapterError::UnsupportedValue(format!("column '{label}': {reason}"))
                    })?,
                    None => Value::Null,
                };
                Ok((label.clone(), value))
            })
            .collect()
    }
}

/// Convert `value` to the representation of `ty`.
///
/// Integers widen to numbers. Temporal columns also take ISO-8601 strings,
/// which is how they arrive from JSON.
fn coerce(ty: ColumnType, value: &Value) -> std::result::Result<Value, String> {
    let mismatch = || format!("expected {}, got {} {value}", type_name(ty), value.kind());
    Ok(match (ty, value) {
        (_, Value::Null) => Value::Null,
        (ColumnType::String, Value::String(_))
        | (ColumnType::Number, Value::Number(_))
        | (ColumnType::Boolean, Value::Boolean(_))
        | (ColumnType::Date, Value::Date(_))
        | (ColumnType::DateTime, Value::DateTime(_))
        | (ColumnType::Time, Value::Time(_)) => value.clone(),
        (ColumnType::Number, Value::Integer(i)) => Value::Number(*i as f64),
        (ColumnType::Date, Value::String(s)) => {
            Value::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| mismatch())?)
        }
        (ColumnType::DateTime, Value::String(s)) => Value::DateTime(
            s.parse::<NaiveDateTime>()
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .map_err(|_| mismatch())?,
        ),
        (ColumnType::Time, Value::String(s)) => {
            Value::Time(s.parse::<NaiveTime>().map_err(|_| mismatch())?)
        }
        _ => return Err(mismatch()),
    })
}

fn type_name(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::String => "string",
        ColumnType::Number => "number",
        ColumnType::Boolean => "boolean",
        ColumnType::Date => "date",
        ColumnType::DateTime => "datetime",
        ColumnType::Time => "timeofday",
    }
}

fn compare(a: &BTreeMap<String, Value>, b: &BTreeMap<String, Value>, order: &[(String, RequestedOrder)]) -> Ordering {
    for (label, direction) in order {
        let ord = match (a.get(label), b.get(label)) {
            (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        };
        let ord = match direction {
            RequestedOrder::Ascending => ord,
            RequestedOrder::Descending => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl Adapter for MemoryAdapter {
    fn get_columns(&self) -> &BTreeMap<String, Column> {
        &self.columns
    }

    fn get_data(
        &self,
        bounds: &BTreeMap<String, Bound>,
        order: &[(String, RequestedOrder)],
    ) -> Result<Rows> {
        if let Some(label) = bounds
            .keys()
            .chain(order.iter().map(|(label, _)| label))
            .find(|label| !self.columns.contains_key(*label))
        {
            return Err(AdapterError::UnknownColumn(label.clone()));
        }

        let mut matched: Vec<(i64, BTreeMap<String, Value>)> = self
            .rows
            .iter()
            .filter(|(_, values)| {
                bounds.iter().all(|(label, bound)| {
                    values.get(label).map(|v| bound.admits(v)).unwrap_or(false)
                })
            })
            .map(|(rowid, values)| (*rowid, values.clone()))
            .collect();
        matched.sort_by(|(_, a), (_, b)| compare(a, b, order));
        debug!(matched = matched.len(), total = self.rows.len(), "memory scan");

        let labels = self.columns.keys().cloned().collect();
        let rows = matched
            .into_iter()
            .map(|(rowid, values)| Row::new(values).with_rowid(rowid));
        Ok(Rows::new(labels, Box::new(rows)))
    }

    fn insert_row(&mut self, row: &Row) -> Result<i64> {
        let values = self.normalize(row)?;
        let rowid = self.next_rowid;
        self.next_rowid += 1;
        self.rows.insert(rowid, values);
        Ok(rowid)
    }

    fn delete_row(&mut self, rowid: i64) -> Result<()> {
        self.rows
            .remove(&rowid)
            .map(|_| ())
            .ok_or(AdapterError::RowNotFound(rowid))
    }

    fn update_row(&mut self, rowid: i64, row: &Row) -> Result<()> {
        let values = self.normalize(row)?;
        match self.rows.get_mut(&rowid) {
            Some(slot) => {
                *slot = values;
                Ok(())
            }
            None => Err(AdapterError::RowNotFound(rowid)),
        }
    }
}
