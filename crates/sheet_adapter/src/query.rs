//! gviz query-string construction.
//!
//! Only conjunctive pushdown: every per-column condition is joined with
//! `AND`. Anything finer is left to the host.

use crate::bound::Bound;
use crate::error::{AdapterError, Result};
use crate::types::Value;
use std::collections::BTreeMap;

/// Query used for schema discovery: columns only, no rows.
pub const SCHEMA_QUERY: &str = "SELECT * LIMIT 0";

/// Always-false condition emitted for `Bound::Impossible`.
const FALSE_CONDITION: &str = "1 = 0";

/// Render a value as a gviz literal.
///
/// Numbers are bare, strings are single-quoted with embedded quotes doubled.
/// Everything else is refused.
pub fn quote(value: &Value) -> Result<String> {
    match value {
        Value::Integer(i) => Ok(i.to_string()),
        Value::Number(n) if n.is_finite() => Ok(n.to_string()),
        Value::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        other => Err(AdapterError::UnsupportedValue(format!("{} ({})", other, other.kind()))),
    }
}

/// Conditions for one column, in `start`, `end` order.
pub fn conditions(remote_id: &str, bound: &Bound) -> Result<Vec<String>> {
    let mut out = Vec::new();
    match bound {
        Bound::Impossible => out.push(FALSE_CONDITION.to_string()),
        Bound::Equal(value) => out.push(format!("{remote_id} = {}", quote(value)?)),
        Bound::Range(range) => {
            if let Some(start) = &range.start {
                let op = if range.include_start { ">=" } else { ">" };
                out.push(format!("{remote_id} {op} {}", quote(start)?));
            }
            if let Some(end) = &range.end {
                let op = if range.include_end { "<=" } else { "<" };
                out.push(format!("{remote_id} {op} {}", quote(end)?));
            }
        }
    }
    Ok(out)
}

/// Build `SELECT *` plus an optional `WHERE` clause.
///
/// `column_map` maps column labels to remote ids; a bound on a label that is
/// not in the map is an error.
pub fn build_query(
    bounds: &BTreeMap<String, Bound>,
    column_map: &BTreeMap<String, String>,
) -> Result<String> {
    let mut all = Vec::new();
    for (label, bound) in bounds {
        let remote_id = column_map
            .get(label)
            .ok_or_else(|| AdapterError::UnknownColumn(label.clone()))?;
        all.extend(conditions(remote_id, bound)?);
    }

    let mut sql = String::from("SELECT *");
    if !all.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&all.join(" AND "));
    }
    Ok(sql)
}
