//! Host predicates and sort keys, and their normalization into bounds.

use serde::{Deserialize, Serialize};
use sheet_adapter::{Bound, Column, Operator, RequestedOrder, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// One predicate clause as the host sends it: `field_name operator value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qual {
    pub field_name: String,
    pub operator: String,
    pub value: Value,
}

impl Qual {
    pub fn new(field_name: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field_name: field_name.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// A requested sort column; sequence order is sort priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub attname: String,
    pub is_reversed: bool,
}

impl SortKey {
    pub fn new(attname: impl Into<String>, is_reversed: bool) -> Self {
        Self {
            attname: attname.into(),
            is_reversed,
        }
    }

    pub fn direction(&self) -> RequestedOrder {
        if self.is_reversed {
            RequestedOrder::Descending
        } else {
            RequestedOrder::Ascending
        }
    }
}

/// Group clauses by column. Unsupported operators are dropped; duplicate
/// clauses collapse.
pub fn get_all_bounds(quals: &[Qual]) -> BTreeMap<String, Vec<(Operator, Value)>> {
    let mut all: BTreeMap<String, Vec<(Operator, Value)>> = BTreeMap::new();
    for qual in quals {
        let Some(op) = Operator::parse(&qual.operator) else {
            debug!(field = %qual.field_name, operator = %qual.operator, "dropping unsupported operator");
            continue;
        };
        let ops = all.entry(qual.field_name.clone()).or_default();
        let clause = (op, qual.value.clone());
        if !ops.contains(&clause) {
            ops.push(clause);
        }
    }
    all
}

/// Turn grouped clauses into one bound per column.
///
/// Columns the adapter doesn't know, or whose filter kinds can't express the
/// clauses, get no bound; the host still filters every returned row.
pub fn get_bounds(
    columns: &BTreeMap<String, Column>,
    all_bounds: &BTreeMap<String, Vec<(Operator, Value)>>,
) -> BTreeMap<String, Bound> {
    let mut bounds = BTreeMap::new();
    for (label, operations) in all_bounds {
        let Some(column) = columns.get(label) else {
            debug!(field = %label, "no such column, not pushing down");
            continue;
        };
        match Bound::build(&column.filters, operations) {
            Some(bound) => {
                bounds.insert(label.clone(), bound);
            }
            None => debug!(field = %label, "clauses not expressible as a bound"),
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_adapter::{ColumnType, Range};

    fn columns() -> BTreeMap<String, Column> {
        let mut cols = BTreeMap::new();
        cols.insert("country".to_string(), Column::new("country", "A", ColumnType::String));
        cols.insert("cnt".to_string(), Column::new("cnt", "B", ColumnType::Number));
        cols
    }

    #[test]
    fn groups_by_column_and_drops_unknown_operators() {
        let quals = vec![
            Qual::new("cnt", ">", 1.0),
            Qual::new("cnt", ">", 1.0),
            Qual::new("cnt", "<=", 9.0),
            Qual::new("country", "~~", "B%"),
            Qual::new("country", "=", "BR"),
        ];
        let all = get_all_bounds(&quals);
        assert_eq!(all["cnt"].len(), 2);
        assert_eq!(all["country"], vec![(Operator::Eq, Value::from("BR"))]);
    }

    #[test]
    fn builds_bounds_from_column_filters() {
        let quals = vec![
            Qual::new("cnt", ">=", 10i64),
            Qual::new("country", "=", "BR"),
            Qual::new("country", "=", "PT"),
        ];
        let bounds = get_bounds(&columns(), &get_all_bounds(&quals));
        assert_eq!(
            bounds["cnt"],
            Bound::Range(Range::new(Some(Value::Integer(10)), true, None, false))
        );
        assert_eq!(bounds["country"], Bound::Impossible);
    }

    #[test]
    fn range_on_equality_only_column_is_left_to_host() {
        let quals = vec![Qual::new("country", ">", "M")];
        assert!(get_bounds(&columns(), &get_all_bounds(&quals)).is_empty());
    }

    #[test]
    fn unknown_columns_are_skipped() {
        let quals = vec![Qual::new("ghost", "=", 1i64)];
        assert!(get_bounds(&columns(), &get_all_bounds(&quals)).is_empty());
    }

    #[test]
    fn reversed_key_means_descending() {
        assert_eq!(SortKey::new("cnt", true).direction(), RequestedOrder::Descending);
        assert_eq!(SortKey::new("cnt", false).direction(), RequestedOrder::Ascending);
    }
}
