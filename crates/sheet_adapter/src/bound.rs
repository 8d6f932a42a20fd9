//! Per-column bounds.
//!
//! Predicate clauses on one column are merged into a single `Bound` before
//! any query text is produced. Merging only ever narrows: two equality
//! clauses with different values become `Impossible`, ranges intersect.

use crate::types::{FilterKind, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Comparison operator of a single predicate clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    /// Parse the host's textual operator. Anything outside `= > < >= <=`
    /// yields `None`.
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "=" => Some(Operator::Eq),
            ">" => Some(Operator::Gt),
            "<" => Some(Operator::Lt),
            ">=" => Some(Operator::Ge),
            "<=" => Some(Operator::Le),
            _ => None,
        }
    }
}

impl FilterKind {
    pub fn accepts(&self, op: Operator) -> bool {
        match self {
            FilterKind::Equality => op == Operator::Eq,
            FilterKind::Range => true,
        }
    }
}

/// A range with optional ends.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Option<Value>,
    pub end: Option<Value>,
    pub include_start: bool,
    pub include_end: bool,
}

impl Range {
    pub fn new(start: Option<Value>, include_start: bool, end: Option<Value>, include_end: bool) -> Self {
        Self { start, end, include_start, include_end }
    }

    fn from_operation(op: Operator, value: Value) -> Self {
        match op {
            Operator::Eq => Range::new(Some(value.clone()), true, Some(value), true),
            Operator::Gt => Range::new(Some(value), false, None, false),
            Operator::Ge => Range::new(Some(value), true, None, false),
            Operator::Lt => Range::new(None, false, Some(value), false),
            Operator::Le => Range::new(None, false, Some(value), true),
        }
    }

    /// Intersect two ranges. `None` when endpoints are not comparable.
    fn intersect(self, other: Range) -> Option<Bound> {
        let (start, include_start) = match (self.start, other.start) {
            (None, None) => (None, false),
            (Some(s), None) => (Some(s), self.include_start),
            (None, Some(s)) => (Some(s), other.include_start),
            (Some(a), Some(b)) => match a.partial_cmp(&b)? {
                Ordering::Greater => (Some(a), self.include_start),
                Ordering::Less => (Some(b), other.include_start),
                Ordering::Equal => (Some(a), self.include_start && other.include_start),
            },
        };
        let (end, include_end) = match (self.end, other.end) {
            (None, None) => (None, false),
            (Some(e), None) => (Some(e), self.include_end),
            (None, Some(e)) => (Some(e), other.include_end),
            (Some(a), Some(b)) => match a.partial_cmp(&b)? {
                Ordering::Less => (Some(a), self.include_end),
                Ordering::Greater => (Some(b), other.include_end),
                Ordering::Equal => (Some(a), self.include_end && other.include_end),
            },
        };

        if let (Some(s), Some(e)) = (&start, &end) {
            match s.partial_cmp(e)? {
                Ordering::Greater => return Some(Bound::Impossible),
                Ordering::Equal if !(include_start && include_end) => {
                    return Some(Bound::Impossible)
                }
                _ => {}
            }
        }

        Some(Bound::Range(Range::new(start, include_start, end, include_end)))
    }

    fn admits(&self, value: &Value) -> bool {
        if let Some(start) = &self.start {
            match value.partial_cmp(start) {
                Some(Ordering::Greater) => {}
                Some(Ordering::Equal) if self.include_start => {}
                _ => return false,
            }
        }
        if let Some(end) = &self.end {
            match value.partial_cmp(end) {
                Some(Ordering::Less) => {}
                Some(Ordering::Equal) if self.include_end => {}
                _ => return false,
            }
        }
        true
    }
}

/// Normalized constraint on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bound {
    /// Matches nothing.
    Impossible,
    Equal(Value),
    Range(Range),
}

impl Bound {
    /// Merge the clauses on one column into a bound, trying `kinds` in order.
    ///
    /// The first kind whose operators cover every clause wins. Returns `None`
    /// when no kind fits or the values can't be ordered against each other;
    /// the host then filters that column itself.
    pub fn build(kinds: &[FilterKind], operations: &[(Operator, Value)]) -> Option<Bound> {
        if operations.is_empty() {
            return None;
        }
        let kind = kinds
            .iter()
            .find(|kind| operations.iter().all(|(op, _)| kind.accepts(*op)))?;
        match kind {
            FilterKind::Equality => Some(Self::build_equal(operations)),
            FilterKind::Range => Self::build_range(operations),
        }
    }

    fn build_equal(operations: &[(Operator, Value)]) -> Bound {
        let first = &operations[0].1;
        if operations.iter().all(|(_, value)| value == first) {
            Bound::Equal(first.clone())
        } else {
            Bound::Impossible
        }
    }

    fn build_range(operations: &[(Operator, Value)]) -> Option<Bound> {
        let mut acc = Range::default();
        for (op, value) in operations {
            match acc.intersect(Range::from_operation(*op, value.clone()))? {
                Bound::Range(range) => acc = range,
                other => return Some(other),
            }
        }
        Some(Bound::Range(acc))
    }

    /// Whether `value` satisfies this bound. Nulls never do.
    pub fn admits(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            Bound::Impossible => false,
            Bound::Equal(expected) => value == expected,
            Bound::Range(range) => range.admits(value),
        }
    }
}
