//! The host-facing foreign data wrapper.
//!
//! Sits between a query-planning host and one adapter: normalizes quals into
//! bounds, reports which sort keys can be pushed down, and forwards
//! single-row mutations keyed by `rowid`.

use crate::error::{FdwError, Result};
use crate::options::FdwOptions;
use crate::qual::{get_all_bounds, get_bounds, Qual, SortKey};
use crate::registry::Registry;
use sheet_adapter::{Adapter, Column, Order, RequestedOrder, Row, Rows, ROWID};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub struct ForeignDataWrapper {
    adapter: Box<dyn Adapter>,
    columns: BTreeMap<String, Column>,
}

impl ForeignDataWrapper {
    /// Build the adapter named in `options` from the built-in registry.
    pub fn new(options: &FdwOptions) -> Result<Self> {
        Self::with_registry(&Registry::with_builtins(), options)
    }

    pub fn with_registry(registry: &Registry, options: &FdwOptions) -> Result<Self> {
        let adapter = registry.build(options)?;
        info!(adapter = %options.adapter, "foreign table ready");
        Ok(Self::from_adapter(adapter))
    }

    /// Wrap an already constructed adapter. Its columns are cached here.
    pub fn from_adapter(adapter: Box<dyn Adapter>) -> Self {
        let columns = adapter.get_columns().clone();
        Self { adapter, columns }
    }

    pub fn columns(&self) -> &BTreeMap<String, Column> {
        &self.columns
    }

    /// Run a scan.
    ///
    /// Rows are projected onto `requested_columns` (plus `rowid`) unless it is
    /// empty. Dropped or non-pushable quals must be re-checked by the host.
    pub fn execute(
        &self,
        quals: &[Qual],
        requested_columns: &[String],
        sort_keys: &[SortKey],
    ) -> Result<Rows> {
        let bounds = get_bounds(&self.columns, &get_all_bounds(quals));
        let order: Vec<(String, RequestedOrder)> = sort_keys
            .iter()
            .map(|key| (key.attname.clone(), key.direction()))
            .collect();
        debug!(bounds = bounds.len(), order = order.len(), "executing scan");

        let rows = self.adapter.get_data(&bounds, &order)?;
        if requested_columns.is_empty() {
            return Ok(rows);
        }

        let wanted: BTreeSet<String> = requested_columns.iter().cloned().collect();
        let columns = rows
            .columns()
            .iter()
            .filter(|label| wanted.contains(*label))
            .cloned()
            .collect();
        let projected = rows.map(move |mut row| {
            row.values.retain(|label, _| wanted.contains(label));
            row
        });
        Ok(Rows::new(columns, Box::new(projected)))
    }

    /// The subset of `sort_keys` the adapter sorts itself.
    pub fn can_sort(&self, sort_keys: &[SortKey]) -> Vec<SortKey> {
        sort_keys
            .iter()
            .filter(|key| self.is_sortable(key))
            .cloned()
            .collect()
    }

    fn is_sortable(&self, key: &SortKey) -> bool {
        match self.columns.get(&key.attname).map(|c| c.order) {
            Some(Order::Any) => true,
            Some(Order::Ascending) => !key.is_reversed,
            Some(Order::Descending) => key.is_reversed,
            Some(Order::None) | None => false,
        }
    }

    pub fn insert(&mut self, mut row: Row) -> Result<Row> {
        let rowid = self.adapter.insert_row(&row)?;
        row.rowid = Some(rowid);
        Ok(row)
    }

    pub fn delete(&mut self, row: &Row) -> Result<()> {
        let rowid = row.rowid.ok_or(FdwError::MissingRowId)?;
        self.adapter.delete_row(rowid)?;
        Ok(())
    }

    /// The rowid is taken from the new values.
    pub fn update(&mut self, _old: &Row, new: Row) -> Result<Row> {
        let rowid = new.rowid.ok_or(FdwError::MissingRowId)?;
        self.adapter.update_row(rowid, &new)?;
        Ok(new)
    }

    /// Field the host must use as the mutation key.
    pub fn rowid_column(&self) -> &'static str {
        ROWID
    }

    /// No automatic table discovery: always an empty schema.
    pub fn import_schema(
        _schema: &str,
        _server_options: &BTreeMap<String, String>,
        _options: &BTreeMap<String, String>,
        _restriction_type: Option<&str>,
        _restricts: &[String],
    ) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet_adapter::{Bound, ColumnType, Range, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Seen = Rc<RefCell<Option<(BTreeMap<String, Bound>, Vec<(String, RequestedOrder)>)>>>;

    /// Fixed columns with chosen sort capabilities; records the bounds and
    /// order it was asked for.
    struct Recorder {
        columns: BTreeMap<String, Column>,
        seen: Seen,
    }

    impl Recorder {
        fn new() -> (Self, Seen) {
            let mut columns = BTreeMap::new();
            for (label, order) in [
                ("none", Order::None),
                ("asc", Order::Ascending),
                ("desc", Order::Descending),
                ("any", Order::Any),
            ] {
                columns.insert(
                    label.to_string(),
                    Column::new(label, label, ColumnType::Number).with_order(order),
                );
            }
            let seen = Seen::default();
            (Self { columns, seen: seen.clone() }, seen)
        }

        fn boxed() -> Box<dyn Adapter> {
            Box::new(Self::new().0)
        }
    }

    impl Adapter for Recorder {
        fn get_columns(&self) -> &BTreeMap<String, Column> {
            &self.columns
        }

        fn get_data(
            &self,
            bounds: &BTreeMap<String, Bound>,
            order: &[(String, RequestedOrder)],
        ) -> sheet_adapter::error::Result<Rows> {
            *self.seen.borrow_mut() = Some((bounds.clone(), order.to_vec()));
            let mut values = BTreeMap::new();
            for label in self.columns.keys() {
                values.insert(label.clone(), Value::Integer(1));
            }
            let labels = self.columns.keys().cloned().collect();
            Ok(Rows::new(labels, Box::new(std::iter::once(Row::new(values).with_rowid(0)))))
        }
    }

    #[test]
    fn can_sort_follows_column_capability() {
        let fdw = ForeignDataWrapper::from_adapter(Recorder::boxed());
        let keys = vec![
            SortKey::new("none", false),
            SortKey::new("none", true),
            SortKey::new("asc", false),
            SortKey::new("asc", true),
            SortKey::new("desc", false),
            SortKey::new("desc", true),
            SortKey::new("any", false),
            SortKey::new("any", true),
            SortKey::new("missing", false),
        ];
        assert_eq!(
            fdw.can_sort(&keys),
            vec![
                SortKey::new("asc", false),
                SortKey::new("desc", true),
                SortKey::new("any", false),
                SortKey::new("any", true),
            ]
        );
    }

    #[test]
    fn can_sort_none_is_empty_and_any_is_full() {
        let fdw = ForeignDataWrapper::from_adapter(Recorder::boxed());
        let none = vec![SortKey::new("none", false), SortKey::new("none", true)];
        assert!(fdw.can_sort(&none).is_empty());
        let any = vec![SortKey::new("any", true), SortKey::new("any", false)];
        assert_eq!(fdw.can_sort(&any), any);
    }

    #[test]
    fn execute_projects_requested_columns() {
        let fdw = ForeignDataWrapper::from_adapter(Recorder::boxed());
        let mut rows = fdw.execute(&[], &["any".to_string()], &[]).unwrap();
        assert_eq!(rows.columns(), &["any".to_string()]);

        let row = rows.next().unwrap();
        assert_eq!(row.rowid, Some(0));
        assert_eq!(row.values.keys().collect::<Vec<_>>(), vec!["any"]);
        assert!(rows.next().is_none());
    }

    #[test]
    fn execute_passes_bounds_and_order_through() {
        let (recorder, seen) = Recorder::new();
        let fdw = ForeignDataWrapper::from_adapter(Box::new(recorder));
        let quals = vec![
            Qual::new("any", ">=", 10i64),
            Qual::new("any", "<>", 5i64),
            Qual::new("ghost", "=", 1i64),
        ];
        let keys = vec![SortKey::new("desc", true), SortKey::new("none", false)];
        assert_eq!(fdw.execute(&quals, &[], &keys).unwrap().count(), 1);

        let (bounds, order) = seen.borrow_mut().take().unwrap();
        assert_eq!(bounds.len(), 1);
        assert_eq!(
            bounds["any"],
            Bound::Range(Range::new(Some(Value::Integer(10)), true, None, false))
        );
        assert_eq!(
            order,
            vec![
                ("desc".to_string(), RequestedOrder::Descending),
                ("none".to_string(), RequestedOrder::Ascending),
            ]
        );
    }

    #[test]
    fn mutations_need_a_rowid() {
        let mut fdw = ForeignDataWrapper::from_adapter(Recorder::boxed());
        assert!(matches!(fdw.delete(&Row::default()), Err(FdwError::MissingRowId)));
        assert!(matches!(
            fdw.update(&Row::default(), Row::default()),
            Err(FdwError::MissingRowId)
        ));
    }

    #[test]
    fn read_only_adapter_reports_not_supported() {
        let mut fdw = ForeignDataWrapper::from_adapter(Recorder::boxed());
        assert!(matches!(
            fdw.insert(Row::default()),
            Err(FdwError::Adapter(sheet_adapter::AdapterError::NotSupported(_)))
        ));
    }

    #[test]
    fn host_contract_constants() {
        let fdw = ForeignDataWrapper::from_adapter(Recorder::boxed());
        assert_eq!(fdw.rowid_column(), "rowid");
        assert!(ForeignDataWrapper::import_schema("public", &BTreeMap::new(), &BTreeMap::new(), None, &[])
            .is_empty());
    }
}
