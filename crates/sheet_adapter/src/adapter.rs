use crate::bound::Bound;
use crate::error::{AdapterError, Result};
use crate::types::{Column, RequestedOrder, Row, Rows};
use std::collections::BTreeMap;

/// A queryable table behind some remote or local source.
///
/// Instances own their transport and schema cache and are not meant to be
/// shared between concurrent callers.
pub trait Adapter {
    /// Column descriptors keyed by label. Fixed after construction.
    fn get_columns(&self) -> &BTreeMap<String, Column>;

    /// Rows admitted by every bound.
    ///
    /// `order` is only honored for columns whose descriptor advertises the
    /// matching sort capability; the caller sorts everything else.
    fn get_data(
        &self,
        bounds: &BTreeMap<String, Bound>,
        order: &[(String, RequestedOrder)],
    ) -> Result<Rows>;

    /// Insert one row, returning its new identifier.
    fn insert_row(&mut self, _row: &Row) -> Result<i64> {
        Err(AdapterError::NotSupported("insert".into()))
    }

    fn delete_row(&mut self, _rowid: i64) -> Result<()> {
        Err(AdapterError::NotSupported("delete".into()))
    }

    fn update_row(&mut self, _rowid: i64, _row: &Row) -> Result<()> {
        Err(AdapterError::NotSupported("update".into()))
    }
}
