//! Spreadsheet adapter over the gviz query service.

use crate::adapter::Adapter;
use crate::bound::Bound;
use crate::error::{AdapterError, Result};
use crate::http::{Transport, DATA_SOURCE_AUTH_HEADER};
use crate::locator::SheetLocator;
use crate::query::{build_query, SCHEMA_QUERY};
use crate::response::{decode_rows, parse_response, ResponseTable};
use crate::types::{Column, RequestedOrder, Row, Rows};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub struct SheetsAdapter {
    locator: SheetLocator,
    transport: Box<dyn Transport>,
    columns: BTreeMap<String, Column>,
    /// label -> remote id
    column_map: BTreeMap<String, String>,
    /// Remote ids in the order schema discovery returned them.
    schema_ids: Vec<String>,
}

impl SheetsAdapter {
    pub fn supports(uri: &str) -> bool {
        SheetLocator::supports(uri)
    }

    /// Connect over HTTP, anonymously unless service-account info is given.
    #[cfg(feature = "http")]
    pub fn new(
        uri: &str,
        service_account_info: Option<&serde_json::Value>,
        subject: Option<&str>,
    ) -> Result<Self> {
        use crate::auth::Credentials;
        use crate::http::HttpTransport;

        let locator = SheetLocator::parse(uri)?;
        let credentials = service_account_info
            .map(|info| Credentials::from_service_account_info(info, subject))
            .transpose()?;
        let transport = HttpTransport::from_credentials(credentials)?;
        Self::connect(locator, Box::new(transport))
    }

    /// Connect through a caller-supplied transport.
    pub fn with_transport(uri: &str, transport: Box<dyn Transport>) -> Result<Self> {
        Self::connect(SheetLocator::parse(uri)?, transport)
    }

    fn connect(locator: SheetLocator, transport: Box<dyn Transport>) -> Result<Self> {
        let mut adapter = Self {
            locator,
            transport,
            columns: BTreeMap::new(),
            column_map: BTreeMap::new(),
            schema_ids: Vec::new(),
        };
        adapter.discover_schema()?;
        Ok(adapter)
    }

    pub fn locator(&self) -> &SheetLocator {
        &self.locator
    }

    fn run_query(&self, sql: &str) -> Result<(ResponseTable, String)> {
        let url = self.locator.query_url(sql);
        debug!(%url, sql, "running gviz query");
        let resp = self.transport.get(&url, &[DATA_SOURCE_AUTH_HEADER])?;
        let table = parse_response(resp.status, &resp.body)?;
        Ok((table, resp.body))
    }

    fn discover_schema(&mut self) -> Result<()> {
        let (table, _) = self.run_query(SCHEMA_QUERY)?;
        for col in &table.cols {
            let label = col.name().to_string();
            if self.columns.contains_key(&label) {
                return Err(AdapterError::Configuration(format!(
                    "duplicate column label '{label}' in sheet"
                )));
            }
            self.column_map.insert(label.clone(), col.id.clone());
            self.columns
                .insert(label.clone(), Column::new(label, col.id.clone(), col.column_type()));
            self.schema_ids.push(col.id.clone());
        }
        info!(
            url = %self.locator.base_url(),
            columns = self.columns.len(),
            "discovered sheet schema"
        );
        Ok(())
    }
}

impl Adapter for SheetsAdapter {
    fn get_columns(&self) -> &BTreeMap<String, Column> {
        &self.columns
    }

    // Sheet columns declare no sort capability, so `order` is left to the host.
    fn get_data(
        &self,
        bounds: &BTreeMap<String, Bound>,
        _order: &[(String, RequestedOrder)],
    ) -> Result<Rows> {
        let sql = build_query(bounds, &self.column_map)?;
        let (table, body) = self.run_query(&sql)?;

        if !table.cols.iter().map(|c| c.id.as_str()).eq(self.schema_ids.iter().map(String::as_str)) {
            warn!(
                expected = ?self.schema_ids,
                "response columns differ from discovered schema"
            );
        }

        // Cells are zipped positionally against this response's own columns.
        let labels: Vec<String> = table.cols.iter().map(|c| c.name().to_string()).collect();
        let decoded = decode_rows(&table, &body)?;
        debug!(rows = decoded.len(), "decoded gviz rows");

        let names = labels.clone();
        let rows = decoded.into_iter().enumerate().map(move |(i, cells)| Row {
            rowid: Some(i as i64),
            values: names.iter().cloned().zip(cells).collect(),
        });
        Ok(Rows::new(labels, Box::new(rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::Range;
    use crate::http::HttpResponse;
    use crate::response::JSON_PAYLOAD_PREFIX;
    use crate::types::{ColumnType, FilterKind, Order, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    const SHEET: &str = "https://docs.google.com/spreadsheets/d/abc123/edit#gid=0";

    const SCHEMA: &str = r#"{"status":"ok","table":{"cols":[
        {"id":"A","label":"country","type":"string"},
        {"id":"B","label":"cnt","type":"number","pattern":"General"}],
        "rows":[],"parsedNumHeaders":1}}"#;

    const DATA: &str = r#"{"status":"ok","table":{"cols":[
        {"id":"A","label":"country","type":"string"},
        {"id":"B","label":"cnt","type":"number","pattern":"General"}],
        "rows":[{"c":[{"v":"BR"},{"v":10.0,"f":"10"}]},{"c":[{"v":"IN"},{"v":20.0,"f":"20"}]}],
        "parsedNumHeaders":1}}"#;

    /// Replays canned bodies and records requested URLs and headers.
    struct Scripted {
        responses: RefCell<Vec<HttpResponse>>,
        seen: Rc<RefCell<Vec<(String, Vec<(String, String)>)>>>,
    }

    impl Transport for Scripted {
        fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse> {
            self.seen.borrow_mut().push((
                url.to_string(),
                headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ));
            Ok(self.responses.borrow_mut().remove(0))
        }
    }

    fn scripted(bodies: &[(u16, &str)]) -> (Box<dyn Transport>, Rc<RefCell<Vec<(String, Vec<(String, String)>)>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let transport = Scripted {
            responses: RefCell::new(
                bodies
                    .iter()
                    .map(|(status, body)| HttpResponse { status: *status, body: body.to_string() })
                    .collect(),
            ),
            seen: seen.clone(),
        };
        (Box::new(transport), seen)
    }

    #[test]
    fn discovers_schema_with_zero_row_query() {
        let (transport, seen) = scripted(&[(200, SCHEMA)]);
        let adapter = SheetsAdapter::with_transport(SHEET, transport).unwrap();

        let cols = adapter.get_columns();
        assert_eq!(cols["country"].remote_id, "A");
        assert_eq!(cols["country"].filters, vec![FilterKind::Equality]);
        assert_eq!(cols["cnt"].column_type, ColumnType::Number);
        assert_eq!(cols["cnt"].filters, vec![FilterKind::Range]);
        assert_eq!(cols["cnt"].order, Order::None);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].0,
            "https://docs.google.com/spreadsheets/d/abc123/gviz/tq?gid=0&tq=SELECT%20%2A%20LIMIT%200"
        );
        assert_eq!(seen[0].1, vec![("X-DataSource-Auth".to_string(), "true".to_string())]);
    }

    #[test]
    fn get_data_pushes_range_and_yields_positional_rowids() {
        let guarded = format!("{JSON_PAYLOAD_PREFIX}{DATA}");
        let (transport, seen) = scripted(&[(200, SCHEMA), (200, guarded.as_str())]);
        let adapter = SheetsAdapter::with_transport(SHEET, transport).unwrap();

        let mut bounds = BTreeMap::new();
        bounds.insert(
            "cnt".to_string(),
            Bound::Range(Range::new(Some(Value::Integer(10)), true, None, false)),
        );
        let rows: Vec<Row> = adapter.get_data(&bounds, &[]).unwrap().collect();

        assert!(seen.borrow()[1].0.ends_with("&tq=SELECT%20%2A%20WHERE%20B%20%3E%3D%2010"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rowid, Some(0));
        assert_eq!(rows[0].get("country"), Some(&Value::from("BR")));
        assert_eq!(rows[1].rowid, Some(1));
        assert_eq!(rows[1].get("cnt"), Some(&Value::Number(20.0)));
    }

    #[test]
    fn remote_failure_yields_no_rows() {
        let (transport, _) = scripted(&[(200, SCHEMA), (500, "backend exploded")]);
        let adapter = SheetsAdapter::with_transport(SHEET, transport).unwrap();
        match adapter.get_data(&BTreeMap::new(), &[]) {
            Err(AdapterError::RemoteQuery { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "backend exploded");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unsupported_bound_value_fails_before_any_request() {
        let (transport, seen) = scripted(&[(200, SCHEMA)]);
        let adapter = SheetsAdapter::with_transport(SHEET, transport).unwrap();
        let mut bounds = BTreeMap::new();
        bounds.insert("country".to_string(), Bound::Equal(Value::Boolean(true)));
        assert!(matches!(
            adapter.get_data(&bounds, &[]),
            Err(AdapterError::UnsupportedValue(_))
        ));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn bad_locator_is_rejected_without_requests() {
        let (transport, seen) = scripted(&[]);
        assert!(matches!(
            SheetsAdapter::with_transport("https://example.com/sheet", transport),
            Err(AdapterError::Configuration(_))
        ));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let schema = r#"{"status":"ok","table":{"cols":[
            {"id":"A","label":"x","type":"string"},{"id":"B","label":"x","type":"number"}],"rows":[]}}"#;
        let (transport, _) = scripted(&[(200, schema)]);
        assert!(matches!(
            SheetsAdapter::with_transport(SHEET, transport),
            Err(AdapterError::Configuration(_))
        ));
    }
}
