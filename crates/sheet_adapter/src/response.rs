//! gviz response decoding.
//!
//! ```json
//! {
//!   "status": "ok",
//!   "table": {
//!     "cols": [{"id": "A", "label": "country", "type": "string"},
//!              {"id": "B", "label": "cnt", "type": "number", "pattern": "General"}],
//!     "rows": [{"c": [{"v": "BR"}, {"v": 1.0, "f": "1"}]}],
//!     "parsedNumHeaders": 0
//!   }
//! }
//! ```
//!
//! The body may be prefixed with a fixed guard string that keeps it from
//! being evaluated as script; it is stripped before decoding.

use crate::error::{AdapterError, Result};
use crate::types::{ColumnType, Value};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

/// Guard prefix the query service may put in front of its JSON.
pub const JSON_PAYLOAD_PREFIX: &str = ")]}'\n";

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub table: Option<ResponseTable>,
    #[serde(default)]
    pub errors: Vec<ResponseIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseIssue {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub detailed_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseTable {
    pub cols: Vec<ResponseColumn>,
    #[serde(default)]
    pub rows: Vec<ResponseRow>,
    #[serde(default, rename = "parsedNumHeaders")]
    pub parsed_num_headers: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseColumn {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl ResponseColumn {
    /// Visible column name; unlabeled columns use their remote id.
    pub fn name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }

    pub fn column_type(&self) -> ColumnType {
        ColumnType::from_gviz(&self.kind)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseRow {
    #[serde(default)]
    pub c: Vec<Option<ResponseCell>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseCell {
    #[serde(default)]
    pub v: serde_json::Value,
    /// Display-formatted value
    #[serde(default)]
    pub f: Option<String>,
}

/// Check the HTTP status, strip the guard prefix and decode the table.
pub fn parse_response(status: u16, body: &str) -> Result<ResponseTable> {
    if status != 200 {
        return Err(remote_error(status, "non-success status", body));
    }
    let payload = body.strip_prefix(JSON_PAYLOAD_PREFIX).unwrap_or(body);
    let response: QueryResponse = serde_json::from_str(payload)
        .map_err(|e| remote_error(status, &format!("undecodable payload: {e}"), body))?;

    if response.status == "error" {
        let reason = response
            .errors
            .iter()
            .map(|issue| {
                if issue.detailed_message.is_empty() {
                    format!("{}: {}", issue.reason, issue.message)
                } else {
                    format!("{}: {}", issue.reason, issue.detailed_message)
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        return Err(remote_error(status, &reason, body));
    }

    response
        .table
        .ok_or_else(|| remote_error(status, "payload has no table", body))
}

/// Decode every row of `table` into typed values, positionally against the
/// table's own column list. Short rows are padded with nulls.
pub fn decode_rows(table: &ResponseTable, body: &str) -> Result<Vec<Vec<Value>>> {
    let types: Vec<ColumnType> = table.cols.iter().map(ResponseColumn::column_type).collect();
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            types
                .iter()
                .enumerate()
                .map(|(j, ty)| {
                    let cell = row.c.get(j).and_then(Option::as_ref);
                    decode_cell(*ty, cell).map_err(|reason| {
                        remote_error(200, &format!("row {i}, column {j}: {reason}"), body)
                    })
                })
                .collect::<Result<Vec<Value>>>()
        })
        .collect()
}

/// Decode a single cell according to its column type.
pub fn decode_cell(ty: ColumnType, cell: Option<&ResponseCell>) -> std::result::Result<Value, String> {
    let v = match cell {
        Some(cell) if !cell.v.is_null() => &cell.v,
        _ => return Ok(Value::Null),
    };
    match ty {
        ColumnType::String => Ok(match v {
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }),
        ColumnType::Number => v
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| format!("expected number, got {v}")),
        ColumnType::Boolean => v
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| format!("expected boolean, got {v}")),
        ColumnType::Date => {
            let parts = date_literal(v)?;
            if parts.len() < 3 {
                return Err(format!("date needs 3 components, got {v}"));
            }
            calendar_date(&parts).map(Value::Date)
        }
        ColumnType::DateTime => {
            let parts = date_literal(v)?;
            if parts.len() < 6 {
                return Err(format!("datetime needs at least 6 components, got {v}"));
            }
            let date = calendar_date(&parts)?;
            let time = time_of_day(&parts[3..])?;
            Ok(Value::DateTime(date.and_time(time)))
        }
        ColumnType::Time => {
            let parts = v
                .as_array()
                .ok_or_else(|| format!("expected [h, m, s, ms], got {v}"))?
                .iter()
                .map(|p| p.as_i64().ok_or_else(|| format!("non-integer time component in {v}")))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if parts.len() < 3 {
                return Err(format!("time needs at least 3 components, got {v}"));
            }
            time_of_day(&parts).map(Value::Time)
        }
    }
}

/// Components of a `Date(y,m,d[,h,mi,s[,ms]])` literal.
fn date_literal(v: &serde_json::Value) -> std::result::Result<Vec<i64>, String> {
    let s = v.as_str().ok_or_else(|| format!("expected Date(...) literal, got {v}"))?;
    let inner = s
        .strip_prefix("Date(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| format!("expected Date(...) literal, got {s}"))?;
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("bad component '{part}' in {s}"))
        })
        .collect()
}

// Months are 0-based in the literal.
fn calendar_date(parts: &[i64]) -> std::result::Result<NaiveDate, String> {
    let (y, m, d) = (parts[0], parts[1].checked_add(1), parts[2]);
    i32::try_from(y)
        .ok()
        .zip(m.and_then(|m| u32::try_from(m).ok()))
        .zip(u32::try_from(d).ok())
        .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
        .ok_or_else(|| format!("invalid date {y},{},{d} (0-based month)", parts[1]))
}

fn time_of_day(parts: &[i64]) -> std::result::Result<NaiveTime, String> {
    let component = |i: usize| u32::try_from(parts.get(i).copied().unwrap_or(0)).ok();
    component(0)
        .zip(component(1))
        .zip(component(2))
        .zip(component(3))
        .and_then(|(((h, m), s), ms)| NaiveTime::from_hms_milli_opt(h, m, s, ms))
        .ok_or_else(|| format!("invalid time of day {parts:?}"))
}

fn remote_error(status: u16, reason: &str, body: &str) -> AdapterError {
    AdapterError::RemoteQuery {
        status,
        reason: reason.to_string(),
        body: body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    const PAYLOAD: &str = r#"{
        "version": "0.6",
        "reqId": "0",
        "status": "ok",
        "sig": "1453301915",
        "table": {
            "cols": [
                {"id": "A", "label": "country", "type": "string"},
                {"id": "B", "label": "cnt", "type": "number", "pattern": "General"}
            ],
            "rows": [{"c": [{"v": "BR"}, {"v": 1.0, "f": "1"}]}, {"c": [{"v": "IN"}, null]}],
            "parsedNumHeaders": 0
        }
    }"#;

    fn cell(v: serde_json::Value) -> ResponseCell {
        ResponseCell { v, f: None }
    }

    #[test]
    fn guard_prefix_and_plain_payloads_decode_identically() {
        let guarded = format!("{JSON_PAYLOAD_PREFIX}{PAYLOAD}");
        let a = parse_response(200, &guarded).unwrap();
        let b = parse_response(200, PAYLOAD).unwrap();
        assert_eq!(decode_rows(&a, &guarded).unwrap(), decode_rows(&b, PAYLOAD).unwrap());
        assert_eq!(
            decode_rows(&b, PAYLOAD).unwrap(),
            vec![
                vec![Value::from("BR"), Value::Number(1.0)],
                vec![Value::from("IN"), Value::Null],
            ]
        );
    }

    #[test]
    fn non_success_status_keeps_raw_body() {
        let err = parse_response(404, "<html>not found</html>").unwrap_err();
        match err {
            AdapterError::RemoteQuery { status, body, .. } => {
                assert_eq!(status, 404);
                assert_eq!(body, "<html>not found</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_body_is_a_remote_query_error() {
        assert!(matches!(
            parse_response(200, "<html>"),
            Err(AdapterError::RemoteQuery { status: 200, .. })
        ));
    }

    #[test]
    fn error_status_in_payload_is_reported() {
        let body = r#"{"status": "error", "errors": [{"reason": "invalid_query", "message": "INVALID_QUERY", "detailed_message": "Invalid query: NO_COLUMN: C"}]}"#;
        match parse_response(200, body).unwrap_err() {
            AdapterError::RemoteQuery { reason, .. } => {
                assert_eq!(reason, "invalid_query: Invalid query: NO_COLUMN: C");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decodes_temporal_cells() {
        let date = decode_cell(ColumnType::Date, Some(&cell(serde_json::json!("Date(2020,0,31)"))));
        assert_eq!(date, Ok(Value::Date(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap())));

        let dt = decode_cell(
            ColumnType::DateTime,
            Some(&cell(serde_json::json!("Date(2018,8,1,12,30,15)"))),
        )
        .unwrap();
        let expected = NaiveDateTime::parse_from_str("2018-09-01 12:30:15", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(dt, Value::DateTime(expected));

        let time = decode_cell(ColumnType::Time, Some(&cell(serde_json::json!([17, 5, 30, 250])))).unwrap();
        assert_eq!(time, Value::Time(NaiveTime::from_hms_milli_opt(17, 5, 30, 250).unwrap()));
    }

    #[test]
    fn decodes_scalars_and_nulls() {
        assert_eq!(
            decode_cell(ColumnType::Boolean, Some(&cell(serde_json::json!(true)))),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            decode_cell(ColumnType::String, Some(&cell(serde_json::json!(3)))),
            Ok(Value::from("3"))
        );
        assert_eq!(decode_cell(ColumnType::Number, None), Ok(Value::Null));
        assert_eq!(
            decode_cell(ColumnType::Number, Some(&cell(serde_json::Value::Null))),
            Ok(Value::Null)
        );
    }

    #[test]
    fn mistyped_cell_fails() {
        assert!(decode_cell(ColumnType::Number, Some(&cell(serde_json::json!("ten")))).is_err());
        assert!(decode_cell(ColumnType::Date, Some(&cell(serde_json::json!("2020-01-01")))).is_err());
        assert!(decode_cell(ColumnType::Date, Some(&cell(serde_json::json!("Date(2020,13,1)")))).is_err());
        assert!(decode_cell(
            ColumnType::Date,
            Some(&cell(serde_json::json!("Date(2020,9223372036854775807,1)")))
        )
        .is_err());
        assert!(decode_cell(
            ColumnType::DateTime,
            Some(&cell(serde_json::json!("Date(2020,-1,1,0,0,0)")))
        )
        .is_err());
    }

    #[test]
    fn unlabeled_column_uses_id() {
        let col = ResponseColumn {
            id: "C".into(),
            label: String::new(),
            kind: "currency".into(),
            pattern: None,
        };
        assert_eq!(col.name(), "C");
        assert_eq!(col.column_type(), ColumnType::String);
    }
}
