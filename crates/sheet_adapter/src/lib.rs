//! Spreadsheet adapter: a remote sheet as a queryable table.
//!
//! Column filters arrive as per-column `Bound`s, are translated into a single
//! gviz query string, and the semi-structured gviz response comes back as
//! uniformly typed rows.
//!
//! # Architecture
//!
//! ```text
//! bounds: { label -> Bound }
//!   │
//!   ▼  query::build_query  (labels -> remote ids, quoting)
//! SELECT * WHERE B >= 10 AND A = 'BR'
//!   │
//!   ▼  Transport::get      (blocking GET <sheet>/gviz/tq?gid=0&tq=...)
//! )]}'\n{"status":"ok","table":{...}}
//!   │
//!   ▼  response::parse_response + decode_rows
//! Rows (lazy, rowid = position in this result)
//! ```
//!
//! Rowids handed out by `SheetsAdapter` are positions within one result set,
//! not stable remote keys: a rowid is only meaningful for the query that
//! produced it.

pub mod adapter;
pub mod auth;
pub mod bound;
pub mod error;
pub mod http;
pub mod locator;
pub mod memory;
pub mod query;
pub mod response;
pub mod sheets;
pub mod types;

pub use adapter::Adapter;
pub use bound::{Bound, Operator, Range};
pub use error::AdapterError;
pub use memory::{ColumnSpec, MemoryAdapter};
pub use sheets::SheetsAdapter;
pub use types::{Column, ColumnType, FilterKind, Order, RequestedOrder, Row, Rows, Value, ROWID};
