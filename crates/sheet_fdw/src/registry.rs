//! Typed adapter registry.
//!
//! Maps the `adapter` option to a constructor. Keys are checked when they are
//! registered, so a bad key fails at startup instead of on first query.

use crate::error::{FdwError, Result};
use crate::options::FdwOptions;
use serde_json::Value;
use sheet_adapter::{Adapter, ColumnSpec, MemoryAdapter, Row};
use std::collections::BTreeMap;
use tracing::debug;

/// Builds an adapter from the deserialized argument list.
pub type AdapterFactory = fn(&[Value]) -> Result<Box<dyn Adapter>>;

pub const MEMORY_ADAPTER: &str = "memory";
#[cfg(feature = "http")]
pub const SHEETS_ADAPTER: &str = "gsheetsapi";

pub struct Registry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every adapter this crate ships.
    pub fn with_builtins() -> Self {
        let mut factories: BTreeMap<String, AdapterFactory> = BTreeMap::new();
        factories.insert(MEMORY_ADAPTER.to_string(), load_memory);
        #[cfg(feature = "http")]
        factories.insert(SHEETS_ADAPTER.to_string(), load_sheets);
        Self { factories }
    }

    pub fn register(&mut self, name: &str, factory: AdapterFactory) -> Result<()> {
        if name.trim().is_empty() {
            return Err(FdwError::Configuration("adapter name must not be empty".into()));
        }
        if self.factories.contains_key(name) {
            return Err(FdwError::Configuration(format!(
                "adapter '{name}' is already registered"
            )));
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<AdapterFactory> {
        self.factories.get(name).copied().ok_or_else(|| {
            FdwError::Configuration(format!(
                "unknown adapter '{name}' (available: {})",
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Look up `options.adapter` and call it with the parsed argument list.
    pub fn build(&self, options: &FdwOptions) -> Result<Box<dyn Adapter>> {
        let factory = self.load(&options.adapter)?;
        let args = options.parse_args()?;
        debug!(adapter = %options.adapter, args = args.len(), "building adapter");
        factory(&args)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// `[[{label, type}, ...], [row, ...]?]`
fn load_memory(args: &[Value]) -> Result<Box<dyn Adapter>> {
    if args.len() > 2 {
        return Err(FdwError::Configuration(format!(
            "memory adapter takes at most 2 arguments, got {}",
            args.len()
        )));
    }
    let specs: Vec<ColumnSpec> = match args.first() {
        Some(spec) => serde_json::from_value(spec.clone())
            .map_err(|e| FdwError::Configuration(format!("memory column list: {e}")))?,
        None => {
            return Err(FdwError::Configuration(
                "memory adapter needs a column list".into(),
            ))
        }
    };
    let rows: Vec<Row> = match args.get(1) {
        Some(rows) => serde_json::from_value(rows.clone())
            .map_err(|e| FdwError::Configuration(format!("memory rows: {e}")))?,
        None => Vec::new(),
    };
    Ok(Box::new(MemoryAdapter::with_rows(specs, rows)?))
}

/// `[uri, service_account_info?, subject?]`
#[cfg(feature = "http")]
fn load_sheets(args: &[Value]) -> Result<Box<dyn Adapter>> {
    use sheet_adapter::SheetsAdapter;

    let uri = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| FdwError::Configuration("sheets adapter needs a URI string".into()))?;
    let info = args.get(1).filter(|v| !v.is_null());
    let subject = match args.get(2) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(other) => {
            return Err(FdwError::Configuration(format!(
                "subject must be a string, got {other}"
            )))
        }
    };
    Ok(Box::new(SheetsAdapter::new(uri, info, subject)?))
}
