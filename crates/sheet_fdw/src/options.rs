//! Foreign-table options.
//!
//! The host hands over two strings: the registry key of the adapter and a
//! JSON array of constructor arguments.
//!
//! ```text
//! OPTIONS (adapter 'gsheetsapi', args '["https://docs.google.com/spreadsheets/d/<id>/edit#gid=0"]')
//! ```

use crate::error::{FdwError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FdwOptions {
    /// Registry key of the adapter
    pub adapter: String,
    /// Serialized argument list (JSON array)
    #[serde(default)]
    pub args: String,
}

impl FdwOptions {
    pub fn new(adapter: impl Into<String>, args: &[Value]) -> Self {
        Self {
            adapter: adapter.into(),
            args: Value::Array(args.to_vec()).to_string(),
        }
    }

    /// Read options from the host's string map. `args` may be omitted.
    pub fn from_map(options: &BTreeMap<String, String>) -> Result<Self> {
        let adapter = options
            .get("adapter")
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| FdwError::Configuration("missing option 'adapter'".into()))?;
        Ok(Self {
            adapter: adapter.clone(),
            args: options.get("args").cloned().unwrap_or_default(),
        })
    }

    /// Deserialize the argument list. An empty string means no arguments.
    pub fn parse_args(&self) -> Result<Vec<Value>> {
        if self.args.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&self.args) {
            Ok(Value::Array(args)) => Ok(args),
            Ok(other) => Err(FdwError::Configuration(format!(
                "'args' must be a JSON array, got {other}"
            ))),
            Err(e) => Err(FdwError::Configuration(format!("'args' is not valid JSON: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_round_trip_through_new() {
        let opts = FdwOptions::new("memory", &[json!("a"), json!(1), json!(null)]);
        assert_eq!(opts.parse_args().unwrap(), vec![json!("a"), json!(1), json!(null)]);
    }

    #[test]
    fn empty_args_mean_no_arguments() {
        let mut map = BTreeMap::new();
        map.insert("adapter".to_string(), "memory".to_string());
        let opts = FdwOptions::from_map(&map).unwrap();
        assert!(opts.parse_args().unwrap().is_empty());
    }

    #[test]
    fn missing_adapter_is_a_configuration_error() {
        let map = BTreeMap::new();
        assert!(matches!(FdwOptions::from_map(&map), Err(FdwError::Configuration(_))));
    }

    #[test]
    fn non_array_args_are_rejected() {
        let opts = FdwOptions { adapter: "memory".into(), args: r#"{"uri": "x"}"#.into() };
        assert!(matches!(opts.parse_args(), Err(FdwError::Configuration(_))));
        let opts = FdwOptions { adapter: "memory".into(), args: "[".into() };
        assert!(matches!(opts.parse_args(), Err(FdwError::Configuration(_))));
    }
}
