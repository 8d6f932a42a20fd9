//! Source locator parsing.
//!
//! Turns a spreadsheet URL as a user would paste it
//! (`https://docs.google.com/spreadsheets/d/<id>/edit#gid=0`) into the gviz
//! query endpoint (`https://docs.google.com/spreadsheets/d/<id>/gviz/tq?gid=0`).

use crate::error::{AdapterError, Result};
use url::Url;

/// Path segment of the query service, appended to the sheet path.
pub const QUERY_SERVICE_PATH: &str = "gviz/tq";

const SOURCE_HOST: &str = "docs.google.com";
const SOURCE_PATH_PREFIX: &str = "/spreadsheets/";

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLocator {
    endpoint: Url,
    /// Header rows to skip; only sent when non-zero.
    pub headers: u32,
    /// Sheet tab id.
    pub gid: u32,
    /// Sheet name; preferred over `gid` when present.
    pub sheet: Option<String>,
}

impl SheetLocator {
    /// Whether `uri` points at a spreadsheet this adapter can query.
    pub fn supports(uri: &str) -> bool {
        match Url::parse(uri) {
            Ok(url) => {
                url.host_str() == Some(SOURCE_HOST) && url.path().starts_with(SOURCE_PATH_PREFIX)
            }
            Err(_) => false,
        }
    }

    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| AdapterError::Configuration(format!("invalid source URL '{uri}': {e}")))?;
        if !Self::supports(uri) {
            return Err(AdapterError::Configuration(format!(
                "'{uri}' is not a {SOURCE_HOST}{SOURCE_PATH_PREFIX}... URL"
            )));
        }

        let mut path = url.path().trim_end_matches('/');
        path = path.strip_suffix("/edit").unwrap_or(path);
        path = path
            .strip_suffix(QUERY_SERVICE_PATH)
            .and_then(|p| p.strip_suffix('/'))
            .unwrap_or(path);
        let path = format!("{path}/{QUERY_SERVICE_PATH}");

        let mut headers = 0;
        let mut gid = 0;
        let mut sheet = None;
        // Repeated parameters: the last one wins.
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "headers" => headers = parse_number("headers", &value)?,
                "gid" => gid = parse_number("gid", &value)?,
                "sheet" => sheet = Some(value.into_owned()),
                _ => {}
            }
        }
        if let Some(fragment_gid) = url.fragment().and_then(|f| f.strip_prefix("gid=")) {
            gid = parse_number("gid", fragment_gid)?;
        }

        let mut endpoint = url.clone();
        endpoint.set_path(&path);
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        Ok(Self { endpoint, headers, gid, sheet })
    }

    /// Query endpoint with sheet-selection parameters, without the query.
    pub fn base_url(&self) -> String {
        let mut params = url::form_urlencoded::Serializer::new(String::new());
        if self.headers > 0 {
            params.append_pair("headers", &self.headers.to_string());
        }
        match &self.sheet {
            Some(sheet) => params.append_pair("sheet", sheet),
            None => params.append_pair("gid", &self.gid.to_string()),
        };
        let mut url = self.endpoint.clone();
        url.set_query(Some(&params.finish()));
        url.to_string()
    }

    /// Full request URL for a gviz query string.
    pub fn query_url(&self, sql: &str) -> String {
        format!("{}&tq={}", self.base_url(), urlencoding::encode(sql))
    }
}

fn parse_number(name: &str, value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| AdapterError::Configuration(format!("'{name}' must be a non-negative integer, got '{value}'")))
}
