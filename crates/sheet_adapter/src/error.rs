use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("configuration: {0}")]
    Configuration(String),

    #[error("authentication: {0}")]
    Authentication(String),

    #[error("remote query failed (HTTP {status}): {reason}")]
    RemoteQuery {
        status: u16,
        reason: String,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    #[error("unsupported value: can't quote {0}")]
    UnsupportedValue(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("row {0} not found")]
    RowNotFound(i64),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("http: {0}")]
    Http(String),

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
