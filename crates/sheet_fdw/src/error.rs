use sheet_adapter::AdapterError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FdwError {
    #[error("configuration: {0}")]
    Configuration(String),

    #[error("row has no rowid")]
    MissingRowId,

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

pub type Result<T> = std::result::Result<T, FdwError>;
