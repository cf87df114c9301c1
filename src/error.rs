use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    General(String),
}

#[cfg(feature = "python")]
impl From<MetricsError> for pyo3::PyErr {
    fn from(err: MetricsError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}
