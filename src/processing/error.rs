use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Missing required column '{column}' in {table} table")]
    MissingColumn { table: String, column: String },

    #[error("Unparseable date '{value}' in {table} table")]
    InvalidDate { table: String, value: String },

    #[error("Column '{column}' in {table} table has unsupported type {dtype}")]
    UnsupportedType {
        table: String,
        column: String,
        dtype: String,
    },

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),
}
