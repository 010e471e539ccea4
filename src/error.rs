use crate::clients::error::FetchError;
use crate::config::ConfigError;
use crate::processing::error::ProcessingError;
use crate::storage::error::StorageError;
use crate::types::data_kind::DataKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Storage(StorageError),

    #[error("No {0} records available from any city")]
    DataAbsence(DataKind),

    #[error("Required input '{0}' not found; run the earlier pipeline stage first")]
    MissingInput(PathBuf),

    #[error("Failed processing DataFrame: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingInput(path) => PipelineError::MissingInput(path),
            other => PipelineError::Storage(other),
        }
    }
}
