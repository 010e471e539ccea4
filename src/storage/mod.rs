//! CSV persistence under the data directory.
//!
//! Layout:
//!
//! ```text
//! <root>/raw/weather/{slug}_weather.csv
//! <root>/raw/energy/{slug}_energy.csv
//! <root>/processed/merged_data.csv
//! <root>/processed/{slug}_quality_report.csv   (or data_quality_report.csv)
//! <root>/processed/<summary>.csv
//! ```
//!
//! Every write goes to a temporary file in the destination directory and is
//! renamed into place, so readers never see a half-written table.

pub mod error;

use crate::storage::error::StorageError;
use crate::types::city::{city_slug, City};
use crate::types::data_kind::DataKind;
use log::{debug, info, warn};
use polars::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::task;

pub const MERGED_FILE: &str = "merged_data.csv";
pub const AGGREGATE_QUALITY_FILE: &str = "data_quality_report.csv";

#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self, kind: DataKind) -> PathBuf {
        self.root.join("raw").join(kind.to_string())
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    /// Per-city raw file for `Weather` or `Energy`.
    pub fn raw_path(&self, kind: DataKind, city: &City) -> PathBuf {
        self.raw_dir(kind)
            .join(format!("{}_{}.csv", city.slug(), kind))
    }

    pub fn merged_path(&self) -> PathBuf {
        self.processed_dir().join(MERGED_FILE)
    }

    /// Quality report for one city, or the aggregate report when `scope` is `None`.
    pub fn quality_path(&self, scope: Option<&str>) -> PathBuf {
        match scope {
            Some(city) => self
                .processed_dir()
                .join(format!("{}_quality_report.csv", city_slug(city))),
            None => self.processed_dir().join(AGGREGATE_QUALITY_FILE),
        }
    }

    pub fn summary_path(&self, file_name: &str) -> PathBuf {
        self.processed_dir().join(file_name)
    }

    /// Writes `df` as CSV with a header, replacing any existing file atomically.
    pub fn write_frame(&self, path: &Path, df: &mut DataFrame) -> Result<(), StorageError> {
        let dir = path.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(dir).map_err(|e| StorageError::DirCreation(dir.to_path_buf(), e))?;

        let mut temp_file =
            NamedTempFile::new_in(dir).map_err(|e| StorageError::WriteIo(path.to_path_buf(), e))?;
        CsvWriter::new(temp_file.as_file_mut())
            .include_header(true)
            .finish(df)
            .map_err(|e| StorageError::CsvWrite(path.to_path_buf(), e))?;
        temp_file
            .persist(path)
            .map_err(|e| StorageError::Persist(path.to_path_buf(), e))?;

        debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(())
    }

    /// [`OutputStore::write_frame`] on the blocking pool, for async callers.
    pub async fn save_frame(&self, path: PathBuf, mut df: DataFrame) -> Result<(), StorageError> {
        let store = self.clone();
        task::spawn_blocking(move || store.write_frame(&path, &mut df)).await?
    }

    /// Deletes a previously written file. Returns whether one was there.
    pub async fn discard(&self, path: &Path) -> Result<bool, StorageError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::RemoveIo(path.to_path_buf(), e)),
        }
    }

    /// Reads a CSV written by [`OutputStore::write_frame`], parsing date columns.
    pub fn read_frame(&self, path: &Path) -> Result<DataFrame, StorageError> {
        if !path.exists() {
            return Err(StorageError::MissingInput(path.to_path_buf()));
        }
        CsvReadOptions::default()
            .with_has_header(true)
            .map_parse_options(|options| options.with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(|e| StorageError::CsvRead(path.to_path_buf(), e))?
            .finish()
            .map_err(|e| StorageError::CsvRead(path.to_path_buf(), e))
    }

    /// Loads and stacks every city's raw file of one kind.
    ///
    /// Cities without a file are skipped with a warning; if no city has one the
    /// raw directory itself is reported missing.
    pub fn read_raw(&self, kind: DataKind, cities: &[City]) -> Result<DataFrame, StorageError> {
        let mut frames = Vec::new();
        for city in cities {
            let path = self.raw_path(kind, city);
            if !path.exists() {
                warn!("No raw {} file for {} at {}", kind, city, path.display());
                continue;
            }
            frames.push(self.read_frame(&path)?.lazy());
        }

        if frames.is_empty() {
            return Err(StorageError::MissingInput(self.raw_dir(kind)));
        }

        let stacked = concat(
            frames,
            UnionArgs {
                to_supertypes: true,
                ..Default::default()
            },
        )
        .and_then(|lf| lf.collect())
        .map_err(|e| StorageError::CsvRead(self.raw_dir(kind), e))?;

        info!("Loaded {} raw {} rows", stacked.height(), kind);
        Ok(stacked)
    }
}
