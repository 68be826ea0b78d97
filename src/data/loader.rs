//! CSV loading from disk or from uploaded bytes

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::{Result, RisklabError};

/// Loads CSV data into a [`DataFrame`].
///
/// The loader accepts either a path on disk or a raw byte buffer, the
/// latter covering files handed over by an upload form. Parses with a
/// header row and schema inference over the leading rows.
#[derive(Debug, Clone)]
pub struct DataLoader {
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(100),
        }
    }

    /// Override the number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, n_rows: usize) -> Self {
        self.infer_schema_length = Some(n_rows);
        self
    }

    /// Load a CSV file from disk.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| RisklabError::DataFormat(format!("{}: {}", path.display(), e)))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| RisklabError::DataFormat(e.to_string()))?;

        Self::reject_empty(df)
    }

    /// Parse CSV content handed over as raw bytes.
    pub fn load_csv_bytes(&self, bytes: &[u8]) -> Result<DataFrame> {
        let cursor = Cursor::new(bytes.to_vec());

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(cursor)
            .finish()
            .map_err(|e| RisklabError::DataFormat(e.to_string()))?;

        Self::reject_empty(df)
    }

    /// Load the uploaded buffer when present, the default path otherwise.
    pub fn load(&self, uploaded: Option<&[u8]>, default_path: impl AsRef<Path>) -> Result<DataFrame> {
        match uploaded {
            Some(bytes) => self.load_csv_bytes(bytes),
            None => self.load_csv(default_path),
        }
    }

    /// A parsed table with zero rows is as unusable as an unparseable one.
    fn reject_empty(df: DataFrame) -> Result<DataFrame> {
        if df.height() == 0 {
            return Err(RisklabError::DataFormat("table has no rows".to_string()));
        }
        info!(rows = df.height(), cols = df.width(), "loaded table");
        Ok(df)
    }
}
