//! Read-only ADAE dataset backed by a polars `DataFrame`.

use crate::error::{QueryError, Result};
use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::info;

pub const SUBJECT_COLUMN: &str = "USUBJID";
pub const SEVERITY_COLUMN: &str = "AESEV";

/// Columns without which a dataset is rejected
pub const REQUIRED_COLUMNS: [&str; 2] = [SUBJECT_COLUMN, SEVERITY_COLUMN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// Distinct observed values of a column, truncated at a cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSample {
    pub values: Vec<String>,
    /// Distinct values left out by the cap
    pub remaining: usize,
}

impl ValueSample {
    pub fn is_truncated(&self) -> bool {
        self.remaining > 0
    }
}

impl fmt::Display for ValueSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values.join("\n"))?;
        if self.remaining > 0 {
            write!(f, "\n... and {} more", self.remaining)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
}

impl Dataset {
    /// Wrap a loaded frame: column names are uppercased and the required
    /// columns checked.
    pub fn from_frame(frame: DataFrame) -> Result<Self> {
        let original: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut seen = HashSet::new();
        for name in &original {
            if !seen.insert(name.to_uppercase()) {
                return Err(QueryError::Dataset(format!(
                    "Column names collide after uppercasing: {}",
                    name.to_uppercase()
                )));
            }
        }

        let mut frame = frame;
        for name in &original {
            let upper = name.to_uppercase();
            if &upper != name {
                frame.rename(name, &upper).map_err(|e| {
                    QueryError::Dataset(format!("Failed to rename column {}: {}", name, e))
                })?;
            }
        }

        for required in REQUIRED_COLUMNS {
            if frame.column(required).is_err() {
                return Err(QueryError::Dataset(format!(
                    "Missing required column: {}",
                    required
                )));
            }
        }

        Ok(Self { frame })
    }

    /// Load a CSV file with a header row
    pub fn load_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QueryError::Dataset(format!(
                "Dataset file not found: {}",
                path.display()
            )));
        }

        let frame = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(|e| {
                QueryError::Dataset(format!("Failed to load {}: {}", path.display(), e))
            })?;

        let dataset = Self::from_frame(frame)?;
        info!(
            "Loaded dataset {} ({} rows, {} columns)",
            path.display(),
            dataset.height(),
            dataset.frame.width()
        );
        Ok(dataset)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.frame.column(column).is_ok()
    }

    /// Integer and float columns are numeric; everything else compares as text.
    pub fn column_kind(&self, column: &str) -> Option<ColumnKind> {
        self.frame.column(column).ok().map(|s| kind_of(s.dtype()))
    }

    /// Distinct, non-null, trimmed values of a column in first-appearance
    /// order, keeping at most `cap` of them.
    pub fn sample_values(&self, column: &str, cap: usize) -> Result<ValueSample> {
        let series = self
            .frame
            .column(column)
            .map_err(|_| QueryError::InvalidColumn(column.to_string()))?;
        let as_text = series.cast(&DataType::String)?;
        let distinct: Vec<String> = as_text
            .str()?
            .into_iter()
            .flatten()
            .map(|v| v.trim().to_string())
            .unique()
            .collect();

        let remaining = distinct.len().saturating_sub(cap);
        let values = distinct.into_iter().take(cap).collect();
        Ok(ValueSample { values, remaining })
    }
}

pub(crate) fn kind_of(dtype: &DataType) -> ColumnKind {
    if dtype.is_numeric() {
        ColumnKind::Numeric
    } else {
        ColumnKind::Text
    }
}
