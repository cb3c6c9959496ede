//! CSV bar source.
//!
//! Expects a header row `date,open,high,low,close` with an optional `volume`
//! column and dates like `2021-01-04T14:30:00Z`. Every column is read as text
//! and cast to f64, so non-numeric cells become nulls. Rows whose close is
//! null are dropped; other gaps are forward-filled from the previous row.

use super::provider::{BarSource, DataError, DataSource};
use crate::domain::RawBar;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

pub struct CsvSource {
    path: PathBuf,
    name: String,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("csv:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn csv_err(&self, message: impl std::fmt::Display) -> DataError {
        DataError::Csv {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }

    fn read_frame(&self) -> Result<DataFrame, DataError> {
        if !self.path.exists() {
            return Err(DataError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", self.path.display()),
            )));
        }
        LazyCsvReader::new(&self.path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(|e| self.csv_err(e))
    }

    fn numeric_column(&self, df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
        let column = df
            .column(name)
            .map_err(|_| self.csv_err(format!("missing column '{name}'")))?;
        let cast = column
            .cast(&DataType::Float64)
            .map_err(|e| self.csv_err(format!("{name}: {e}")))?;
        let values = cast
            .f64()
            .map_err(|e| self.csv_err(format!("{name}: {e}")))?;
        Ok(values.into_iter().collect())
    }

    /// Parse the dates of the rows flagged in `keep`; dropped rows are never parsed.
    fn date_column(&self, df: &DataFrame, keep: &[bool]) -> Result<Vec<NaiveDateTime>, DataError> {
        let column = df
            .column("date")
            .map_err(|_| self.csv_err("missing column 'date'"))?;
        let values = column
            .str()
            .map_err(|e| self.csv_err(format!("date: {e}")))?;
        values
            .into_iter()
            .zip(keep)
            .enumerate()
            .filter(|(_, (_, kept))| **kept)
            .map(|(row, (cell, _))| {
                let cell = cell.ok_or_else(|| self.csv_err(format!("empty date at row {row}")))?;
                parse_timestamp(cell)
                    .ok_or_else(|| self.csv_err(format!("unparseable date '{cell}' at row {row}")))
            })
            .collect()
    }
}

/// Parse the accepted timestamp formats; a bare date means midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// Keep the rows flagged in `keep`, carrying the last kept value forward
/// over nulls. Leading nulls stay NaN.
fn forward_fill(values: &[Option<f64>], keep: &[bool]) -> Vec<f64> {
    let mut last = None;
    values
        .iter()
        .zip(keep)
        .filter(|(_, kept)| **kept)
        .map(|(value, _)| {
            if let Some(v) = value {
                last = Some(*v);
            }
            last.unwrap_or(f64::NAN)
        })
        .collect()
}

impl BarSource for CsvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DataSource {
        DataSource::CsvFile
    }

    fn load(&mut self) -> Result<Vec<RawBar>, DataError> {
        let df = self.read_frame()?;
        let close = self.numeric_column(&df, "close")?;
        let open = self.numeric_column(&df, "open")?;
        let high = self.numeric_column(&df, "high")?;
        let low = self.numeric_column(&df, "low")?;
        let volume = if df.column("volume").is_ok() {
            self.numeric_column(&df, "volume")?
        } else {
            vec![Some(0.0); df.height()]
        };

        let keep: Vec<bool> = close.iter().map(|c| c.is_some()).collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped > 0 {
            warn!(path = %self.path.display(), dropped, "dropped rows with non-numeric close");
        }
        let dates = self.date_column(&df, &keep)?;

        let open = forward_fill(&open, &keep);
        let high = forward_fill(&high, &keep);
        let low = forward_fill(&low, &keep);
        let volume = forward_fill(&volume, &keep);

        let bars: Vec<RawBar> = dates
            .into_iter()
            .zip(close.into_iter().flatten())
            .enumerate()
            .map(|(i, (timestamp, close))| RawBar {
                timestamp,
                open: open[i],
                high: high[i],
                low: low[i],
                close,
                volume: volume[i],
            })
            .collect();

        info!(path = %self.path.display(), bars = bars.len(), "loaded CSV bars");
        Ok(bars)
    }
}
