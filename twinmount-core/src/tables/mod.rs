//! Firing and slope correction tables
//!
//! Both tables are parsed from CSV text once at start-up and are read-only
//! afterward. A table that fails to load is logged and left absent: every
//! lookup on an absent table answers 0 (or `None`), so the rest of the
//! engine keeps producing solutions.

mod firing;
mod slope;

pub use firing::{Coefficient, FiringColumn, FiringTable};
pub use slope::SlopeCorrectionTable;

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("Column header '{header}' (column {column}) is not a number")]
    NonNumericHeader { column: usize, header: String },

    #[error("Row {row}, column '{column}': '{value}' is not a number")]
    NonNumericCell {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("Range {0} appears more than once")]
    DuplicateRange(f64),

    #[error("Table has no data rows")]
    Empty,

    #[error("No {0} configured")]
    NotConfigured(&'static str),
}

/// The tables the engine works with, each possibly absent
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    pub firing: Option<FiringTable>,
    pub slope: Option<SlopeCorrectionTable>,
}

impl TableSet {
    pub fn new(firing: Option<FiringTable>, slope: Option<SlopeCorrectionTable>) -> Self {
        TableSet { firing, slope }
    }

    /// Keep the table if it loaded, log and drop the error otherwise
    pub fn from_results(
        firing: Result<FiringTable, TableError>,
        slope: Result<SlopeCorrectionTable, TableError>,
    ) -> Self {
        let firing = match firing {
            Ok(table) => {
                log::info!("Firing table loaded: {} rows", table.len());
                Some(table)
            }
            Err(e @ TableError::NotConfigured(_)) => {
                log::warn!("{}, elevation will read 0", e);
                None
            }
            Err(e) => {
                log::error!("Firing table not loaded: {}", e);
                None
            }
        };
        let slope = match slope {
            Ok(table) => {
                log::info!(
                    "Slope correction table loaded: {}x{}",
                    table.rows(),
                    table.columns()
                );
                Some(table)
            }
            Err(e @ TableError::NotConfigured(_)) => {
                log::warn!("{}, slope correction disabled", e);
                None
            }
            Err(e) => {
                log::error!("Slope correction table not loaded: {}", e);
                None
            }
        };
        TableSet { firing, slope }
    }

    /// Firing table value at `range`, 0 without a table
    pub fn interpolate(&self, range: f64, column: FiringColumn) -> f64 {
        self.firing
            .as_ref()
            .map_or(0.0, |t| t.interpolate(range, column))
    }

    /// Nearest-cell slope correction, `None` without a table
    pub fn slope_lookup(&self, slope_deg: f64, elevation_mils: f64) -> Option<f64> {
        self.slope.as_ref()?.lookup(slope_deg, elevation_mils)
    }

    /// Bilinear slope correction, `None` without a table
    pub fn slope_interpolate(&self, slope_deg: f64, elevation_mils: f64) -> Option<f64> {
        self.slope.as_ref()?.interpolate(slope_deg, elevation_mils)
    }
}

pub(crate) fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
