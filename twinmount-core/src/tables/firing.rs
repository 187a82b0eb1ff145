//! Firing table
//!
//! Range-indexed table of the base elevation (angular mils) and the
//! correction coefficients used by the ballistic model. The CSV file must
//! carry a `X` column (range, meters) and a `P` column (elevation, mils);
//! each correction column is optional and may be written with an ASCII `d`
//! or a `Δ` prefix (`dXT` or `ΔXT`). A correction column with a cell that is
//! not a number is left out of the table, which then reads it as 0.

use serde::{Deserialize, Serialize};
use std::io::Read;

use super::{parse_number, TableError};

const RANGE_HEADER: &str = "X";
const ELEVATION_HEADER: &str = "P";

/// Correction coefficient columns of the firing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coefficient {
    /// Elevation per degree of air temperature deviation
    XT,
    /// Elevation per degree of charge temperature deviation
    XTsz,
    /// Elevation per unit of air pressure deviation
    XH,
    /// Elevation per m/s of along-track wind, low layer
    Xwhx,
    /// Elevation per m/s of along-track wind, high layer
    Xwbex,
    /// Elevation per m/s of cross wind, low layer
    Xwhz,
    /// Elevation for the alternate propellant type
    Xkacn,
    /// Divisor applied to the summed elevation terms
    XTbic,
    /// Azimuth per m/s of cross wind, low layer
    Zwhz,
    /// Azimuth per m/s of along-track wind, low layer
    Zwhx,
    /// Azimuth per m/s of cross wind, high layer
    Zwbez,
}

impl Coefficient {
    pub const ALL: [Coefficient; 11] = [
        Coefficient::XT,
        Coefficient::XTsz,
        Coefficient::XH,
        Coefficient::Xwhx,
        Coefficient::Xwbex,
        Coefficient::Xwhz,
        Coefficient::Xkacn,
        Coefficient::XTbic,
        Coefficient::Zwhz,
        Coefficient::Zwhx,
        Coefficient::Zwbez,
    ];

    /// Column name without the delta prefix
    pub fn name(self) -> &'static str {
        match self {
            Coefficient::XT => "XT",
            Coefficient::XTsz => "XTsz",
            Coefficient::XH => "XH",
            Coefficient::Xwhx => "Xwhx",
            Coefficient::Xwbex => "Xwbex",
            Coefficient::Xwhz => "Xwhz",
            Coefficient::Xkacn => "Xkacn",
            Coefficient::XTbic => "XTbic",
            Coefficient::Zwhz => "Zwhz",
            Coefficient::Zwhx => "Zwhx",
            Coefficient::Zwbez => "Zwbez",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn from_header(header: &str) -> Option<Coefficient> {
        let name = header
            .strip_prefix('Δ')
            .or_else(|| header.strip_prefix('d'))?;
        Coefficient::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// A column of the firing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FiringColumn {
    /// Base elevation, mils
    Elevation,
    Correction(Coefficient),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiringTable {
    /// Meters, strictly ascending after construction
    range: Vec<f64>,
    elevation_mils: Vec<f64>,
    corrections: [Option<Vec<f64>>; Coefficient::ALL.len()],
}

impl FiringTable {
    /// Build a table from columns in any row order.
    ///
    /// Rows are sorted by range; every correction column is reordered with
    /// the same permutation.
    pub fn from_columns(
        range: Vec<f64>,
        elevation_mils: Vec<f64>,
        corrections: Vec<(Coefficient, Vec<f64>)>,
    ) -> Result<Self, TableError> {
        if range.is_empty() {
            return Err(TableError::Empty);
        }
        let expected = range.len();
        let check = |column: &'static str, found: usize| {
            if found == expected {
                Ok(())
            } else {
                Err(TableError::LengthMismatch {
                    column,
                    found,
                    expected,
                })
            }
        };
        check(ELEVATION_HEADER, elevation_mils.len())?;
        for (coefficient, column) in &corrections {
            check(coefficient.name(), column.len())?;
        }

        let mut order: Vec<usize> = (0..range.len()).collect();
        order.sort_by(|&a, &b| range[a].total_cmp(&range[b]));
        if let Some(pair) = order.windows(2).find(|w| range[w[0]] == range[w[1]]) {
            return Err(TableError::DuplicateRange(range[pair[0]]));
        }
        let permute = |column: &[f64]| order.iter().map(|&i| column[i]).collect::<Vec<f64>>();

        let mut sorted: [Option<Vec<f64>>; Coefficient::ALL.len()] = Default::default();
        for (coefficient, column) in corrections {
            sorted[coefficient.index()] = Some(permute(&column));
        }

        Ok(FiringTable {
            range: permute(&range),
            elevation_mils: permute(&elevation_mils),
            corrections: sorted,
        })
    }

    /// Parse a firing table from CSV text with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv.headers()?.clone();

        let position = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(TableError::MissingColumn(name))
        };
        let range_col = position(RANGE_HEADER)?;
        let elevation_col = position(ELEVATION_HEADER)?;
        let correction_cols: Vec<(usize, Coefficient)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| Coefficient::from_header(h).map(|c| (i, c)))
            .collect();

        let mut range = Vec::new();
        let mut elevation = Vec::new();
        // A correction column with a bad cell is dropped, not the table
        let mut corrections: Vec<Option<Vec<f64>>> = vec![Some(Vec::new()); correction_cols.len()];

        for (row, record) in csv.records().enumerate() {
            let record = record?;
            let value = |col: usize| record.get(col).unwrap_or("");
            let cell = |col: usize| -> Result<f64, TableError> {
                parse_number(value(col)).ok_or_else(|| TableError::NonNumericCell {
                    row: row + 1,
                    column: headers.get(col).unwrap_or("").to_string(),
                    value: value(col).to_string(),
                })
            };
            range.push(cell(range_col)?);
            elevation.push(cell(elevation_col)?);
            for (slot, (col, coefficient)) in corrections.iter_mut().zip(&correction_cols) {
                let Some(values) = slot else {
                    continue;
                };
                match parse_number(value(*col)) {
                    Some(number) => values.push(number),
                    None => {
                        log::warn!(
                            "Firing table column {} dropped: row {} value '{}' is not a number",
                            coefficient.name(),
                            row + 1,
                            value(*col)
                        );
                        *slot = None;
                    }
                }
            }
        }

        let corrections = correction_cols
            .iter()
            .map(|(_, c)| *c)
            .zip(corrections)
            .filter_map(|(c, values)| values.map(|values| (c, values)))
            .collect();
        FiringTable::from_columns(range, elevation, corrections)
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Ranges in meters, strictly ascending
    pub fn ranges(&self) -> &[f64] {
        &self.range
    }

    pub fn has(&self, column: FiringColumn) -> bool {
        self.column(column).is_some()
    }

    fn column(&self, column: FiringColumn) -> Option<&[f64]> {
        match column {
            FiringColumn::Elevation => Some(&self.elevation_mils),
            FiringColumn::Correction(c) => self.corrections[c.index()].as_deref(),
        }
    }

    /// Value of `column` at `range`.
    ///
    /// Piecewise linear inside the table, linear extrapolation from the first
    /// or last two rows outside it. An absent column or a non-finite range
    /// gives 0.
    pub fn interpolate(&self, range: f64, column: FiringColumn) -> f64 {
        let values = match self.column(column) {
            Some(values) => values,
            None => return 0.0,
        };
        if !range.is_finite() {
            return 0.0;
        }

        let xs = &self.range;
        let n = xs.len();
        match n {
            0 => return 0.0,
            1 => return values[0],
            _ => {}
        }

        let i = if range < xs[0] {
            0
        } else if range > xs[n - 1] {
            n - 2
        } else {
            xs.partition_point(|&x| x <= range)
                .saturating_sub(1)
                .min(n - 2)
        };

        let value = lerp(xs[i], values[i], xs[i + 1], values[i + 1], range);
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

fn lerp(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if x1 == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
