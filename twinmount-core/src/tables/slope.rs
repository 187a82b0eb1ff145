//! Slope correction table
//!
//! Grid of elevation corrections (mils) indexed by target slope angle
//! (degrees, first column) and current elevation (mils, remaining column
//! headers). The grid is kept in file order so that nearest-cell ties
//! resolve to the first row or column as written.

use ndarray::Array2;
use std::io::Read;

use super::{parse_number, TableError};

#[derive(Debug, Clone, PartialEq)]
pub struct SlopeCorrectionTable {
    /// Row headers, degrees, file order
    slopes: Vec<f64>,
    /// Column headers, mils, file order
    elevations: Vec<f64>,
    /// Indexed as [slope row, elevation column]
    values: Array2<f64>,
    slope_order: Vec<usize>,
    elevation_order: Vec<usize>,
}

impl SlopeCorrectionTable {
    pub fn from_grid(
        slopes: Vec<f64>,
        elevations: Vec<f64>,
        values: Array2<f64>,
    ) -> Result<Self, TableError> {
        if slopes.is_empty() || elevations.is_empty() {
            return Err(TableError::Empty);
        }
        let (rows, cols) = values.dim();
        if rows != slopes.len() {
            return Err(TableError::LengthMismatch {
                column: "slope",
                found: rows,
                expected: slopes.len(),
            });
        }
        if cols != elevations.len() {
            return Err(TableError::LengthMismatch {
                column: "elevation",
                found: cols,
                expected: elevations.len(),
            });
        }

        Ok(SlopeCorrectionTable {
            slope_order: sorted_order(&slopes),
            elevation_order: sorted_order(&elevations),
            slopes,
            elevations,
            values,
        })
    }

    /// Parse from CSV: header row `<label>,<mils>,<mils>,...`, then one row
    /// per slope angle. Every elevation header must be a number.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv.headers()?.clone();

        let elevations = headers
            .iter()
            .enumerate()
            .skip(1)
            .map(|(column, header)| {
                parse_number(header).ok_or_else(|| TableError::NonNumericHeader {
                    column,
                    header: header.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, TableError>>()?;

        let mut slopes = Vec::new();
        let mut cells = Vec::new();
        for (row, record) in csv.records().enumerate() {
            let record = record?;
            for (col, value) in record.iter().enumerate() {
                let number = parse_number(value).ok_or_else(|| TableError::NonNumericCell {
                    row: row + 1,
                    column: headers.get(col).unwrap_or("").to_string(),
                    value: value.to_string(),
                })?;
                if col == 0 {
                    slopes.push(number);
                } else {
                    cells.push(number);
                }
            }
        }

        if slopes.is_empty() || elevations.is_empty() {
            return Err(TableError::Empty);
        }
        let mut values = Array2::zeros((slopes.len(), elevations.len()));
        for (cell, value) in values.iter_mut().zip(cells) {
            *cell = value;
        }
        SlopeCorrectionTable::from_grid(slopes, elevations, values)
    }

    pub fn rows(&self) -> usize {
        self.slopes.len()
    }

    pub fn columns(&self) -> usize {
        self.elevations.len()
    }

    /// Value of the nearest cell, no interpolation.
    ///
    /// Nearest row by |slope angle - slope|, nearest column by
    /// |elevation header - elevation|, ties to the lowest index.
    pub fn lookup(&self, slope_deg: f64, elevation_mils: f64) -> Option<f64> {
        let row = nearest(&self.slopes, slope_deg)?;
        let col = nearest(&self.elevations, elevation_mils)?;
        Some(self.values[[row, col]])
    }

    /// Bilinear interpolation over the grid; inputs outside the grid are
    /// clamped to its edge.
    pub fn interpolate(&self, slope_deg: f64, elevation_mils: f64) -> Option<f64> {
        if !slope_deg.is_finite() || !elevation_mils.is_finite() {
            return None;
        }
        let (r0, r1, wr) = bracket(&self.slopes, &self.slope_order, slope_deg);
        let (c0, c1, wc) = bracket(&self.elevations, &self.elevation_order, elevation_mils);

        let q00 = self.values[[r0, c0]];
        let q01 = self.values[[r0, c1]];
        let q10 = self.values[[r1, c0]];
        let q11 = self.values[[r1, c1]];

        Some(
            q00 * (1.0 - wr) * (1.0 - wc)
                + q01 * (1.0 - wr) * wc
                + q10 * wr * (1.0 - wc)
                + q11 * wr * wc,
        )
    }
}

fn sorted_order(axis: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..axis.len()).collect();
    order.sort_by(|&a, &b| axis[a].total_cmp(&axis[b]));
    order
}

fn nearest(axis: &[f64], value: f64) -> Option<usize> {
    if !value.is_finite() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in axis.iter().enumerate() {
        let d = (x - value).abs();
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// (lower index, upper index, weight toward upper) along an axis visited in
/// ascending `order`
fn bracket(axis: &[f64], order: &[usize], value: f64) -> (usize, usize, f64) {
    let n = order.len();
    let first = order[0];
    let last = order[n - 1];
    if n == 1 || value <= axis[first] {
        return (first, first, 0.0);
    }
    if value >= axis[last] {
        return (last, last, 0.0);
    }
    let k = order.partition_point(|&i| axis[i] <= value);
    let (lo, hi) = (order[k - 1], order[k]);
    (lo, hi, (value - axis[lo]) / (axis[hi] - axis[lo]))
}
