//! Ballistic Correction Model
//!
//! Combines the firing table correction coefficients at the current range
//! with the operator-entered environmental inputs. All arithmetic is done in
//! angular mils; conversion to degrees happens when the correction is folded
//! into a firing solution.
//!
//! The coefficient combination is provisional and reproduced as-is:
//!
//! ```text
//! dElev = ( dXT    * (air_temp    - std_air_temp)
//!         + dXTsz  * (charge_temp - std_charge_temp)
//!         + dXH    * (pressure    - std_pressure)
//!         + dXwhx  * wind_along_low
//!         + dXwbex * wind_along_high
//!         + dXwhz  * wind_cross_low
//!         + dXkacn * propellant ) / dXTbic          (0 when dXTbic == 0)
//!
//! dAz   = dZwhz * wind_cross_low + dZwhx * wind_along_low + dZwbez * wind_cross_high
//! ```
//!
//! Every path degrades to a zero correction: a missing table, a zero
//! divisor or a non-finite input never yields NaN.

use serde::{Deserialize, Serialize};

use crate::mils_to_degrees;
use crate::tables::{Coefficient, FiringColumn, TableSet};

/// Reference conditions the firing table was computed for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StandardConditions {
    /// Degrees Celsius
    pub air_temperature: f64,
    /// Millimeters of mercury
    pub air_pressure: f64,
    /// Degrees Celsius
    pub charge_temperature: f64,
}

impl Default for StandardConditions {
    fn default() -> Self {
        StandardConditions {
            air_temperature: 15.0,
            air_pressure: 750.0,
            charge_temperature: 15.0,
        }
    }
}

/// Operator-entered meteorological and ammunition inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentalInputs {
    /// Along-track wind component near the surface, m/s
    pub wind_along_low: f64,
    /// Along-track wind component aloft, m/s
    pub wind_along_high: f64,
    /// Cross wind component near the surface, m/s
    pub wind_cross_low: f64,
    /// Cross wind component aloft, m/s
    pub wind_cross_high: f64,
    pub air_pressure: f64,
    pub air_temperature: f64,
    pub charge_temperature: f64,
    /// Alternate propellant loaded
    pub alternate_propellant: bool,
    /// Vertical angle of the target relative to the mount, degrees
    pub target_slope_deg: f64,
}

impl Default for EnvironmentalInputs {
    fn default() -> Self {
        let std = StandardConditions::default();
        EnvironmentalInputs {
            wind_along_low: 0.0,
            wind_along_high: 0.0,
            wind_cross_low: 0.0,
            wind_cross_high: 0.0,
            air_pressure: std.air_pressure,
            air_temperature: std.air_temperature,
            charge_temperature: std.charge_temperature,
            alternate_propellant: false,
            target_slope_deg: 0.0,
        }
    }
}

/// How the slope correction table is read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlopeMode {
    /// Nearest cell
    #[default]
    Nearest,
    /// Bilinear interpolation between cells
    Bilinear,
}

/// Firing table coefficients at one range
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionCoefficients {
    pub xt: f64,
    pub xtsz: f64,
    pub xh: f64,
    pub xwhx: f64,
    pub xwbex: f64,
    pub xwhz: f64,
    pub xkacn: f64,
    pub xtbic: f64,
    pub zwhz: f64,
    pub zwhx: f64,
    pub zwbez: f64,
}

impl CorrectionCoefficients {
    /// Interpolate every coefficient at `range`; absent columns read as 0
    pub fn at_range(tables: &TableSet, range: f64) -> Self {
        let c = |coefficient| tables.interpolate(range, FiringColumn::Correction(coefficient));
        CorrectionCoefficients {
            xt: c(Coefficient::XT),
            xtsz: c(Coefficient::XTsz),
            xh: c(Coefficient::XH),
            xwhx: c(Coefficient::Xwhx),
            xwbex: c(Coefficient::Xwbex),
            xwhz: c(Coefficient::Xwhz),
            xkacn: c(Coefficient::Xkacn),
            xtbic: c(Coefficient::XTbic),
            zwhz: c(Coefficient::Zwhz),
            zwhx: c(Coefficient::Zwhx),
            zwbez: c(Coefficient::Zwbez),
        }
    }
}

/// Result of one correction computation, all in mils
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionBreakdown {
    pub coefficients: CorrectionCoefficients,
    /// Meteorological and propellant elevation correction
    pub elevation_mils: f64,
    /// Slope table elevation correction
    pub slope_mils: f64,
    pub azimuth_mils: f64,
}

impl CorrectionBreakdown {
    pub fn total_elevation_mils(&self) -> f64 {
        self.elevation_mils + self.slope_mils
    }

    pub fn elevation_deg(&self) -> f64 {
        mils_to_degrees(self.total_elevation_mils())
    }

    pub fn azimuth_deg(&self) -> f64 {
        mils_to_degrees(self.azimuth_mils)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BallisticModel {
    standard: StandardConditions,
    slope_mode: SlopeMode,
}

impl BallisticModel {
    pub fn new(standard: StandardConditions, slope_mode: SlopeMode) -> Self {
        BallisticModel {
            standard,
            slope_mode,
        }
    }

    pub fn standard(&self) -> &StandardConditions {
        &self.standard
    }

    /// Full correction for a gun at `range` currently laid at
    /// `elevation_mils` (base table elevation)
    pub fn correct(
        &self,
        tables: &TableSet,
        range: f64,
        elevation_mils: f64,
        env: &EnvironmentalInputs,
    ) -> CorrectionBreakdown {
        let coefficients = CorrectionCoefficients::at_range(tables, range);
        CorrectionBreakdown {
            coefficients,
            elevation_mils: self.elevation_correction(&coefficients, env),
            slope_mils: self.slope_correction(tables, elevation_mils, env),
            azimuth_mils: self.azimuth_correction(&coefficients, env),
        }
    }

    pub fn elevation_correction(
        &self,
        c: &CorrectionCoefficients,
        env: &EnvironmentalInputs,
    ) -> f64 {
        if c.xtbic == 0.0 {
            return 0.0;
        }
        let std = &self.standard;
        let propellant = if env.alternate_propellant { 1.0 } else { 0.0 };
        let sum = c.xt * (env.air_temperature - std.air_temperature)
            + c.xtsz * (env.charge_temperature - std.charge_temperature)
            + c.xh * (env.air_pressure - std.air_pressure)
            + c.xwhx * env.wind_along_low
            + c.xwbex * env.wind_along_high
            + c.xwhz * env.wind_cross_low
            + c.xkacn * propellant;
        finite_or_zero(sum / c.xtbic)
    }

    pub fn azimuth_correction(
        &self,
        c: &CorrectionCoefficients,
        env: &EnvironmentalInputs,
    ) -> f64 {
        finite_or_zero(
            c.zwhz * env.wind_cross_low
                + c.zwhx * env.wind_along_low
                + c.zwbez * env.wind_cross_high,
        )
    }

    fn slope_correction(
        &self,
        tables: &TableSet,
        elevation_mils: f64,
        env: &EnvironmentalInputs,
    ) -> f64 {
        let slope = env.target_slope_deg;
        if slope == 0.0 || !slope.is_finite() {
            return 0.0;
        }
        let value = match self.slope_mode {
            SlopeMode::Nearest => tables.slope_lookup(slope, elevation_mils),
            SlopeMode::Bilinear => tables.slope_interpolate(slope, elevation_mils),
        };
        finite_or_zero(value.unwrap_or(0.0))
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{FiringTable, SlopeCorrectionTable};

    const EPS: f64 = 1e-9;

    fn coefficients() -> CorrectionCoefficients {
        CorrectionCoefficients {
            xt: 0.5,
            xtsz: 0.25,
            xh: -0.1,
            xwhx: 1.0,
            xwbex: 2.0,
            xwhz: 3.0,
            xkacn: 4.0,
            xtbic: 2.0,
            zwhz: 0.2,
            zwhx: 0.1,
            zwbez: 0.3,
        }
    }

    fn environment() -> EnvironmentalInputs {
        EnvironmentalInputs {
            wind_along_low: 1.0,
            wind_along_high: 2.0,
            wind_cross_low: 3.0,
            wind_cross_high: 4.0,
            air_pressure: 760.0,
            air_temperature: 25.0,
            charge_temperature: 19.0,
            alternate_propellant: true,
            target_slope_deg: 0.0,
        }
    }

    #[test]
    fn test_elevation_formula() {
        let model = BallisticModel::default();
        // 0.5*10 + 0.25*4 - 0.1*10 + 1*1 + 2*2 + 3*3 + 4*1 = 23, / 2
        let v = model.elevation_correction(&coefficients(), &environment());
        assert!((v - 11.5).abs() < EPS);
    }

    #[test]
    fn test_zero_divisor_gives_zero() {
        let model = BallisticModel::default();
        let mut c = coefficients();
        c.xtbic = 0.0;
        let v = model.elevation_correction(&c, &environment());
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_azimuth_formula() {
        let model = BallisticModel::default();
        // 0.2*3 + 0.1*1 + 0.3*4
        let v = model.azimuth_correction(&coefficients(), &environment());
        assert!((v - 1.9).abs() < EPS);
    }

    #[test]
    fn test_non_finite_input_gives_zero() {
        let model = BallisticModel::default();
        let mut env = environment();
        env.air_temperature = f64::NAN;
        env.wind_cross_low = f64::INFINITY;
        assert_eq!(model.elevation_correction(&coefficients(), &env), 0.0);
        assert_eq!(model.azimuth_correction(&coefficients(), &env), 0.0);
    }

    #[test]
    fn test_standard_conditions_give_no_correction() {
        let model = BallisticModel::default();
        let v = model.elevation_correction(&coefficients(), &EnvironmentalInputs::default());
        assert!(v.abs() < EPS);
    }

    #[test]
    fn test_no_tables_gives_zero_breakdown() {
        let model = BallisticModel::default();
        let b = model.correct(&TableSet::default(), 1500.0, 150.0, &environment());
        assert_eq!(b.total_elevation_mils(), 0.0);
        assert_eq!(b.azimuth_mils, 0.0);
    }

    #[test]
    fn test_correct_from_tables_with_slope() {
        let firing = FiringTable::from_reader(
            "X,P,dXT,dXTbic,dZwhz\n1000,100,1,1,0.5\n2000,200,3,1,1.5\n".as_bytes(),
        )
        .unwrap();
        let slope =
            SlopeCorrectionTable::from_reader("slope,100,200\n0,0,0\n10,5,7\n".as_bytes()).unwrap();
        let tables = TableSet::new(Some(firing), Some(slope));

        let mut env = EnvironmentalInputs::default();
        env.air_temperature = 25.0;
        env.wind_cross_low = 2.0;
        env.target_slope_deg = 9.0;

        let b = BallisticModel::default().correct(&tables, 1500.0, 150.0, &env);
        // dXT at 1500 = 2, times 10 degrees, over dXTbic 1
        assert!((b.elevation_mils - 20.0).abs() < EPS);
        // Nearest: slope 10, elevation 100 (tie goes to first column)
        assert!((b.slope_mils - 5.0).abs() < EPS);
        assert!((b.azimuth_mils - 2.0).abs() < EPS);
        assert!((b.elevation_deg() - 25.0 * 0.05625).abs() < EPS);

        let bilinear = BallisticModel::new(StandardConditions::default(), SlopeMode::Bilinear);
        let b = bilinear.correct(&tables, 1500.0, 150.0, &env);
        // 0.9 of the way to slope 10, halfway between 5 and 7
        assert!((b.slope_mils - 5.4).abs() < EPS);
    }

    #[test]
    fn test_zero_slope_skips_table() {
        let slope =
            SlopeCorrectionTable::from_reader("slope,100\n0,9\n10,9\n".as_bytes()).unwrap();
        let tables = TableSet::new(None, Some(slope));
        let env = EnvironmentalInputs::default();
        let b = BallisticModel::default().correct(&tables, 1000.0, 100.0, &env);
        assert_eq!(b.slope_mils, 0.0);
    }
}
