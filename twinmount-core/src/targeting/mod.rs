//! Targeting Orchestrator
//!
//! Owns the [`TargetingState`] and keeps the two firing solutions current:
//!
//! - distance and direction readings move the target fix and recompute the
//!   uncorrected geometry of both guns
//! - [`Targeting::tick`] re-reads the firing table at each gun's current
//!   range and re-applies the ballistic corrections, because environmental
//!   inputs can change without any bus traffic
//! - every solution is rebuilt as a whole from geometry, held values and
//!   corrections, then clamped to the mount limits
//!
//! Axes in manual mode are never touched by bus data.

mod state;

pub use state::{
    Axis, AxisMode, AxisModes, FiringSolution, GunState, HeldValues, SensedAngles, TargetFix,
    TargetingState,
};

use serde::{Deserialize, Serialize};

use crate::ballistics::{
    BallisticModel, CorrectionBreakdown, EnvironmentalInputs, SlopeMode, StandardConditions,
};
use crate::geometry::{normalize_azimuth, ShipDimensions, ShipGeometry};
use crate::protocol::TelemetryEvent;
use crate::tables::{FiringColumn, TableSet};
use crate::{mils_to_degrees, Side};

const METERS_PER_KM: f64 = 1000.0;

/// Consistent copy of the whole targeting state, handed to display code
pub type TargetingSnapshot = TargetingState;

/// Mechanical travel of the gun servos, degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MountLimits {
    pub azimuth_min_deg: f64,
    pub azimuth_max_deg: f64,
    pub elevation_min_deg: f64,
    pub elevation_max_deg: f64,
}

impl Default for MountLimits {
    fn default() -> Self {
        MountLimits {
            azimuth_min_deg: -170.0,
            azimuth_max_deg: 170.0,
            elevation_min_deg: -5.0,
            elevation_max_deg: 80.0,
        }
    }
}

impl MountLimits {
    /// Swap inverted bounds so clamping is always well defined
    fn sanitized(mut self) -> Self {
        if self.azimuth_min_deg > self.azimuth_max_deg {
            log::warn!(
                "Azimuth limits inverted ({} > {}), swapping",
                self.azimuth_min_deg,
                self.azimuth_max_deg
            );
            std::mem::swap(&mut self.azimuth_min_deg, &mut self.azimuth_max_deg);
        }
        if self.elevation_min_deg > self.elevation_max_deg {
            log::warn!(
                "Elevation limits inverted ({} > {}), swapping",
                self.elevation_min_deg,
                self.elevation_max_deg
            );
            std::mem::swap(&mut self.elevation_min_deg, &mut self.elevation_max_deg);
        }
        self
    }

    pub fn clamp_azimuth(&self, deg: f64) -> f64 {
        saturate(deg, self.azimuth_min_deg, self.azimuth_max_deg)
    }

    pub fn clamp_elevation(&self, deg: f64) -> f64 {
        saturate(deg, self.elevation_min_deg, self.elevation_max_deg)
    }
}

fn saturate(value: f64, min: f64, max: f64) -> f64 {
    let value = if value.is_finite() { value } else { 0.0 };
    value.max(min).min(max)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetingConfig {
    pub ship: ShipDimensions,
    pub limits: MountLimits,
    pub standard: StandardConditions,
    pub slope_mode: SlopeMode,
    pub environment: EnvironmentalInputs,
    pub left_modes: AxisModes,
    pub right_modes: AxisModes,
}

pub struct Targeting {
    geometry: ShipGeometry,
    limits: MountLimits,
    model: BallisticModel,
    tables: TableSet,
    state: TargetingState,
}

impl Targeting {
    pub fn new(config: TargetingConfig, tables: TableSet) -> Self {
        let mut state = TargetingState {
            environment: config.environment,
            ..Default::default()
        };
        state.gun_mut(Side::Left).modes = config.left_modes;
        state.gun_mut(Side::Right).modes = config.right_modes;

        let mut targeting = Targeting {
            geometry: ShipGeometry::new(&config.ship),
            limits: config.limits.sanitized(),
            model: BallisticModel::new(config.standard, config.slope_mode),
            tables,
            state,
        };
        targeting.update_geometry();
        targeting.tick();
        targeting
    }

    /// Apply a decoded bus event. Returns true when targeting state changed.
    pub fn handle_event(&mut self, event: &TelemetryEvent) -> bool {
        match event {
            TelemetryEvent::DistanceReading { km } => self.set_distance_km(*km as f64),
            TelemetryEvent::DirectionReading { deg } => self.set_bearing(*deg as f64),
            TelemetryEvent::CannonAngle(angle) => {
                self.state.gun_mut(angle.side).sensed = Some(SensedAngles {
                    elevation_deg: angle.angle as f64,
                    direction_deg: angle.direction as f64,
                });
                true
            }
            TelemetryEvent::AmmoStatus(status) => {
                self.state.gun_mut(status.side).ammo = Some(status.rack);
                true
            }
            TelemetryEvent::ModuleReading(_) => false,
        }
    }

    /// New optoelectronic range in kilometers
    pub fn set_distance_km(&mut self, km: f64) -> bool {
        if !km.is_finite() || km < 0.0 {
            log::warn!("Distance reading {} km ignored", km);
            return false;
        }
        self.state.fix.distance = km * METERS_PER_KM;
        self.update_geometry();
        true
    }

    /// New optoelectronic bearing in degrees from the bow
    pub fn set_bearing(&mut self, deg: f64) -> bool {
        if !deg.is_finite() {
            log::warn!("Direction reading {} ignored", deg);
            return false;
        }
        self.state.fix.bearing_deg = deg;
        self.update_geometry();
        true
    }

    fn update_geometry(&mut self) {
        let fix = self.state.fix;
        let target = self.geometry.target_position(fix.distance, fix.bearing_deg);
        for side in Side::ALL {
            self.state.gun_mut(side).geometry = self.geometry.gun_geometry(side, &target);
            self.compose(side);
        }
    }

    /// Periodic re-evaluation of elevation and corrections for both guns
    pub fn tick(&mut self) {
        for side in Side::ALL {
            let range = self.state.gun(side).current_range();
            let base = self.tables.interpolate(range, FiringColumn::Elevation);
            let correction = self
                .model
                .correct(&self.tables, range, base, &self.state.environment);

            let gun = self.state.gun_mut(side);
            gun.base_elevation_mils = base;
            gun.correction = correction;
            self.compose(side);
        }
    }

    /// Rebuild a gun's solution from geometry, held values and corrections
    fn compose(&mut self, side: Side) {
        let limits = self.limits;
        let gun = self.state.gun_mut(side);

        let distance = gun.current_range();
        let azimuth = if gun.modes.is_auto(Axis::Direction) {
            normalize_azimuth(gun.geometry.azimuth_deg + gun.correction.azimuth_deg())
        } else {
            gun.held.azimuth_deg
        };
        let elevation = if gun.modes.is_auto(Axis::Elevation) {
            mils_to_degrees(gun.base_elevation_mils + gun.correction.total_elevation_mils())
        } else {
            gun.held.elevation_deg
        };

        gun.solution = FiringSolution {
            distance: if distance.is_finite() { distance.max(0.0) } else { 0.0 },
            azimuth_deg: limits.clamp_azimuth(azimuth),
            elevation_deg: limits.clamp_elevation(elevation),
        };
    }

    /// Switch an axis between bus-driven and held.
    ///
    /// Going to manual captures the value the axis currently has, so the
    /// gun does not move on the switch.
    pub fn set_mode(&mut self, side: Side, axis: Axis, mode: AxisMode) {
        let gun = self.state.gun_mut(side);
        if gun.modes.get(axis) == mode {
            return;
        }
        if mode == AxisMode::Manual {
            let current = match axis {
                Axis::Range => gun.solution.distance,
                Axis::Direction => gun.solution.azimuth_deg,
                Axis::Elevation => gun.solution.elevation_deg,
            };
            gun.held.set(axis, current);
        }
        gun.modes.set(axis, mode);
        log::info!("{} gun {:?} axis now {:?}", side, axis, mode);
        self.tick();
    }

    pub fn mode(&self, side: Side, axis: Axis) -> AxisMode {
        self.state.gun(side).modes.get(axis)
    }

    /// Operator value for an axis; used while the axis is in manual mode
    pub fn set_held(&mut self, side: Side, axis: Axis, value: f64) -> bool {
        if !value.is_finite() {
            log::warn!("{} gun {:?} held value {} ignored", side, axis, value);
            return false;
        }
        self.state.gun_mut(side).held.set(axis, value);
        self.tick();
        true
    }

    pub fn set_environment(&mut self, environment: EnvironmentalInputs) {
        self.state.environment = environment;
    }

    pub fn environment(&self) -> &EnvironmentalInputs {
        &self.state.environment
    }

    pub fn fix(&self) -> TargetFix {
        self.state.fix
    }

    pub fn solution(&self, side: Side) -> FiringSolution {
        self.state.gun(side).solution
    }

    pub fn correction(&self, side: Side) -> CorrectionBreakdown {
        self.state.gun(side).correction
    }

    pub fn sensed(&self, side: Side) -> Option<SensedAngles> {
        self.state.gun(side).sensed
    }

    pub fn limits(&self) -> &MountLimits {
        &self.limits
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    pub fn state(&self) -> &TargetingState {
        &self.state
    }

    pub fn snapshot(&self) -> TargetingSnapshot {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AmmoRack, AmmoStatus, CannonAngle};
    use crate::tables::FiringTable;

    const EPS: f64 = 1e-9;

    fn tables() -> TableSet {
        let firing = FiringTable::from_reader(
            "X,P,dXT,dXTbic,dZwhz\n1000,100,1,1,2\n2000,200,1,1,2\n3000,300,1,1,2\n".as_bytes(),
        )
        .unwrap();
        TableSet::new(Some(firing), None)
    }

    fn targeting() -> Targeting {
        Targeting::new(TargetingConfig::default(), tables())
    }

    #[test]
    fn test_distance_event_updates_both_guns() {
        let mut t = targeting();
        assert!(t.handle_event(&TelemetryEvent::DistanceReading { km: 2.0 }));
        t.tick();

        assert!((t.fix().distance - 2000.0).abs() < EPS);
        let left = t.solution(Side::Left);
        let right = t.solution(Side::Right);
        // Guns are forward of the sensor, so slightly closer than the fix
        assert!(left.distance < 2000.0 && left.distance > 1990.0);
        assert!(right.distance < 2000.0 && right.distance > 1990.0);
        assert!(left.azimuth_deg > 0.0);
        assert!(right.azimuth_deg < 0.0);
    }

    #[test]
    fn test_tick_applies_firing_table_and_correction() {
        let mut t = targeting();
        t.set_mode(Side::Left, Axis::Range, AxisMode::Manual);
        t.set_held(Side::Left, Axis::Range, 1500.0);
        let s = t.solution(Side::Left);
        assert!((s.distance - 1500.0).abs() < EPS);
        assert!((s.elevation_deg - 8.4375).abs() < EPS);

        // Warmer air: dXT=1, dXTbic=1, +10 degrees gives +10 mils
        let mut env = EnvironmentalInputs::default();
        env.air_temperature = 25.0;
        t.set_environment(env);
        // Nothing changes until the next tick
        assert!((t.solution(Side::Left).elevation_deg - 8.4375).abs() < EPS);
        t.tick();
        assert!((t.solution(Side::Left).elevation_deg - 160.0 * 0.05625).abs() < EPS);
        assert!((t.correction(Side::Left).elevation_mils - 10.0).abs() < EPS);
    }

    #[test]
    fn test_cross_wind_moves_azimuth() {
        let mut t = targeting();
        t.handle_event(&TelemetryEvent::DistanceReading { km: 2.0 });
        t.tick();
        let before = t.solution(Side::Right).azimuth_deg;

        let mut env = EnvironmentalInputs::default();
        env.wind_cross_low = 1.0;
        t.set_environment(env);
        t.tick();
        let after = t.solution(Side::Right).azimuth_deg;
        // dZwhz = 2 mils per m/s
        assert!((after - before - 2.0 * 0.05625).abs() < 1e-6);
    }

    #[test]
    fn test_manual_axis_not_overwritten_by_bus() {
        let mut t = targeting();
        t.set_mode(Side::Right, Axis::Direction, AxisMode::Manual);
        t.set_held(Side::Right, Axis::Direction, 42.0);

        t.handle_event(&TelemetryEvent::DirectionReading { deg: -60.0 });
        t.handle_event(&TelemetryEvent::DistanceReading { km: 1.0 });
        t.tick();

        assert_eq!(t.solution(Side::Right).azimuth_deg, 42.0);
        // The other gun still follows the bus
        assert!(t.solution(Side::Left).azimuth_deg < 0.0);
        // The fix itself is always the latest reading
        assert_eq!(t.fix().bearing_deg, -60.0);
    }

    #[test]
    fn test_switch_to_manual_holds_current_value() {
        let mut t = targeting();
        t.handle_event(&TelemetryEvent::DistanceReading { km: 2.5 });
        t.tick();
        let elevation = t.solution(Side::Left).elevation_deg;

        t.set_mode(Side::Left, Axis::Elevation, AxisMode::Manual);
        assert_eq!(t.state().gun(Side::Left).held.elevation_deg, elevation);

        t.handle_event(&TelemetryEvent::DistanceReading { km: 1.0 });
        t.tick();
        assert_eq!(t.solution(Side::Left).elevation_deg, elevation);
        assert!(t.solution(Side::Right).elevation_deg < elevation);
    }

    #[test]
    fn test_solution_clamped_to_limits() {
        let config = TargetingConfig {
            limits: MountLimits {
                azimuth_min_deg: -90.0,
                azimuth_max_deg: 90.0,
                elevation_min_deg: 0.0,
                elevation_max_deg: 10.0,
            },
            ..Default::default()
        };
        let mut t = Targeting::new(config, tables());
        t.handle_event(&TelemetryEvent::DirectionReading { deg: 170.0 });
        t.handle_event(&TelemetryEvent::DistanceReading { km: 3.0 });
        t.tick();

        for side in Side::ALL {
            let s = t.solution(side);
            assert_eq!(s.azimuth_deg, 90.0);
            // 300 mils = 16.875 degrees, above the limit
            assert_eq!(s.elevation_deg, 10.0);
        }
    }

    #[test]
    fn test_inverted_limits_are_swapped() {
        let limits = MountLimits {
            azimuth_min_deg: 90.0,
            azimuth_max_deg: -90.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(limits.clamp_azimuth(120.0), 90.0);
        assert_eq!(limits.clamp_azimuth(f64::NAN), 0.0);
    }

    #[test]
    fn test_no_tables_still_produce_solution() {
        let mut t = Targeting::new(TargetingConfig::default(), TableSet::default());
        t.handle_event(&TelemetryEvent::DistanceReading { km: 1.0 });
        t.handle_event(&TelemetryEvent::DirectionReading { deg: 30.0 });
        t.tick();
        let s = t.solution(Side::Left);
        assert!(s.distance > 0.0);
        assert!(s.azimuth_deg.is_finite());
        assert_eq!(s.elevation_deg, 0.0);
    }

    #[test]
    fn test_non_finite_readings_ignored() {
        let mut t = targeting();
        t.handle_event(&TelemetryEvent::DistanceReading { km: 1.0 });
        assert!(!t.handle_event(&TelemetryEvent::DistanceReading { km: f32::NAN }));
        assert!(!t.handle_event(&TelemetryEvent::DirectionReading { deg: f32::INFINITY }));
        assert!(!t.set_held(Side::Left, Axis::Range, f64::NAN));
        assert!((t.fix().distance - 1000.0).abs() < EPS);
    }

    #[test]
    fn test_sensed_angles_kept_apart_from_solution() {
        let mut t = targeting();
        t.handle_event(&TelemetryEvent::DistanceReading { km: 2.0 });
        t.tick();
        let commanded = t.solution(Side::Left);

        t.handle_event(&TelemetryEvent::CannonAngle(CannonAngle {
            side: Side::Left,
            angle: 3.0,
            direction: -7.0,
        }));
        let sensed = t.sensed(Side::Left).unwrap();
        assert_eq!(sensed.elevation_deg, 3.0);
        assert_eq!(sensed.direction_deg, -7.0);
        assert_eq!(t.solution(Side::Left), commanded);
        assert!(t.sensed(Side::Right).is_none());
    }

    #[test]
    fn test_ammo_status_recorded() {
        let mut t = targeting();
        let rack = AmmoRack::from_slots(&[1, 2]);
        t.handle_event(&TelemetryEvent::AmmoStatus(AmmoStatus {
            side: Side::Right,
            rack,
        }));
        assert_eq!(t.state().gun(Side::Right).ammo, Some(rack));
        assert_eq!(t.state().gun(Side::Left).ammo, None);
    }

    #[test]
    fn test_snapshot_serializes() {
        let t = targeting();
        let json = serde_json::to_value(t.snapshot()).unwrap();
        assert_eq!(json["guns"][0]["modes"]["range"], "auto");
        assert!(json["guns"][1]["solution"]["elevationDeg"].is_number());
    }
}
