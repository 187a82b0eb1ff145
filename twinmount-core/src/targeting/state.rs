//! Targeting State
//!
//! Everything the orchestrator knows about the target and the two guns. The
//! whole state is one value so the server can hold it behind a single lock
//! and hand out consistent snapshots.

use serde::{Deserialize, Serialize};

use crate::ballistics::{CorrectionBreakdown, EnvironmentalInputs};
use crate::geometry::PolarGeometry;
use crate::protocol::AmmoRack;
use crate::Side;

/// Whether an input axis follows the bus or holds an operator value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisMode {
    #[default]
    Auto,
    Manual,
}

/// Input axes of one gun
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Range,
    Direction,
    Elevation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisModes {
    pub range: AxisMode,
    pub direction: AxisMode,
    pub elevation: AxisMode,
}

impl AxisModes {
    pub fn get(&self, axis: Axis) -> AxisMode {
        match axis {
            Axis::Range => self.range,
            Axis::Direction => self.direction,
            Axis::Elevation => self.elevation,
        }
    }

    pub fn set(&mut self, axis: Axis, mode: AxisMode) {
        match axis {
            Axis::Range => self.range = mode,
            Axis::Direction => self.direction = mode,
            Axis::Elevation => self.elevation = mode,
        }
    }

    pub fn is_auto(&self, axis: Axis) -> bool {
        self.get(axis) == AxisMode::Auto
    }
}

/// Last range/bearing fix from the optoelectronic sensor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFix {
    /// Meters
    pub distance: f64,
    pub bearing_deg: f64,
}

/// Angles commanded to a gun, with the range they were computed for
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiringSolution {
    /// Meters
    pub distance: f64,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

/// Angles a gun reports it is actually at
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensedAngles {
    pub elevation_deg: f64,
    pub direction_deg: f64,
}

/// Operator values used by axes in manual mode
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldValues {
    /// Meters
    pub range: f64,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl HeldValues {
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Range => self.range,
            Axis::Direction => self.azimuth_deg,
            Axis::Elevation => self.elevation_deg,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Range => self.range = value,
            Axis::Direction => self.azimuth_deg = value,
            Axis::Elevation => self.elevation_deg = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GunState {
    pub modes: AxisModes,
    pub held: HeldValues,
    /// Uncorrected geometry from the last fix
    pub geometry: PolarGeometry,
    /// Firing table elevation at the current range
    pub base_elevation_mils: f64,
    pub correction: CorrectionBreakdown,
    /// Commanded angles, after correction and clamping
    pub solution: FiringSolution,
    /// Reported by the gun; never mixed with the commanded solution
    pub sensed: Option<SensedAngles>,
    pub ammo: Option<AmmoRack>,
}

impl GunState {
    /// Range the gun is working with: geometry in auto, held in manual
    pub fn current_range(&self) -> f64 {
        if self.modes.is_auto(Axis::Range) {
            self.geometry.distance
        } else {
            self.held.range
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetingState {
    pub fix: TargetFix,
    pub environment: EnvironmentalInputs,
    pub guns: [GunState; 2],
}

impl TargetingState {
    pub fn gun(&self, side: Side) -> &GunState {
        &self.guns[side.index()]
    }

    pub fn gun_mut(&mut self, side: Side) -> &mut GunState {
        &mut self.guns[side.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_modes_default_auto() {
        let modes = AxisModes::default();
        assert!(modes.is_auto(Axis::Range));
        assert!(modes.is_auto(Axis::Direction));
        assert!(modes.is_auto(Axis::Elevation));
    }

    #[test]
    fn test_axis_modes_set() {
        let mut modes = AxisModes::default();
        modes.set(Axis::Direction, AxisMode::Manual);
        assert_eq!(modes.get(Axis::Direction), AxisMode::Manual);
        assert_eq!(modes.get(Axis::Range), AxisMode::Auto);
    }

    #[test]
    fn test_current_range_follows_mode() {
        let mut gun = GunState::default();
        gun.geometry.distance = 1200.0;
        gun.held.range = 800.0;
        assert_eq!(gun.current_range(), 1200.0);
        gun.modes.range = AxisMode::Manual;
        assert_eq!(gun.current_range(), 800.0);
    }

    #[test]
    fn test_modes_from_partial_config() {
        let modes: AxisModes = serde_json::from_str(r#"{"elevation": "manual"}"#).unwrap();
        assert_eq!(modes.elevation, AxisMode::Manual);
        assert_eq!(modes.range, AxisMode::Auto);
    }
}
