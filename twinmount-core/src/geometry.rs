//! Ship Geometry
//!
//! Fixed positions of the optoelectronic sensor and the two guns in a
//! ship-local frame: x to starboard, y toward the bow, origin on the
//! centerline at the sensor's longitudinal station. Bearings are measured
//! clockwise from the bow, so a bearing `b` maps to the direction
//! `(sin b, cos b)` and the gun azimuth is `atan2(dx, dy)`.

use nalgebra::{distance, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::Side;

/// Ship dimensions in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipDimensions {
    pub length: f64,
    pub width: f64,
}

impl Default for ShipDimensions {
    fn default() -> Self {
        ShipDimensions {
            length: 30.0,
            width: 10.0,
        }
    }
}

/// Distance and train angle from a gun to the target
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolarGeometry {
    /// Meters
    pub distance: f64,
    /// Degrees in (-180, 180], 0 = bow, positive to starboard
    pub azimuth_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShipGeometry {
    optoelectronic: Point2<f64>,
    cannon_left: Point2<f64>,
    cannon_right: Point2<f64>,
}

impl Default for ShipGeometry {
    fn default() -> Self {
        ShipGeometry::new(&ShipDimensions::default())
    }
}

impl ShipGeometry {
    pub fn new(dims: &ShipDimensions) -> Self {
        let (l, w) = (dims.length, dims.width);
        ShipGeometry {
            optoelectronic: Point2::new(w / 4.0, 0.0),
            cannon_left: Point2::new(-w / 2.0, l / 4.0),
            cannon_right: Point2::new(w / 2.0, l / 4.0),
        }
    }

    pub fn optoelectronic(&self) -> Point2<f64> {
        self.optoelectronic
    }

    pub fn gun_position(&self, side: Side) -> Point2<f64> {
        match side {
            Side::Left => self.cannon_left,
            Side::Right => self.cannon_right,
        }
    }

    /// Target position from a range/bearing fix taken at the optoelectronic sensor
    pub fn target_position(&self, distance: f64, bearing_deg: f64) -> Point2<f64> {
        if distance == 0.0 {
            return self.optoelectronic;
        }
        let b = bearing_deg.to_radians();
        self.optoelectronic + Vector2::new(b.sin(), b.cos()) * distance
    }

    /// Firing geometry of one gun toward a target position
    pub fn gun_geometry(&self, side: Side, target: &Point2<f64>) -> PolarGeometry {
        firing_geometry(&self.gun_position(side), target)
    }
}

/// Distance and azimuth from `gun` to `target`
pub fn firing_geometry(gun: &Point2<f64>, target: &Point2<f64>) -> PolarGeometry {
    let delta = target - gun;
    PolarGeometry {
        distance: distance(gun, target),
        azimuth_deg: normalize_azimuth(delta.x.atan2(delta.y).to_degrees()),
    }
}

/// Bring an angle into (-180, 180] with at most one turn added or removed
pub fn normalize_azimuth(deg: f64) -> f64 {
    if deg > 180.0 {
        deg - 360.0
    } else if deg <= -180.0 {
        deg + 360.0
    } else {
        deg
    }
}
