//! Twin Mount Core - Platform-independent fire-control engine
//!
//! This crate contains the pure computational part of the twin-gun mount
//! console: decoding of field-bus telemetry frames, ship geometry, firing
//! table interpolation, environmental ballistic corrections and the
//! targeting orchestrator that turns all of these into per-gun firing
//! solutions. It performs no socket I/O and spawns no threads; the server
//! crate owns the bus and the timers and calls into this crate.
//!
//! # Modules
//!
//! - [`protocol`]: bus frames, frame decoder and outbound command encoding
//! - [`geometry`]: sensor and gun positions, range/bearing to polar firing geometry
//! - [`tables`]: firing table and slope correction table
//! - [`ballistics`]: environmental correction model
//! - [`targeting`]: per-gun, per-axis auto/manual state and firing solutions
//! - [`telemetry`]: latest module telemetry readings
//!
//! # Example
//!
//! ```rust,ignore
//! use twinmount_core::protocol::{BusFrame, BusIds, FrameDecoder};
//! use twinmount_core::targeting::{Targeting, TargetingConfig};
//! use twinmount_core::tables::TableSet;
//! use twinmount_core::Side;
//!
//! let decoder = FrameDecoder::new(BusIds::default());
//! let mut targeting = Targeting::new(TargetingConfig::default(), TableSet::default());
//!
//! if let Ok(Some(event)) = decoder.decode(&frame) {
//!     targeting.handle_event(&event);
//! }
//! targeting.tick();
//! let solution = targeting.solution(Side::Left);
//! ```

pub mod ballistics;
pub mod geometry;
pub mod protocol;
pub mod tables;
pub mod targeting;
pub mod telemetry;

use serde::{Deserialize, Serialize};

/// Angular mils per full turn
pub const MILS_PER_TURN: f64 = 6400.0;

/// Degrees per angular mil (360 / 6400)
pub const DEGREES_PER_MIL: f64 = 0.05625;

/// Convert angular mils to degrees
pub fn mils_to_degrees(mils: f64) -> f64 {
    mils * DEGREES_PER_MIL
}

/// Convert degrees to angular mils
pub fn degrees_to_mils(degrees: f64) -> f64 {
    degrees / DEGREES_PER_MIL
}

/// One of the two guns of the mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    /// Index into per-gun arrays
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}
