use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use super::ProtocolError;
use crate::Side;

/// Maximum payload length of a classic bus frame
pub const MAX_PAYLOAD: usize = 8;

/// A raw frame as received from (or sent to) the field bus.
///
/// Immutable once built. The payload is stored inline; `len` tells how many
/// of the eight bytes are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFrame {
    id: u32,
    data: [u8; MAX_PAYLOAD],
    len: u8,
    /// Arrival time in milliseconds since the epoch (0 for outbound frames)
    arrival_ms: u64,
}

impl BusFrame {
    pub fn new(id: u32, payload: &[u8], arrival_ms: u64) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLong {
                id,
                len: payload.len(),
            });
        }
        let mut data = [0u8; MAX_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        Ok(BusFrame {
            id,
            data,
            len: payload.len() as u8,
            arrival_ms,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn arrival_ms(&self) -> u64 {
        self.arrival_ms
    }
}

/// Arbitration id assignments on the mount bus.
///
/// Loaded from the configuration file; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusIds {
    /// First id of the contiguous module telemetry block
    pub module_first: u32,
    /// Last id (inclusive) of the module telemetry block
    pub module_last: u32,
    /// Optoelectronic distance (f32 km)
    pub distance: u32,
    /// Optoelectronic direction (f32 degrees)
    pub direction: u32,
    /// Sensed left gun elevation and direction
    pub cannon_left: u32,
    /// Sensed right gun elevation and direction
    pub cannon_right: u32,
    /// Ammo status for either side
    pub ammo_status: u32,
    /// Side code byte in an ammo status frame that means the left gun
    pub ammo_side_left: u8,
    /// Side code byte in an ammo status frame that means the right gun
    pub ammo_side_right: u8,
    /// Outbound aim command for the left gun
    pub aim_left: u32,
    /// Outbound aim command for the right gun
    pub aim_right: u32,
}

impl Default for BusIds {
    fn default() -> Self {
        BusIds {
            module_first: 0x100,
            module_last: 0x11F,
            distance: 0x200,
            direction: 0x201,
            cannon_left: 0x210,
            cannon_right: 0x211,
            ammo_status: 0x220,
            ammo_side_left: 0x01,
            ammo_side_right: 0x02,
            aim_left: 0x300,
            aim_right: 0x301,
        }
    }
}

impl BusIds {
    pub fn module_range(&self) -> RangeInclusive<u32> {
        self.module_first..=self.module_last
    }

    pub fn cannon_side(&self, id: u32) -> Option<Side> {
        if id == self.cannon_left {
            Some(Side::Left)
        } else if id == self.cannon_right {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn ammo_side(&self, code: u8) -> Option<Side> {
        if code == self.ammo_side_left {
            Some(Side::Left)
        } else if code == self.ammo_side_right {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn ammo_side_code(&self, side: Side) -> u8 {
        match side {
            Side::Left => self.ammo_side_left,
            Side::Right => self.ammo_side_right,
        }
    }

    pub fn aim_id(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.aim_left,
            Side::Right => self.aim_right,
        }
    }
}
