//! Outbound aim commands
//!
//! An aim command uses the same layout as the sensed cannon angle frame:
//! two little-endian f32 values, azimuth first, then elevation, both in
//! degrees.

use super::{BusFrame, BusIds, ProtocolError};
use crate::targeting::FiringSolution;
use crate::Side;

/// Angles commanded to one gun servo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimCommand {
    pub side: Side,
    pub azimuth_deg: f32,
    pub elevation_deg: f32,
}

impl AimCommand {
    pub fn from_solution(side: Side, solution: &FiringSolution) -> Self {
        AimCommand {
            side,
            azimuth_deg: solution.azimuth_deg as f32,
            elevation_deg: solution.elevation_deg as f32,
        }
    }
}

/// Build the bus frame for an aim command
pub fn encode_aim_command(ids: &BusIds, command: &AimCommand) -> Result<BusFrame, ProtocolError> {
    let mut payload = [0u8; 8];
    payload[..4].copy_from_slice(&command.azimuth_deg.to_le_bytes());
    payload[4..].copy_from_slice(&command.elevation_deg.to_le_bytes());
    BusFrame::new(ids.aim_id(command.side), &payload, 0)
}
