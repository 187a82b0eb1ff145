//! Telemetry frame decoder
//!
//! Pure function of (ids, frame). Malformed frames are logged and dropped,
//! unknown ids are ignored, and an unknown ammo side code is returned as an
//! error because it means the bus is out of step with our id table.

use serde::{Deserialize, Serialize};

use super::{AmmoRack, BusFrame, BusIds, ProtocolError};
use crate::Side;

/// Fixed-point scale of module voltage and current
const MODULE_VI_SCALE: f32 = 0.01;
/// Fixed-point scale of module power
const MODULE_POWER_SCALE: f32 = 0.1;
/// Module telemetry frames are always full length
const MODULE_FRAME_LEN: usize = 8;
/// Ammo status frames carry side + three flag bytes after a leading byte
const AMMO_FRAME_MIN_LEN: usize = 5;

/// One power module reading from a node in the telemetry block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleReading {
    /// Offset of the frame id inside the module telemetry block
    pub node_id: u32,
    pub module_index: u8,
    /// Volts
    pub voltage: f32,
    /// Amperes
    pub current: f32,
    /// Watts
    pub power: f32,
    /// Degrees Celsius, raw
    pub temperature: u8,
}

/// Sensed (not commanded) gun angles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CannonAngle {
    pub side: Side,
    /// Elevation, degrees
    pub angle: f32,
    /// Train direction, degrees
    pub direction: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoStatus {
    pub side: Side,
    pub rack: AmmoRack,
}

/// A decoded bus frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TelemetryEvent {
    /// Optoelectronic range, kilometers
    DistanceReading { km: f32 },
    /// Optoelectronic bearing from the bow, degrees clockwise
    DirectionReading { deg: f32 },
    CannonAngle(CannonAngle),
    AmmoStatus(AmmoStatus),
    ModuleReading(ModuleReading),
}

/// Turns raw bus frames into [`TelemetryEvent`]s using the configured ids
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    ids: BusIds,
}

impl FrameDecoder {
    pub fn new(ids: BusIds) -> Self {
        FrameDecoder { ids }
    }

    pub fn ids(&self) -> &BusIds {
        &self.ids
    }

    /// Decode a frame.
    ///
    /// Returns `Ok(None)` for unknown ids and for malformed frames (which are
    /// logged), and `Err` only for an ammo status frame with an unknown side
    /// code.
    pub fn decode(&self, frame: &BusFrame) -> Result<Option<TelemetryEvent>, ProtocolError> {
        let id = frame.id();
        let data = frame.payload();

        if self.ids.module_range().contains(&id) {
            return Ok(self.decode_module(id, data));
        }

        if id == self.ids.distance {
            let km = reading_f32(frame, "distance");
            return Ok(km.map(|km| TelemetryEvent::DistanceReading { km }));
        }

        if id == self.ids.direction {
            let deg = reading_f32(frame, "direction");
            return Ok(deg.map(|deg| TelemetryEvent::DirectionReading { deg }));
        }

        if let Some(side) = self.ids.cannon_side(id) {
            if data.len() != 8 {
                return Ok(malformed(frame, "cannon angle"));
            }
            return Ok(match (read_f32_le(data, 0), read_f32_le(data, 4)) {
                (Some(angle), Some(direction)) => {
                    Some(TelemetryEvent::CannonAngle(CannonAngle {
                        side,
                        angle,
                        direction,
                    }))
                }
                _ => malformed(frame, "cannon angle"),
            });
        }

        if id == self.ids.ammo_status {
            return self.decode_ammo(frame);
        }

        log::trace!("Unknown frame 0x{:03X} {:02X?} ignored", id, data);
        Ok(None)
    }

    fn decode_module(&self, id: u32, data: &[u8]) -> Option<TelemetryEvent> {
        if data.len() != MODULE_FRAME_LEN {
            log::warn!(
                "Module telemetry 0x{:03X} len {} dropped: {:02X?}",
                id,
                data.len(),
                data
            );
            return None;
        }

        let fixed = |hi: u8, lo: u8, scale: f32| u16::from_be_bytes([hi, lo]) as f32 * scale;

        Some(TelemetryEvent::ModuleReading(ModuleReading {
            node_id: id - self.ids.module_first,
            module_index: data[0],
            voltage: fixed(data[1], data[2], MODULE_VI_SCALE),
            current: fixed(data[3], data[4], MODULE_VI_SCALE),
            power: fixed(data[5], data[6], MODULE_POWER_SCALE),
            temperature: data[7],
        }))
    }

    fn decode_ammo(&self, frame: &BusFrame) -> Result<Option<TelemetryEvent>, ProtocolError> {
        let data = frame.payload();
        if data.len() < AMMO_FRAME_MIN_LEN {
            return Ok(malformed(frame, "ammo status"));
        }

        let code = data[1];
        let side = match self.ids.ammo_side(code) {
            Some(side) => side,
            None => {
                log::error!(
                    "Ammo status 0x{:03X} unknown side code 0x{:02X}: {:02X?}",
                    frame.id(),
                    code,
                    data
                );
                return Err(ProtocolError::UnknownSideCode {
                    id: frame.id(),
                    code,
                });
            }
        };

        let rack = AmmoRack::from_bytes([data[2], data[3], data[4]]);
        Ok(Some(TelemetryEvent::AmmoStatus(AmmoStatus { side, rack })))
    }
}

/// Value of a 4 or 8 byte sensor frame. In the 8 byte form the reading is
/// the first value; the second one is not used by targeting.
fn reading_f32(frame: &BusFrame, what: &str) -> Option<f32> {
    match frame.len() {
        4 | 8 => read_f32_le(frame.payload(), 0),
        _ => malformed(frame, what),
    }
}

fn read_f32_le(data: &[u8], offset: usize) -> Option<f32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some(f32::from_le_bytes(bytes))
}

fn malformed<T>(frame: &BusFrame, what: &str) -> Option<T> {
    log::warn!(
        "Malformed {} frame 0x{:03X} len {} dropped: {:02X?}",
        what,
        frame.id(),
        frame.len(),
        frame.payload()
    );
    None
}
