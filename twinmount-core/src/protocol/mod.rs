//! Field-bus protocol
//!
//! Frame types, arbitration id assignments, the telemetry decoder and the
//! encoder for outbound aim commands.
//!
//! Two numeric encodings share the bus and must never be unified:
//!
//! | Message | Encoding |
//! |---------|----------|
//! | Module telemetry | big-endian u16 fixed point (x0.01, x0.1), u8 |
//! | Distance / direction / cannon angle | little-endian IEEE-754 f32 |
//! | Ammo status | side code byte + 18 bits LSB-first |

mod ammo;
mod command;
mod decoder;
mod frame;

pub use ammo::{AmmoRack, AMMO_SLOTS};
pub use command::{encode_aim_command, AimCommand};
pub use decoder::{AmmoStatus, CannonAngle, FrameDecoder, ModuleReading, TelemetryEvent};
pub use frame::{BusFrame, BusIds, MAX_PAYLOAD};

use thiserror::Error;

/// Protocol errors that must be surfaced to the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Frame 0x{id:03X} payload of {len} bytes exceeds {MAX_PAYLOAD}")]
    PayloadTooLong { id: u32, len: usize },

    #[error("Ammo status frame 0x{id:03X} has unknown side code 0x{code:02X}")]
    UnknownSideCode { id: u32, code: u8 },
}
