//! Ammo rack status bits
//!
//! The ammo status frame carries 18 slot flags packed LSB-first over three
//! bytes: slots 1-8 in the first byte, 9-16 in the second and 17-18 in the
//! two low bits of the third.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Number of ammo slots per gun
pub const AMMO_SLOTS: usize = 18;

bitflags! {
    /// Slot occupancy flags for one gun, slot N at bit N-1
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AmmoRack: u32 {
        const SLOT_1 = 1 << 0;
        const SLOT_2 = 1 << 1;
        const SLOT_3 = 1 << 2;
        const SLOT_4 = 1 << 3;
        const SLOT_5 = 1 << 4;
        const SLOT_6 = 1 << 5;
        const SLOT_7 = 1 << 6;
        const SLOT_8 = 1 << 7;
        const SLOT_9 = 1 << 8;
        const SLOT_10 = 1 << 9;
        const SLOT_11 = 1 << 10;
        const SLOT_12 = 1 << 11;
        const SLOT_13 = 1 << 12;
        const SLOT_14 = 1 << 13;
        const SLOT_15 = 1 << 14;
        const SLOT_16 = 1 << 15;
        const SLOT_17 = 1 << 16;
        const SLOT_18 = 1 << 17;
    }
}

impl AmmoRack {
    /// Unpack the three status bytes (8 + 8 + 2 bits)
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        let bits = bytes[0] as u32 | (bytes[1] as u32) << 8 | ((bytes[2] & 0x03) as u32) << 16;
        AmmoRack::from_bits_truncate(bits)
    }

    /// Pack into the three status bytes
    pub fn to_bytes(self) -> [u8; 3] {
        let bits = self.bits();
        [
            (bits & 0xff) as u8,
            ((bits >> 8) & 0xff) as u8,
            ((bits >> 16) & 0x03) as u8,
        ]
    }

    /// Build a rack from 1-based slot numbers; numbers outside 1..=18 are ignored
    pub fn from_slots(slots: &[u8]) -> Self {
        slots
            .iter()
            .filter(|&&slot| slot >= 1 && slot as usize <= AMMO_SLOTS)
            .fold(AmmoRack::empty(), |rack, &slot| {
                rack | AmmoRack::from_bits_truncate(1 << (slot - 1))
            })
    }

    /// 1-based numbers of the occupied slots, ascending
    pub fn slots(&self) -> Vec<u8> {
        (1..=AMMO_SLOTS as u8)
            .filter(|&slot| self.is_loaded(slot))
            .collect()
    }

    pub fn is_loaded(&self, slot: u8) -> bool {
        slot >= 1 && slot as usize <= AMMO_SLOTS && self.bits() & (1 << (slot - 1)) != 0
    }

    /// The 18 flags in slot order
    pub fn flags(&self) -> [bool; AMMO_SLOTS] {
        let mut flags = [false; AMMO_SLOTS];
        for (i, flag) in flags.iter_mut().enumerate() {
            *flag = self.bits() & (1 << i) != 0;
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_slots() {
        let rack = AmmoRack::from_slots(&[1, 5, 9]);
        let bytes = rack.to_bytes();
        assert_eq!(bytes, [0b0001_0001, 0b0000_0001, 0]);

        let unpacked = AmmoRack::from_bytes(bytes);
        assert_eq!(unpacked.slots(), vec![1, 5, 9]);
    }

    #[test]
    fn test_top_slots_in_third_byte() {
        let rack = AmmoRack::from_bytes([0, 0, 0b11]);
        assert_eq!(rack.slots(), vec![17, 18]);
        assert_eq!(rack, AmmoRack::SLOT_17 | AmmoRack::SLOT_18);
    }

    #[test]
    fn test_unused_bits_ignored() {
        // Only the two low bits of the third byte carry slots
        let rack = AmmoRack::from_bytes([0xff, 0xff, 0xff]);
        assert_eq!(rack, AmmoRack::all());
        assert_eq!(rack.to_bytes(), [0xff, 0xff, 0x03]);
    }

    #[test]
    fn test_out_of_range_slots() {
        let rack = AmmoRack::from_slots(&[0, 19, 200, 18]);
        assert_eq!(rack.slots(), vec![18]);
        assert!(!rack.is_loaded(0));
        assert!(!rack.is_loaded(19));
    }

    #[test]
    fn test_flags() {
        let flags = AmmoRack::from_slots(&[2, 18]).flags();
        assert!(flags[1]);
        assert!(flags[17]);
        assert_eq!(flags.iter().filter(|f| **f).count(), 2);
    }
}
