//! Latest power-module readings, one per (node, module) pair.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::protocol::ModuleReading;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleBoard {
    #[serde(serialize_with = "serialize_readings")]
    readings: BTreeMap<(u32, u8), ModuleReading>,
}

impl ModuleBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a reading, replacing the previous one for the same module.
    /// Returns true if the module was not seen before.
    pub fn update(&mut self, reading: ModuleReading) -> bool {
        let key = (reading.node_id, reading.module_index);
        let is_new = self.readings.insert(key, reading).is_none();
        if is_new {
            log::debug!(
                "First reading from node {} module {}",
                reading.node_id,
                reading.module_index
            );
        }
        is_new
    }

    pub fn get(&self, node_id: u32, module_index: u8) -> Option<&ModuleReading> {
        self.readings.get(&(node_id, module_index))
    }

    /// Readings ordered by node, then module
    pub fn iter(&self) -> impl Iterator<Item = &ModuleReading> {
        self.readings.values()
    }

    pub fn node(&self, node_id: u32) -> impl Iterator<Item = &ModuleReading> {
        self.readings
            .range((node_id, u8::MIN)..=(node_id, u8::MAX))
            .map(|(_, reading)| reading)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

// Tuple keys are not valid JSON object keys
fn serialize_readings<S>(
    readings: &BTreeMap<(u32, u8), ModuleReading>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(readings.values())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(node_id: u32, module_index: u8, voltage: f32) -> ModuleReading {
        ModuleReading {
            node_id,
            module_index,
            voltage,
            current: 1.0,
            power: 10.0,
            temperature: 30,
        }
    }

    #[test]
    fn test_update_replaces_same_module() {
        let mut board = ModuleBoard::new();
        assert!(board.update(reading(1, 0, 24.0)));
        assert!(!board.update(reading(1, 0, 25.0)));
        assert_eq!(board.len(), 1);
        assert_eq!(board.get(1, 0).unwrap().voltage, 25.0);
    }

    #[test]
    fn test_iteration_sorted() {
        let mut board = ModuleBoard::new();
        board.update(reading(3, 1, 1.0));
        board.update(reading(1, 2, 2.0));
        board.update(reading(1, 0, 3.0));
        board.update(reading(3, 0, 4.0));

        let keys: Vec<(u32, u8)> = board
            .iter()
            .map(|r| (r.node_id, r.module_index))
            .collect();
        assert_eq!(keys, vec![(1, 0), (1, 2), (3, 0), (3, 1)]);

        let node: Vec<u8> = board.node(3).map(|r| r.module_index).collect();
        assert_eq!(node, vec![0, 1]);
        assert!(board.get(2, 0).is_none());
    }

    #[test]
    fn test_serializes_as_list() {
        let mut board = ModuleBoard::new();
        board.update(reading(2, 5, 12.5));
        let json = serde_json::to_value(&board).unwrap();
        assert_eq!(json["readings"][0]["nodeId"], 2);
        assert_eq!(json["readings"][0]["moduleIndex"], 5);
    }
}
