//! The init-time buffer map: named logical ports (`"input"`, `"output"`,
//! `"disparity"`, ...) to the global buffer IDs a caller's
//! [`qcnode_memory::FrameDescriptor`] slots carry (spec §4.E, "Init-time
//! buffer map").

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct BufferIdMap {
    by_name: HashMap<String, u32>,
}

impl BufferIdMap {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }

    /// Builds a map from `{name, id}` pairs as they appear in
    /// `globalBufferIdMap` in the Node's config.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, u32)>) -> Self {
        Self {
            by_name: pairs.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, id: u32) {
        self.by_name.insert(name.into(), id);
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }
}

impl Default for BufferIdMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_named_port_to_global_id() {
        let map = BufferIdMap::from_pairs([("input".to_owned(), 0), ("output".to_owned(), 1)]);
        assert_eq!(map.get("input"), Some(0));
        assert_eq!(map.get("disparity"), None);
    }
}
