//! A sparse per-block map, the shape every dataflow analysis in this crate
//! returns its results in (dominance frontiers, liveness, loop membership,
//! ...). Kept intentionally dumb: a `HashMap` wrapper with a
//! default-on-miss accessor, so analyses don't each reinvent it.

use std::collections::HashMap;

use jitir_core::BasicBlockId;

pub struct BasicBlockMap<V> {
    entries: HashMap<BasicBlockId, V>,
}

impl<V> BasicBlockMap<V> {
    pub fn new() -> Self {
        BasicBlockMap { entries: HashMap::new() }
    }

    /// Build a map over every block in `blocks`, computing each entry with
    /// `provider`.
    pub fn from_blocks(blocks: impl IntoIterator<Item = BasicBlockId>, mut provider: impl FnMut(BasicBlockId) -> V) -> Self {
        let mut entries = HashMap::new();
        for block in blocks {
            entries.insert(block, provider(block));
        }
        BasicBlockMap { entries }
    }

    pub fn get(&self, block: BasicBlockId) -> Option<&V> {
        self.entries.get(&block)
    }

    pub fn insert(&mut self, block: BasicBlockId, value: V) -> Option<V> {
        self.entries.insert(block, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BasicBlockId, &V)> {
        self.entries.iter()
    }
}

impl<V> Default for BasicBlockMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_blocks_invokes_provider_per_block() {
        let blocks = vec![BasicBlockId(0), BasicBlockId(1), BasicBlockId(2)];
        let map = BasicBlockMap::from_blocks(blocks.clone(), |b| b.0 * 10);
        for block in blocks {
            assert_eq!(*map.get(block).unwrap(), block.0 * 10);
        }
    }
}
