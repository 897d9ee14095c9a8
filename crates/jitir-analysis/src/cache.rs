//! Caches analysis artifacts per method, invalidating them the moment the
//! method's `generation` counter moves -- a "has this changed since I last
//! looked" check scoped to a single in-memory compile rather than a
//! persisted cache.

use std::collections::HashMap;

use jitir_core::{Method, MethodId};

use crate::cfg::Cfg;
use crate::dominators::DominatorTree;
use crate::error::AnalysisError;
use crate::loops::LoopNest;

struct Entry {
    generation: u64,
    cfg: Cfg,
    doms: DominatorTree,
    loops: LoopNest,
}

/// Holds the CFG, dominator tree, and loop nest for every method that has
/// been analyzed so far, recomputing them only when a method's generation
/// has advanced since the cached entry was built.
#[derive(Default)]
pub struct AnalysisCache {
    entries: HashMap<MethodId, Entry>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        AnalysisCache { entries: HashMap::new() }
    }

    /// Fetch (recomputing if stale) the CFG, dominator tree, and loop nest
    /// for `method`.
    pub fn analyze(&mut self, method: &Method) -> Result<(&Cfg, &DominatorTree, &LoopNest), AnalysisError> {
        let stale = match self.entries.get(&method.id) {
            Some(entry) => entry.generation != method.generation,
            None => true,
        };
        if stale {
            let cfg = Cfg::build(method);
            let doms = DominatorTree::forward(&cfg);
            let loops = crate::loops::find_loops(method, &cfg, &doms)?;
            self.entries.insert(
                method.id,
                Entry {
                    generation: method.generation,
                    cfg,
                    doms,
                    loops,
                },
            );
        }
        let entry = &self.entries[&method.id];
        Ok((&entry.cfg, &entry.doms, &entry.loops))
    }

    pub fn invalidate(&mut self, method: MethodId) {
        self.entries.remove(&method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jitir_core::{MethodBuilder, MethodId, TypeId};

    #[test]
    fn stale_generation_triggers_recompute() {
        let mut b = MethodBuilder::new(MethodId(0), "f", vec![], TypeId::UNIT);
        let entry = b.entry_block();
        b.set_insertion_block(entry);
        b.create_return(TypeId::UNIT, None).unwrap();
        let method_v1 = b.commit();

        let mut cache = AnalysisCache::new();
        let (_, _, loops_v1) = cache.analyze(&method_v1).unwrap();
        assert!(loops_v1.loops.is_empty());

        let mut b2 = MethodBuilder::from_method(method_v1.clone());
        b2.create_block();
        let method_v2 = b2.commit();
        assert_eq!(method_v2.generation, method_v1.generation + 1);

        cache.analyze(&method_v2).unwrap();
        cache.invalidate(method_v2.id);
        assert!(cache.analyze(&method_v2).is_ok());
    }
}
