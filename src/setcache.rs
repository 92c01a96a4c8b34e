use std::collections::HashMap;

use crate::types::{VarId, VarSet};

/// A map keyed by an unordered set of variables, typically a pair.
///
/// `get(a, b)` and `get(b, a)` address the same entry.
#[derive(Debug, Clone)]
pub struct SetCache<V> {
    cache: HashMap<VarSet, V>,
}

impl<V> Default for SetCache<V> {
    fn default() -> Self {
        Self { cache: HashMap::new() }
    }
}

impl<V> SetCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, a: VarId, b: VarId, value: V) {
        self.cache.insert(VarSet::from([a, b]), value);
    }

    pub fn get(&self, a: VarId, b: VarId) -> Option<&V> {
        self.cache.get(&VarSet::from([a, b]))
    }

    pub fn contains(&self, a: VarId, b: VarId) -> bool {
        self.cache.contains_key(&VarSet::from([a, b]))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarSet, &V)> {
        self.cache.iter()
    }
}
