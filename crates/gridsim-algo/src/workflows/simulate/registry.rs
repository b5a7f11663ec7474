//! External id <-> internal index bookkeeping.

use std::collections::HashMap;

/// Insertion-ordered bidirectional map between diagram ids and model rows.
#[derive(Debug, Clone, Default)]
pub struct IndexRegistry {
    ids: Vec<(String, usize)>,
    by_id: HashMap<String, usize>,
    by_index: HashMap<usize, usize>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id -> index`. A repeated id keeps its first mapping and
    /// returns false.
    pub fn insert(&mut self, id: &str, index: usize) -> bool {
        if self.by_id.contains_key(id) {
            return false;
        }
        let pos = self.ids.len();
        self.ids.push((id.to_string(), index));
        self.by_id.insert(id.to_string(), pos);
        self.by_index.insert(index, pos);
        true
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).map(|&pos| self.ids[pos].1)
    }

    pub fn id_of(&self, index: usize) -> Option<&str> {
        self.by_index.get(&index).map(|&pos| self.ids[pos].0.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// `(id, index)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.ids.iter().map(|(id, idx)| (id.as_str(), *idx))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
