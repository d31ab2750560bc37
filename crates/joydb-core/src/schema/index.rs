//! Secondary/primary-key indexes over a table's row vector.
//!
//! An index maps a column's canonical key form to the positions of
//! matching rows in the table's row vector, in insertion order. Order
//! is preserved (not a `HashSet`) so that joins driven by an index
//! produce deterministic, insertion-ordered output, matching the
//! non-indexed nested-loop path.

use std::collections::HashMap;

/// A single index over one column.
#[derive(Debug, Clone)]
pub struct Index {
    unique: bool,
    entries: HashMap<String, Vec<usize>>,
}

impl Index {
    #[must_use]
    pub fn new(unique: bool) -> Self {
        Self {
            unique,
            entries: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Row positions recorded under `key`, in insertion order.
    #[must_use]
    pub fn positions(&self, key: &str) -> &[usize] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    /// Whether inserting `key` would violate uniqueness.
    #[must_use]
    pub fn would_violate_unique(&self, key: &str) -> bool {
        self.unique && self.entries.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Records a row position under `key`.
    pub fn insert(&mut self, key: &str, position: usize) {
        self.entries.entry(key.to_string()).or_default().push(position);
    }

    /// Removes a specific position from `key`'s entry, if present.
    pub fn remove_position(&mut self, key: &str, position: usize) {
        if let Some(positions) = self.entries.get_mut(key) {
            positions.retain(|&p| p != position);
        }
    }

    /// Rebuilds the index from scratch given `(position, key)` pairs in
    /// row-vector order. Used after `Delete` shifts row positions, since
    /// patching individual entries would be as expensive as a full
    /// rebuild once any row moves.
    pub fn rebuild<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        self.entries.clear();
        for (position, key) in entries {
            self.entries.entry(key.to_string()).or_default().push(position);
        }
    }
}
