//! Append-only deduplicating table

use std::collections::HashMap;
use std::hash::Hash;

/// Values stored once and referred to by index.
///
/// The first `intern` of a value allocates the next index (the table length at
/// that moment); equal values get the same index back. Entries are never
/// removed or reordered, so an index stays valid for the life of the table.
#[derive(Clone, Debug)]
pub struct InternTable<T: Clone + Eq + Hash> {
    values: Vec<T>,
    index: HashMap<T, u32>,
}

impl<T: Clone + Eq + Hash> Default for InternTable<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> InternTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `value`, appending it if unseen.
    pub fn intern(&mut self, value: T) -> u32 {
        if let Some(&i) = self.index.get(&value) {
            return i;
        }
        let i = self.values.len() as u32;
        self.index.insert(value.clone(), i);
        self.values.push(value);
        i
    }

    /// Append without deduplicating.
    ///
    /// Tables read from a file may legitimately hold duplicates; their indices
    /// must be kept as written. Lookups keep returning the first occurrence.
    pub fn push(&mut self, value: T) -> u32 {
        let i = self.values.len() as u32;
        self.index.entry(value.clone()).or_insert(i);
        self.values.push(value);
        i
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.values.get(index as usize)
    }

    pub fn find(&self, value: &T) -> Option<u32> {
        self.index.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.index.clear();
    }
}

impl<T: Clone + Eq + Hash> PartialEq for InternTable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<T: Clone + Eq + Hash> Eq for InternTable<T> {}

impl<'a, T: Clone + Eq + Hash> IntoIterator for &'a InternTable<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
