//! KeyDir implementation
//!
//! HashMap-based index; callers provide synchronization.

use std::collections::HashMap;

use super::Location;

/// Maps each live key to its most recent Location
#[derive(Debug, Default)]
pub struct KeyDir {
    entries: HashMap<Vec<u8>, Location>,
}

impl KeyDir {
    /// Create an empty KeyDir
    pub fn new() -> Self {
        Self::default()
    }

    /// Location of a key's live entry
    pub fn get(&self, key: &[u8]) -> Option<Location> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Install a Location, returning the one it replaces
    pub fn insert(&mut self, key: Vec<u8>, location: Location) -> Option<Location> {
        self.entries.insert(key, location)
    }

    /// Drop a key, returning its last Location
    pub fn remove(&mut self, key: &[u8]) -> Option<Location> {
        self.entries.remove(key)
    }

    /// Point `key` at `new` only if it still points at `expected`
    ///
    /// Returns false when the key was overwritten or removed in the meantime,
    /// leaving the newer state untouched.
    pub fn relocate(&mut self, key: &[u8], expected: Location, new: Location) -> bool {
        match self.entries.get_mut(key) {
            Some(current) if *current == expected => {
                *current = new;
                true
            }
            _ => false,
        }
    }

    /// Copy of every (key, Location) pair at this instant
    pub fn snapshot(&self) -> Vec<(Vec<u8>, Location)> {
        self.entries
            .iter()
            .map(|(key, location)| (key.clone(), *location))
            .collect()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total encoded size of all live entries
    pub fn live_bytes(&self) -> u64 {
        self.entries.values().map(|l| l.length).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Location)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }
}
