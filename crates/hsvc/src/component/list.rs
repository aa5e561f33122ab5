// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Keyed entry collection shared by every registry level.

/// Registry value addressed by a unique string key.
pub trait RegistryEntry {
    /// Lookup key (service name, thread name, role name...).
    fn key(&self) -> &str;

    /// Entry-specific validity rule.
    fn is_valid(&self) -> bool;
}

/// Collection of entries with unique keys.
///
/// Membership order is insertion order but carries no meaning. Every
/// operation is a linear scan; registry lists hold a handful of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryList<E> {
    entries: Vec<E>,
}

impl<E> Default for EntryList<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: RegistryEntry> EntryList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, key: &str) -> Option<&E> {
        self.entries.iter().find(|e| e.key() == key)
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut E> {
        self.entries.iter_mut().find(|e| e.key() == key)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Insert `entry` unless its key is already present.
    ///
    /// Returns `true` if inserted.
    pub fn add(&mut self, entry: E) -> bool {
        if self.contains(entry.key()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Existing entry with the same key, or `entry` after inserting it.
    pub fn add_or_get(&mut self, entry: E) -> &mut E {
        let index = match self.entries.iter().position(|e| e.key() == entry.key()) {
            Some(index) => index,
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    /// Remove the entry with `key`. Returns `true` if it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key() != key);
        self.entries.len() != before
    }

    /// Non-empty and every entry valid.
    pub fn is_valid(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(RegistryEntry::is_valid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, E> {
        self.entries.iter_mut()
    }
}

impl<'a, E: RegistryEntry> IntoIterator for &'a EntryList<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
