//! Item aggregation - collapse duplicate manifest rows
//!
//! Global invariants enforced:
//! - Item identity is (title, sku, manufacturer) and nothing else
//! - Rows without a usable SKU are skipped, never counted
//! - Distinct keys keep first-occurrence order
//! - Sum of counts equals the number of rows with a usable SKU

use crate::manifest::ManifestRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity of an item in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub title: String,
    pub sku: i64,
    pub manufacturer: String,
}

impl ItemKey {
    pub fn new(title: impl Into<String>, sku: i64, manufacturer: impl Into<String>) -> Self {
        ItemKey {
            title: title.into(),
            sku,
            manufacturer: manufacturer.into(),
        }
    }
}

/// Insertion-ordered item tally
#[derive(Debug, Clone, Default)]
pub struct ItemCounts {
    entries: Vec<(ItemKey, usize)>,
    index: HashMap<ItemKey, usize>,
}

impl ItemCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `key`
    pub fn increment(&mut self, key: ItemKey) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    pub fn get(&self, key: &ItemKey) -> Option<usize> {
        self.index.get(key).map(|&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all counts
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// Entries in first-occurrence order
    pub fn iter(&self) -> impl Iterator<Item = (&ItemKey, usize)> {
        self.entries.iter().map(|(k, n)| (k, *n))
    }

    pub fn into_entries(self) -> Vec<(ItemKey, usize)> {
        self.entries
    }
}

/// Group rows by item identity and count occurrences
pub fn aggregate<'a, I>(rows: I) -> ItemCounts
where
    I: IntoIterator<Item = &'a ManifestRow>,
{
    let mut counts = ItemCounts::new();

    for row in rows {
        let Some(sku) = row.sku else {
            continue;
        };
        counts.increment(ItemKey::new(row.title.as_str(), sku, row.manufacturer.as_str()));
    }

    counts
}
