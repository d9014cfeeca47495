use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use vecjoin_common::types::DataType;
use vecjoin_storage::Record;

use super::JoinKey;

pub(crate) type EntryMap = HashMap<JoinKey, Vec<Record>, FxBuildHasher>;

/// Immutable join-key to value-rows multimap for one build-side input.
///
/// Produced by [`super::HashTableBuilder::build`] or by decoding a published
/// table; never mutated afterwards, so it is shared across the probe side
/// behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct HashTableContainer {
    key_types: Vec<DataType>,
    value_types: Vec<DataType>,
    entries: EntryMap,
    row_count: usize,
}

impl HashTableContainer {
    pub(crate) fn from_parts(
        key_types: Vec<DataType>,
        value_types: Vec<DataType>,
        entries: EntryMap,
    ) -> Self {
        let row_count = entries.values().map(Vec::len).sum();
        Self {
            key_types,
            value_types,
            entries,
            row_count,
        }
    }

    pub fn get(&self, key: &JoinKey) -> Option<&[Record]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &JoinKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Total value rows across every key.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JoinKey, &[Record])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn key_types(&self) -> &[DataType] {
        &self.key_types
    }

    pub fn value_types(&self) -> &[DataType] {
        &self.value_types
    }
}
