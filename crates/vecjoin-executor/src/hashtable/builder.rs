use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::{DataType, Value};
use vecjoin_storage::{ColumnBatch, Record};

use super::container::EntryMap;
use super::{HashTableContainer, JoinKey};

fn check_types(what: &str, values: &[Value], types: &[DataType]) -> Result<()> {
    if values.len() != types.len() {
        return Err(Error::configuration(format!(
            "{} has {} components, table expects {}",
            what,
            values.len(),
            types.len()
        )));
    }
    for (v, t) in values.iter().zip(types) {
        match v.data_type() {
            Some(actual) if actual != *t => {
                return Err(Error::type_mismatch(t.to_string(), actual.to_string()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Accumulates build-side rows into a [`HashTableContainer`].
#[derive(Debug)]
pub struct HashTableBuilder {
    key_types: Vec<DataType>,
    value_types: Vec<DataType>,
    entries: EntryMap,
    skipped_null_keys: usize,
}

impl HashTableBuilder {
    pub fn new(key_types: Vec<DataType>, value_types: Vec<DataType>) -> Self {
        Self {
            key_types,
            value_types,
            entries: EntryMap::default(),
            skipped_null_keys: 0,
        }
    }

    /// Adds one row. Returns `false` when the key has a null component and
    /// the row was skipped.
    pub fn add_row(&mut self, key: JoinKey, value: Record) -> Result<bool> {
        check_types("join key", key.values(), &self.key_types)?;
        check_types("value row", value.values(), &self.value_types)?;
        if key.has_null() {
            self.skipped_null_keys += 1;
            return Ok(false);
        }
        self.entries.entry(key).or_default().push(value);
        Ok(true)
    }

    /// Adds every active row of `batch`, projecting `key_columns` and
    /// `value_columns`. Returns the number of rows added.
    pub fn add_batch(
        &mut self,
        batch: &ColumnBatch,
        key_columns: &[usize],
        value_columns: &[usize],
    ) -> Result<usize> {
        self.check_columns("key", batch, key_columns, &self.key_types)?;
        self.check_columns("value", batch, value_columns, &self.value_types)?;
        let mut added = 0;
        for row in batch.active_rows() {
            let key = JoinKey::from_batch_row(batch, key_columns, row)?;
            if key.has_null() {
                self.skipped_null_keys += 1;
                continue;
            }
            let value = Record::from_batch_row(batch, value_columns, row)?;
            self.entries.entry(key).or_default().push(value);
            added += 1;
        }
        Ok(added)
    }

    fn check_columns(
        &self,
        what: &str,
        batch: &ColumnBatch,
        columns: &[usize],
        types: &[DataType],
    ) -> Result<()> {
        if columns.len() != types.len() {
            return Err(Error::configuration(format!(
                "{} {} columns given, table expects {}",
                columns.len(),
                what,
                types.len()
            )));
        }
        for (&c, t) in columns.iter().zip(types) {
            let actual = batch.column(c)?.data_type();
            if actual != *t {
                return Err(Error::configuration(format!(
                    "{} column {} is {}, table expects {}",
                    what, c, actual, t
                )));
            }
        }
        Ok(())
    }

    pub fn skipped_null_keys(&self) -> usize {
        self.skipped_null_keys
    }

    pub fn build(self) -> HashTableContainer {
        HashTableContainer::from_parts(self.key_types, self.value_types, self.entries)
    }
}
