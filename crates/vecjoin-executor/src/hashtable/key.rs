use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use vecjoin_common::error::Result;
use vecjoin_common::types::Value;
use vecjoin_storage::ColumnBatch;

/// Projected join-key tuple. Each component hashes with a type tag so that
/// equal bit patterns of different types never land in the same entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinKey(Vec<Value>);

impl Eq for JoinKey {}

impl Hash for JoinKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for val in &self.0 {
            match val {
                Value::Null => 0u8.hash(state),
                Value::Bool(b) => {
                    1u8.hash(state);
                    b.hash(state);
                }
                Value::Int64(i) => {
                    2u8.hash(state);
                    i.hash(state);
                }
                Value::Float64(f) => {
                    3u8.hash(state);
                    f.hash(state);
                }
                Value::String(s) => {
                    4u8.hash(state);
                    s.hash(state);
                }
            }
        }
    }
}

impl JoinKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SQL equality never matches a null component.
    pub fn has_null(&self) -> bool {
        self.0.iter().any(Value::is_null)
    }

    pub fn from_batch_row(batch: &ColumnBatch, columns: &[usize], row: usize) -> Result<Self> {
        let mut values = Vec::with_capacity(columns.len());
        for &c in columns {
            values.push(batch.column(c)?.get_value(row));
        }
        Ok(Self(values))
    }
}

impl From<Vec<Value>> for JoinKey {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}
