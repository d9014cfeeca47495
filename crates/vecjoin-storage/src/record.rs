use serde::{Deserialize, Serialize};
use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::{DataType, Value};

use crate::ColumnBatch;

/// Owned row tuple.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn extend_from(&mut self, other: &Record) {
        self.values.extend_from_slice(&other.values);
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn has_null(&self) -> bool {
        self.values.iter().any(Value::is_null)
    }

    /// Projects `columns` of logical row `row` out of `batch`.
    pub fn from_batch_row(batch: &ColumnBatch, columns: &[usize], row: usize) -> Result<Self> {
        let mut values = Vec::with_capacity(columns.len());
        for &c in columns {
            values.push(batch.column(c)?.get_value(row));
        }
        Ok(Self { values })
    }

    /// Packs records into as many batches of `capacity` rows as needed.
    pub fn to_batches(
        records: &[Record],
        types: &[DataType],
        capacity: usize,
    ) -> Result<Vec<ColumnBatch>> {
        if capacity == 0 {
            return Err(Error::configuration("batch capacity must be positive"));
        }
        let mut batches = Vec::with_capacity(records.len().div_ceil(capacity));
        for chunk in records.chunks(capacity) {
            let mut batch = ColumnBatch::new(capacity, types);
            for (row, record) in chunk.iter().enumerate() {
                if record.len() != types.len() {
                    return Err(Error::configuration(format!(
                        "record has {} values but batch has {} columns",
                        record.len(),
                        types.len()
                    )));
                }
                for (col, value) in record.values.iter().enumerate() {
                    batch.column_mut(col)?.set_value(row, value)?;
                }
            }
            batch.set_size(chunk.len())?;
            batches.push(batch);
        }
        Ok(batches)
    }
}

impl std::ops::Index<usize> for Record {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self::from_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn test_from_batch_row_honors_nulls() {
        let mut batch = ColumnBatch::new(4, &[DataType::Int64, DataType::String]);
        batch.column_mut(0).unwrap().set_value(1, &Value::int64(7)).unwrap();
        batch.column_mut(1).unwrap().set_value(1, &Value::Null).unwrap();
        batch.set_size(2).unwrap();
        let record = Record::from_batch_row(&batch, &[1, 0], 1).unwrap();
        assert_eq!(record.values(), &[Value::Null, Value::int64(7)]);
        assert!(record.has_null());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_from_batch_row_bad_column() {
        let batch = ColumnBatch::new(4, &[DataType::Int64]);
        assert!(Record::from_batch_row(&batch, &[3], 0).is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_to_batches_splits_by_capacity() {
        let records: Vec<Record> = (0..5)
            .map(|i| Record::from_values(vec![Value::int64(i), Value::Bool(i % 2 == 0)]))
            .collect();
        let batches = Record::to_batches(&records, &[DataType::Int64, DataType::Bool], 2).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].size(), 1);
        assert_eq!(batches[1].column(0).unwrap().get_value(1), Value::int64(3));
        assert_eq!(batches[2].column(1).unwrap().get_value(0), Value::Bool(true));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_to_batches_arity_mismatch() {
        let records = vec![Record::from_values(vec![Value::int64(1)])];
        let err = Record::to_batches(&records, &[DataType::Int64, DataType::Int64], 4).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
