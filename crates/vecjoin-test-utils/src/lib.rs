#![allow(dead_code)]

use vecjoin_common::types::{DataType, Value};
use vecjoin_common::Result;
use vecjoin_storage::{ColumnBatch, Record};

/// One input column of a test batch.
#[derive(Debug, Clone, PartialEq)]
pub enum TestColumn {
    /// Per-row values, `None` is null.
    Bools(Vec<Option<bool>>),
    Longs(Vec<Option<i64>>),
    /// Repeating column: slot 0 applies to every row.
    RepeatingBool(Option<bool>),
    RepeatingLong(Option<i64>),
}

impl TestColumn {
    fn data_type(&self) -> DataType {
        match self {
            TestColumn::Bools(_) | TestColumn::RepeatingBool(_) => DataType::Bool,
            TestColumn::Longs(_) | TestColumn::RepeatingLong(_) => DataType::Int64,
        }
    }
}

/// Builds a batch of `size` rows from `columns`, followed by `extra_outputs`
/// empty columns for expressions to write into. Columns without nulls keep
/// `no_nulls` set.
pub fn batch_of(size: usize, columns: &[TestColumn], extra_outputs: &[DataType]) -> ColumnBatch {
    let mut types: Vec<DataType> = columns.iter().map(TestColumn::data_type).collect();
    types.extend_from_slice(extra_outputs);
    let mut batch = ColumnBatch::new(size.max(1), &types);
    for (idx, column) in columns.iter().enumerate() {
        let vector = batch.column_mut(idx).expect("column in range");
        match column {
            TestColumn::Bools(values) => {
                assert_eq!(values.len(), size, "column {} length", idx);
                for (row, v) in values.iter().enumerate() {
                    vector.set_value(row, &Value::from(*v)).expect("set bool");
                }
            }
            TestColumn::Longs(values) => {
                assert_eq!(values.len(), size, "column {} length", idx);
                for (row, v) in values.iter().enumerate() {
                    vector.set_value(row, &Value::from(*v)).expect("set long");
                }
            }
            TestColumn::RepeatingBool(v) => vector.fill(&Value::from(*v)).expect("fill bool"),
            TestColumn::RepeatingLong(v) => vector.fill(&Value::from(*v)).expect("fill long"),
        }
    }
    batch.set_size(size).expect("size within capacity");
    batch
}

/// Batch of boolean columns with one output column appended.
pub fn bool_batch(columns: &[&[Option<bool>]]) -> ColumnBatch {
    let size = columns.first().map_or(0, |c| c.len());
    let cols: Vec<TestColumn> = columns
        .iter()
        .map(|c| TestColumn::Bools(c.to_vec()))
        .collect();
    batch_of(size, &cols, &[DataType::Bool])
}

/// Batch of long columns with no extra outputs.
pub fn long_batch(columns: &[&[Option<i64>]]) -> ColumnBatch {
    let size = columns.first().map_or(0, |c| c.len());
    let cols: Vec<TestColumn> = columns
        .iter()
        .map(|c| TestColumn::Longs(c.to_vec()))
        .collect();
    batch_of(size, &cols, &[])
}

/// Batch with a long key column followed by a string value column.
pub fn key_value_batch(rows: &[(Option<i64>, &str)]) -> ColumnBatch {
    let mut batch = ColumnBatch::new(rows.len().max(1), &[DataType::Int64, DataType::String]);
    for (row, (k, v)) in rows.iter().enumerate() {
        batch
            .column_mut(0)
            .expect("key column")
            .set_value(row, &Value::from(*k))
            .expect("set key");
        batch
            .column_mut(1)
            .expect("value column")
            .set_value(row, &Value::string(*v))
            .expect("set value");
    }
    batch.set_size(rows.len()).expect("size within capacity");
    batch
}

/// Values of `column` at every active row.
pub fn active_values(batch: &ColumnBatch, column: usize) -> Vec<Value> {
    let vector = batch.column(column).expect("column in range");
    batch.active_rows().map(|row| vector.get_value(row)).collect()
}

/// Booleans of `column` at every active row, `None` for null.
pub fn active_bools(batch: &ColumnBatch, column: usize) -> Vec<Option<bool>> {
    active_values(batch, column)
        .iter()
        .map(|v| match v {
            Value::Null => None,
            other => Some(other.as_bool().expect("boolean column")),
        })
        .collect()
}

/// Logical rows `0..size` of `column`, ignoring the selection.
pub fn all_bools(batch: &ColumnBatch, column: usize) -> Vec<Option<bool>> {
    let vector = batch.column(column).expect("column in range");
    (0..batch.size())
        .map(|row| vector.get_value(row).as_bool())
        .collect()
}

pub fn records(rows: Vec<Vec<Value>>) -> Vec<Record> {
    rows.into_iter().map(Record::from_values).collect()
}

pub fn assert_error_contains<T>(result: Result<T>, keywords: &[&str]) {
    match result {
        Ok(_) => panic!("Expected error but got Ok result"),
        Err(e) => {
            let error_msg = e.to_string().to_lowercase();
            let found = keywords
                .iter()
                .any(|keyword| error_msg.contains(&keyword.to_lowercase()));
            assert!(
                found,
                "Error message '{}' does not contain any of the expected keywords: {:?}",
                e, keywords
            );
        }
    }
}
