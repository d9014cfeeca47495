use vecjoin_common::error::Result;
use vecjoin_storage::ColumnBatch;

use super::kernels::{NullRule, binary_long, unary_to_long};
use crate::vector_expr::CompareOp;

pub(crate) fn eval_long_compare_col(
    batch: &mut ColumnBatch,
    op: CompareOp,
    left: usize,
    right: usize,
    output: usize,
) -> Result<()> {
    let io = batch.io_columns([left, right], output)?;
    binary_long(io, NullRule::Propagate, |a, b| i64::from(op.apply(&a, &b)))
}

pub(crate) fn eval_long_compare_scalar(
    batch: &mut ColumnBatch,
    op: CompareOp,
    input: usize,
    scalar: i64,
    output: usize,
) -> Result<()> {
    let io = batch.io_columns([input], output)?;
    let [col] = io.inputs;
    unary_to_long(io.rows, col, col.longs()?, io.output, |v| {
        i64::from(op.apply(v, &scalar))
    })
}

pub(crate) fn eval_double_compare_scalar(
    batch: &mut ColumnBatch,
    op: CompareOp,
    input: usize,
    scalar: f64,
    output: usize,
) -> Result<()> {
    let io = batch.io_columns([input], output)?;
    let [col] = io.inputs;
    unary_to_long(io.rows, col, col.doubles()?, io.output, |v| {
        i64::from(op.apply(v, &scalar))
    })
}

pub(crate) fn eval_string_compare_scalar(
    batch: &mut ColumnBatch,
    op: CompareOp,
    input: usize,
    scalar: &str,
    output: usize,
) -> Result<()> {
    let io = batch.io_columns([input], output)?;
    let [col] = io.inputs;
    unary_to_long(io.rows, col, col.strings()?, io.output, |v| {
        i64::from(op.apply(v.as_str(), scalar))
    })
}

#[cfg(test)]
mod tests {
    use vecjoin_common::types::{DataType, Value};

    use super::*;

    fn column_values(batch: &ColumnBatch, col: usize) -> Vec<Value> {
        batch
            .active_rows()
            .map(|i| batch.column(col).unwrap().get_value(i))
            .collect()
    }

    #[test]
    fn test_long_compare_col_propagates_nulls() {
        let mut batch = ColumnBatch::new(4, &[DataType::Int64, DataType::Int64, DataType::Bool]);
        let left = [Value::int64(1), Value::int64(5), Value::Null];
        let right = [Value::int64(2), Value::int64(5), Value::int64(0)];
        for i in 0..3 {
            batch.column_mut(0).unwrap().set_value(i, &left[i]).unwrap();
            batch.column_mut(1).unwrap().set_value(i, &right[i]).unwrap();
        }
        batch.set_size(3).unwrap();
        eval_long_compare_col(&mut batch, CompareOp::LtEq, 0, 1, 2).unwrap();
        assert_eq!(
            column_values(&batch, 2),
            vec![Value::Bool(true), Value::Bool(true), Value::Null]
        );
    }

    #[test]
    fn test_long_compare_scalar_with_selection() {
        let mut batch = ColumnBatch::new(4, &[DataType::Int64, DataType::Bool]);
        for i in 0..4 {
            batch
                .column_mut(0)
                .unwrap()
                .set_value(i, &Value::int64(i as i64 * 10))
                .unwrap();
        }
        batch.set_selected(&[1, 3]).unwrap();
        eval_long_compare_scalar(&mut batch, CompareOp::Gt, 0, 15, 1).unwrap();
        assert_eq!(
            column_values(&batch, 1),
            vec![Value::Bool(false), Value::Bool(true)]
        );
    }

    #[test]
    fn test_double_compare_scalar_repeating() {
        let mut batch = ColumnBatch::new(4, &[DataType::Float64, DataType::Bool]);
        batch.column_mut(0).unwrap().fill(&Value::float64(2.5)).unwrap();
        batch.set_size(4).unwrap();
        eval_double_compare_scalar(&mut batch, CompareOp::Eq, 0, 2.5, 1).unwrap();
        let out = batch.column(1).unwrap();
        assert!(out.is_repeating);
        assert_eq!(out.get_value(3), Value::Bool(true));
    }

    #[test]
    fn test_string_compare_scalar() {
        let mut batch = ColumnBatch::new(4, &[DataType::String, DataType::Bool]);
        let words = [Value::string("apple"), Value::Null, Value::string("pear")];
        for (i, w) in words.iter().enumerate() {
            batch.column_mut(0).unwrap().set_value(i, w).unwrap();
        }
        batch.set_size(3).unwrap();
        eval_string_compare_scalar(&mut batch, CompareOp::Lt, 0, "banana", 1).unwrap();
        assert_eq!(
            column_values(&batch, 1),
            vec![Value::Bool(true), Value::Null, Value::Bool(false)]
        );
    }

    #[test]
    fn test_string_compare_on_long_column_is_type_mismatch() {
        let mut batch = ColumnBatch::new(2, &[DataType::Int64, DataType::Bool]);
        batch.set_size(1).unwrap();
        let err = eval_string_compare_scalar(&mut batch, CompareOp::Eq, 0, "x", 1).unwrap_err();
        assert!(matches!(
            err,
            vecjoin_common::error::Error::TypeMismatch { .. }
        ));
    }
}
