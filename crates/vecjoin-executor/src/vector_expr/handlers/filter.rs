use vecjoin_common::error::Result;
use vecjoin_storage::ColumnBatch;

use crate::vector_expr::CompareOp;

/// Keeps rows whose long value is non-null and non-zero.
pub(crate) fn eval_select_column_is_true(batch: &mut ColumnBatch, input: usize) -> Result<()> {
    let (col, selection) = batch.filter_parts(input)?;
    let slots = col.longs()?;
    if col.is_repeating {
        if col.is_null(0) || slots[0] == 0 {
            selection.clear_rows();
        }
    } else if col.no_nulls {
        selection.retain(|i| slots[i] != 0);
    } else {
        let nulls = col.nulls();
        selection.retain(|i| !nulls.is_null(i) && slots[i] != 0);
    }
    Ok(())
}

/// Keeps rows where `input op scalar` holds; null rows never pass.
pub(crate) fn eval_filter_long_compare_scalar(
    batch: &mut ColumnBatch,
    op: CompareOp,
    input: usize,
    scalar: i64,
) -> Result<()> {
    let (col, selection) = batch.filter_parts(input)?;
    let slots = col.longs()?;
    if col.is_repeating {
        if col.is_null(0) || !op.apply(&slots[0], &scalar) {
            selection.clear_rows();
        }
    } else if col.no_nulls {
        selection.retain(|i| op.apply(&slots[i], &scalar));
    } else {
        let nulls = col.nulls();
        selection.retain(|i| !nulls.is_null(i) && op.apply(&slots[i], &scalar));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use vecjoin_common::types::{DataType, Value};

    use super::*;

    fn bool_batch(values: &[Option<bool>]) -> ColumnBatch {
        let mut batch = ColumnBatch::new(8, &[DataType::Bool]);
        for (i, v) in values.iter().enumerate() {
            batch.column_mut(0).unwrap().set_value(i, &Value::from(*v)).unwrap();
        }
        batch.set_size(values.len()).unwrap();
        batch
    }

    #[test]
    fn test_select_is_true_drops_false_and_null() {
        let mut batch = bool_batch(&[Some(true), None, Some(false), Some(true)]);
        eval_select_column_is_true(&mut batch, 0).unwrap();
        assert_eq!(batch.size(), 2);
        assert_eq!(batch.active_rows().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_select_is_true_repeating() {
        let mut batch = bool_batch(&[Some(true), Some(true)]);
        batch.column_mut(0).unwrap().fill(&Value::Bool(true)).unwrap();
        eval_select_column_is_true(&mut batch, 0).unwrap();
        assert_eq!(batch.size(), 2);
        assert!(!batch.selection().in_use());

        batch.column_mut(0).unwrap().fill(&Value::Null).unwrap();
        eval_select_column_is_true(&mut batch, 0).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_filter_compare_respects_existing_selection() {
        let mut batch = ColumnBatch::new(8, &[DataType::Int64]);
        for i in 0..8 {
            batch
                .column_mut(0)
                .unwrap()
                .set_value(i, &Value::int64(i as i64))
                .unwrap();
        }
        batch.set_selected(&[1, 4, 6, 7]).unwrap();
        eval_filter_long_compare_scalar(&mut batch, CompareOp::NotEq, 0, 6).unwrap();
        assert_eq!(batch.active_rows().collect::<Vec<_>>(), vec![1, 4, 7]);
    }
}
