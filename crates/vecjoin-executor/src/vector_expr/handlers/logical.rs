use vecjoin_common::error::Result;
use vecjoin_storage::ColumnBatch;

use super::kernels::{NullRule, binary_long, unary_to_long};

/// Three-valued OR of two boolean columns.
pub(crate) fn eval_col_or_col(
    batch: &mut ColumnBatch,
    left: usize,
    right: usize,
    output: usize,
) -> Result<()> {
    let io = batch.io_columns([left, right], output)?;
    binary_long(io, NullRule::KleeneOr, |a, b| a | b)
}

/// Three-valued AND of two boolean columns.
pub(crate) fn eval_col_and_col(
    batch: &mut ColumnBatch,
    left: usize,
    right: usize,
    output: usize,
) -> Result<()> {
    let io = batch.io_columns([left, right], output)?;
    binary_long(io, NullRule::KleeneAnd, |a, b| a & b)
}

pub(crate) fn eval_not_col(batch: &mut ColumnBatch, input: usize, output: usize) -> Result<()> {
    let io = batch.io_columns([input], output)?;
    let [col] = io.inputs;
    unary_to_long(io.rows, col, col.longs()?, io.output, |v| i64::from(*v == 0))
}
