use vecjoin_common::error::Result;
use vecjoin_storage::ColumnBatch;

use super::kernels::{NullRule, binary_long, unary_to_long};
use crate::vector_expr::ArithmeticOp;

pub(crate) fn eval_long_arithmetic_col(
    batch: &mut ColumnBatch,
    op: ArithmeticOp,
    left: usize,
    right: usize,
    output: usize,
) -> Result<()> {
    let io = batch.io_columns([left, right], output)?;
    binary_long(io, NullRule::Propagate, |a, b| op.apply(a, b))
}

pub(crate) fn eval_long_arithmetic_scalar(
    batch: &mut ColumnBatch,
    op: ArithmeticOp,
    input: usize,
    scalar: i64,
    output: usize,
) -> Result<()> {
    let io = batch.io_columns([input], output)?;
    let [col] = io.inputs;
    unary_to_long(io.rows, col, col.longs()?, io.output, |v| op.apply(*v, scalar))
}
