use vecjoin_common::error::Result;
use vecjoin_storage::ColumnBatch;

/// Writes IS NULL (or IS NOT NULL when `negated`) of `input` into `output`.
/// The result itself is never null.
pub(crate) fn eval_is_null(
    batch: &mut ColumnBatch,
    input: usize,
    output: usize,
    negated: bool,
) -> Result<()> {
    let io = batch.io_columns([input], output)?;
    let [col] = io.inputs;
    let encode = |null: bool| i64::from(null != negated);

    io.output.no_nulls = true;
    io.output.is_repeating = col.no_nulls || col.is_repeating;
    let out = io.output.longs_mut()?;
    if col.no_nulls {
        out[0] = encode(false);
    } else if col.is_repeating {
        out[0] = encode(col.nulls().is_null(0));
    } else {
        let nulls = col.nulls();
        io.rows.for_each(|i| out[i] = encode(nulls.is_null(i)));
    }
    Ok(())
}
