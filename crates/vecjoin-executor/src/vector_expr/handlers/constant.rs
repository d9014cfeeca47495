use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::{DataType, Value};
use vecjoin_storage::ColumnBatch;

/// Fills `output` with a repeating `value`. A null constant becomes a
/// repeating null.
pub(crate) fn eval_constant(
    batch: &mut ColumnBatch,
    value: &Value,
    data_type: DataType,
    output: usize,
) -> Result<()> {
    let col = batch.column_mut(output)?;
    if col.data_type().vector_name() != data_type.vector_name() {
        return Err(Error::type_mismatch(
            data_type.vector_name(),
            col.data_type().vector_name(),
        ));
    }
    col.reset();
    col.fill(value)
}
