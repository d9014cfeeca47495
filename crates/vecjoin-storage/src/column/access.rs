use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::{DataType, Value};

use super::{ColumnVector, VectorData};
use crate::RowSelection;

impl ColumnVector {
    /// Reads logical row `row` as an owned value, resolving repeating and
    /// null state.
    pub fn get_value(&self, row: usize) -> Value {
        let slot = if self.is_repeating { 0 } else { row };
        if self.is_null(slot) {
            return Value::Null;
        }
        match (&self.data, self.data_type) {
            (VectorData::Long(slots), DataType::Bool) => Value::Bool(slots[slot] != 0),
            (VectorData::Long(slots), _) => Value::Int64(slots[slot]),
            (VectorData::Double(slots), _) => Value::float64(slots[slot]),
            (VectorData::Bytes(slots), _) => Value::String(slots[slot].clone()),
        }
    }

    /// Writes `value` into slot `row`. A null clears `no_nulls`.
    pub fn set_value(&mut self, row: usize, value: &Value) -> Result<()> {
        if row >= self.capacity() {
            return Err(Error::invariant(format!(
                "row {} is outside vector capacity {}",
                row,
                self.capacity()
            )));
        }
        if value.is_null() {
            self.set_null(row);
            return Ok(());
        }
        match (&mut self.data, value) {
            (VectorData::Long(slots), Value::Bool(_) | Value::Int64(_)) => {
                slots[row] = value.as_long_encoding().unwrap_or_default();
            }
            (VectorData::Double(slots), Value::Float64(f)) => slots[row] = f.0,
            (VectorData::Double(slots), Value::Int64(i)) => slots[row] = *i as f64,
            (VectorData::Bytes(slots), Value::String(s)) => {
                slots[row].clear();
                slots[row].push_str(s);
            }
            (data, other) => {
                return Err(Error::type_mismatch(
                    data.name(),
                    other
                        .data_type()
                        .map_or_else(|| "NULL".to_string(), |t| t.to_string()),
                ));
            }
        }
        self.nulls.set_valid(row);
        Ok(())
    }

    pub fn set_null(&mut self, row: usize) {
        self.no_nulls = false;
        self.nulls.set_null(row);
    }

    /// Turns the vector into a repeating vector holding `value`.
    pub fn fill(&mut self, value: &Value) -> Result<()> {
        self.is_repeating = true;
        if value.is_null() {
            self.set_null(0);
            return Ok(());
        }
        self.set_value(0, value)?;
        self.no_nulls = true;
        Ok(())
    }

    /// Expands a repeating vector into per-row slots for the active rows so
    /// that callers can write individual rows afterwards.
    pub fn flatten(&mut self, rows: &RowSelection<'_>) {
        if !self.is_repeating {
            return;
        }
        self.is_repeating = false;
        let null0 = !self.no_nulls && self.nulls.is_null(0);
        match &mut self.data {
            VectorData::Long(slots) => {
                let v = slots[0];
                rows.for_each(|i| slots[i] = v);
            }
            VectorData::Double(slots) => {
                let v = slots[0];
                rows.for_each(|i| slots[i] = v);
            }
            VectorData::Bytes(slots) => {
                let v = slots[0].clone();
                rows.for_each(|i| slots[i].clone_from(&v));
            }
        }
        if !self.no_nulls {
            let nulls = &mut self.nulls;
            rows.for_each(|i| nulls.set(i, null0));
        }
    }
}
