#[macro_use]
mod macros;

mod access;

use aligned_vec::{AVec, ConstAlign};
use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::DataType;

use crate::NullBitmap;

pub type A64 = ConstAlign<64>;

/// Dense slot storage of a column vector. Every variant holds exactly
/// `capacity` slots for the lifetime of the vector.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    Long(AVec<i64, A64>),
    Double(AVec<f64, A64>),
    Bytes(Vec<String>),
}

impl VectorData {
    fn name(&self) -> &'static str {
        match self {
            VectorData::Long(_) => "LONG",
            VectorData::Double(_) => "DOUBLE",
            VectorData::Bytes(_) => "BYTES",
        }
    }
}

/// One column of a [`crate::ColumnBatch`].
///
/// `no_nulls` set means the null bitmap must not be consulted. `is_repeating`
/// set means slot 0 holds the value and nullity of every logical row.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnVector {
    data_type: DataType,
    data: VectorData,
    nulls: NullBitmap,
    pub no_nulls: bool,
    pub is_repeating: bool,
}

impl ColumnVector {
    pub fn new(data_type: DataType, capacity: usize) -> Self {
        let data = match data_type {
            DataType::Bool | DataType::Int64 => {
                VectorData::Long(AVec::from_iter(64, std::iter::repeat_n(0i64, capacity)))
            }
            DataType::Float64 => {
                VectorData::Double(AVec::from_iter(64, std::iter::repeat_n(0f64, capacity)))
            }
            DataType::String => VectorData::Bytes(vec![String::new(); capacity]),
        };
        Self {
            data_type,
            data,
            nulls: NullBitmap::new_valid(capacity),
            no_nulls: true,
            is_repeating: false,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn capacity(&self) -> usize {
        with_vector_data!(&self.data, |slots| slots.len())
    }

    pub fn data(&self) -> &VectorData {
        &self.data
    }

    /// Restores the flags to "no nulls, not repeating". Slot values are left
    /// as they are; later writers overwrite them.
    pub fn reset(&mut self) {
        if !self.no_nulls {
            let capacity = self.capacity();
            self.nulls.fill_valid(capacity);
        }
        self.no_nulls = true;
        self.is_repeating = false;
    }

    /// Nullity of logical slot `row`, honoring `no_nulls` and `is_repeating`.
    #[inline]
    pub fn is_null(&self, row: usize) -> bool {
        if self.no_nulls {
            return false;
        }
        let slot = if self.is_repeating { 0 } else { row };
        self.nulls.is_null(slot)
    }

    pub fn nulls(&self) -> &NullBitmap {
        &self.nulls
    }

    pub fn nulls_mut(&mut self) -> &mut NullBitmap {
        &mut self.nulls
    }

    pub fn longs(&self) -> Result<&[i64]> {
        match &self.data {
            VectorData::Long(slots) => Ok(slots.as_slice()),
            other => Err(Error::type_mismatch("LONG", other.name())),
        }
    }

    pub fn longs_mut(&mut self) -> Result<&mut [i64]> {
        match &mut self.data {
            VectorData::Long(slots) => Ok(slots.as_mut_slice()),
            other => Err(Error::type_mismatch("LONG", other.name())),
        }
    }

    pub fn doubles(&self) -> Result<&[f64]> {
        match &self.data {
            VectorData::Double(slots) => Ok(slots.as_slice()),
            other => Err(Error::type_mismatch("DOUBLE", other.name())),
        }
    }

    pub fn doubles_mut(&mut self) -> Result<&mut [f64]> {
        match &mut self.data {
            VectorData::Double(slots) => Ok(slots.as_mut_slice()),
            other => Err(Error::type_mismatch("DOUBLE", other.name())),
        }
    }

    pub fn strings(&self) -> Result<&[String]> {
        match &self.data {
            VectorData::Bytes(slots) => Ok(slots.as_slice()),
            other => Err(Error::type_mismatch("BYTES", other.name())),
        }
    }

    pub fn strings_mut(&mut self) -> Result<&mut [String]> {
        match &mut self.data {
            VectorData::Bytes(slots) => Ok(slots.as_mut_slice()),
            other => Err(Error::type_mismatch("BYTES", other.name())),
        }
    }

    /// Long slots and null bitmap borrowed together, for kernels that write
    /// both in one pass.
    pub fn long_parts_mut(&mut self) -> Result<(&mut [i64], &mut NullBitmap)> {
        match &mut self.data {
            VectorData::Long(slots) => Ok((slots.as_mut_slice(), &mut self.nulls)),
            other => Err(Error::type_mismatch("LONG", other.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn test_new_long_vector() {
        let col = ColumnVector::new(DataType::Int64, 16);
        assert_eq!(col.capacity(), 16);
        assert!(col.no_nulls);
        assert!(!col.is_repeating);
        assert_eq!(col.longs().unwrap().len(), 16);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_bool_is_long_backed() {
        let col = ColumnVector::new(DataType::Bool, 4);
        assert!(col.longs().is_ok());
        assert_eq!(col.data_type(), DataType::Bool);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_wrong_accessor_is_type_mismatch() {
        let col = ColumnVector::new(DataType::Float64, 4);
        let err = col.longs().unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(err.to_string().contains("DOUBLE"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_no_nulls_hides_bitmap() {
        let mut col = ColumnVector::new(DataType::Int64, 4);
        col.nulls_mut().set_null(2);
        assert!(!col.is_null(2));
        col.no_nulls = false;
        assert!(col.is_null(2));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_repeating_reads_slot_zero_nullity() {
        let mut col = ColumnVector::new(DataType::Int64, 4);
        col.no_nulls = false;
        col.is_repeating = true;
        col.nulls_mut().set_null(0);
        assert!(col.is_null(3));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_reset_clears_flags_and_nulls() {
        let mut col = ColumnVector::new(DataType::Int64, 4);
        col.no_nulls = false;
        col.is_repeating = true;
        col.nulls_mut().set_null(1);
        col.reset();
        assert!(col.no_nulls);
        assert!(!col.is_repeating);
        assert!(col.nulls().is_valid(1));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_long_parts_mut() {
        let mut col = ColumnVector::new(DataType::Int64, 4);
        {
            let (slots, nulls) = col.long_parts_mut().unwrap();
            slots[1] = 9;
            nulls.set_null(2);
        }
        assert_eq!(col.longs().unwrap()[1], 9);
        assert!(col.nulls().is_null(2));
    }
}
