use vecjoin_common::error::{Error, Result};
use vecjoin_storage::ColumnBatch;

use super::{HashTableBuilder, HashTableContainer};
use crate::plan::{BatchSink, MapJoinDesc};

/// Temporary sink that turns direct-fetch batches into per-position hash
/// tables. Created and consumed inside a single loader call.
#[derive(Debug)]
pub struct CollectingSink<'a> {
    desc: &'a MapJoinDesc,
    builders: Vec<Option<HashTableBuilder>>,
}

impl<'a> CollectingSink<'a> {
    pub fn new(desc: &'a MapJoinDesc) -> Self {
        Self {
            desc,
            builders: (0..desc.num_positions()).map(|_| None).collect(),
        }
    }

    fn check_position(&self, position: usize) -> Result<()> {
        if position >= self.desc.num_positions() {
            return Err(Error::configuration(format!(
                "join position {} out of range for {} inputs",
                position,
                self.desc.num_positions()
            )));
        }
        if position == self.desc.big_table_position {
            return Err(Error::configuration(format!(
                "position {} is the streamed input and cannot be collected",
                position
            )));
        }
        Ok(())
    }

    /// Starts a table for `position` so that it exists even if no batch ever
    /// arrives.
    pub fn open(&mut self, position: usize) -> Result<()> {
        self.check_position(position)?;
        if self.builders[position].is_none() {
            let input = self.desc.input(position)?;
            self.builders[position] = Some(HashTableBuilder::new(
                input.key_types.clone(),
                input.value_types.clone(),
            ));
        }
        Ok(())
    }

    /// Routes the active rows of `batch` into the table for `position`.
    pub fn consume(&mut self, position: usize, batch: &ColumnBatch) -> Result<()> {
        self.open(position)?;
        let desc = self.desc;
        let input = desc.input(position)?;
        match self.builders[position].as_mut() {
            Some(builder) => {
                builder.add_batch(batch, &input.key_columns, &input.value_columns)?;
                Ok(())
            }
            None => Err(Error::internal(format!(
                "no builder for opened position {}",
                position
            ))),
        }
    }

    /// Adapter feeding one position from a [`crate::plan::BuildSideProducer`].
    pub fn position_sink(&mut self, position: usize) -> Result<PositionSink<'_, 'a>> {
        self.open(position)?;
        Ok(PositionSink {
            sink: self,
            position,
        })
    }

    /// Total rows skipped because of a null key component.
    pub fn skipped_null_keys(&self) -> usize {
        self.builders
            .iter()
            .flatten()
            .map(HashTableBuilder::skipped_null_keys)
            .sum()
    }

    /// Tables indexed by position; positions never opened are `None`.
    pub fn into_tables(self) -> Vec<Option<HashTableContainer>> {
        self.builders
            .into_iter()
            .map(|b| b.map(HashTableBuilder::build))
            .collect()
    }
}

pub struct PositionSink<'s, 'a> {
    sink: &'s mut CollectingSink<'a>,
    position: usize,
}

impl BatchSink for PositionSink<'_, '_> {
    fn consume(&mut self, batch: &ColumnBatch) -> Result<()> {
        self.sink.consume(self.position, batch)
    }
}

#[cfg(test)]
mod tests {
    use vecjoin_common::types::{DataType, Value};

    use super::*;
    use crate::hashtable::JoinKey;
    use crate::plan::JoinInputDesc;

    fn desc() -> MapJoinDesc {
        MapJoinDesc::new(
            0,
            vec![
                JoinInputDesc::new(vec![0], vec![DataType::Int64], vec![], vec![]),
                JoinInputDesc::new(vec![1], vec![DataType::Int64], vec![0], vec![DataType::String]),
                JoinInputDesc::new(vec![0], vec![DataType::Int64], vec![], vec![]),
            ],
        )
    }

    fn small_batch() -> ColumnBatch {
        let mut batch = ColumnBatch::new(4, &[DataType::String, DataType::Int64]);
        for (i, (name, key)) in [("x", 1i64), ("y", 2)].iter().enumerate() {
            batch.column_mut(0).unwrap().set_value(i, &Value::string(*name)).unwrap();
            batch.column_mut(1).unwrap().set_value(i, &Value::int64(*key)).unwrap();
        }
        batch.set_size(2).unwrap();
        batch
    }

    #[test]
    fn test_consume_routes_to_position() {
        let desc = desc();
        let mut sink = CollectingSink::new(&desc);
        sink.consume(1, &small_batch()).unwrap();
        sink.open(2).unwrap();
        let tables = sink.into_tables();
        assert!(tables[0].is_none());
        let t1 = tables[1].as_ref().unwrap();
        assert_eq!(t1.row_count(), 2);
        assert_eq!(
            t1.get(&JoinKey::new(vec![Value::int64(2)])).unwrap()[0][0],
            Value::string("y")
        );
        assert!(tables[2].as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_streamed_and_out_of_range_positions() {
        let desc = desc();
        let mut sink = CollectingSink::new(&desc);
        assert!(sink.consume(0, &small_batch()).is_err());
        assert!(sink.open(3).is_err());
    }

    #[test]
    fn test_position_sink() {
        let desc = desc();
        let mut sink = CollectingSink::new(&desc);
        {
            let mut p = sink.position_sink(1).unwrap();
            BatchSink::consume(&mut p, &small_batch()).unwrap();
        }
        assert_eq!(sink.into_tables()[1].as_ref().unwrap().key_count(), 2);
    }
}
