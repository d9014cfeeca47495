use std::sync::Arc;

use vecjoin_common::error::{Error, Result};
use vecjoin_storage::{ColumnBatch, Record};

use crate::hashtable::{HashTableContainer, JoinKey};
use crate::loader::MapJoinTables;
use crate::plan::MapJoinDesc;

/// Inner map join of the streamed input against fully loaded build tables.
///
/// Can only be built from a complete table set, so probing never observes a
/// partially loaded build side.
#[derive(Debug, Clone)]
pub struct MapJoinProbe {
    desc: MapJoinDesc,
    tables: Vec<Option<Arc<HashTableContainer>>>,
}

impl MapJoinProbe {
    pub fn new(desc: MapJoinDesc, tables: MapJoinTables) -> Result<Self> {
        desc.validate()?;
        if tables.len() != desc.num_positions() {
            return Err(Error::configuration(format!(
                "{} join tables for {} join positions",
                tables.len(),
                desc.num_positions()
            )));
        }
        for (position, table) in tables.iter().enumerate() {
            match (position == desc.big_table_position, table) {
                (true, Some(_)) => {
                    return Err(Error::configuration(format!(
                        "streamed position {} must not have a hash table",
                        position
                    )));
                }
                (true, None) => {}
                (false, None) => {
                    return Err(Error::configuration(format!(
                        "join position {} has no hash table",
                        position
                    )));
                }
                (false, Some(table)) => {
                    let input = desc.input(position)?;
                    if table.key_types() != input.key_types.as_slice()
                        || table.value_types() != input.value_types.as_slice()
                    {
                        return Err(Error::type_mismatch(
                            format!("{:?} -> {:?}", input.key_types, input.value_types),
                            format!("{:?} -> {:?}", table.key_types(), table.value_types()),
                        ));
                    }
                }
            }
        }
        Ok(Self { desc, tables })
    }

    pub fn desc(&self) -> &MapJoinDesc {
        &self.desc
    }

    /// Joins the active rows of a streamed batch. Each output record holds the
    /// value columns of every input laid out in position order.
    pub fn probe(&self, batch: &ColumnBatch) -> Result<Vec<Record>> {
        let big = self.desc.input(self.desc.big_table_position)?;
        let mut out = Vec::new();
        let mut matches: Vec<&[Record]> = Vec::with_capacity(self.tables.len());

        'rows: for row in batch.active_rows() {
            let key = JoinKey::from_batch_row(batch, &big.key_columns, row)?;
            if key.has_null() {
                continue;
            }
            matches.clear();
            for table in self.tables.iter().flatten() {
                match table.get(&key) {
                    Some(rows) if !rows.is_empty() => matches.push(rows),
                    _ => continue 'rows,
                }
            }

            let big_values = Record::from_batch_row(batch, &big.value_columns, row)?;
            let mut partial = vec![Record::new()];
            let mut small = matches.iter();
            for table in &self.tables {
                let next: Vec<Record> = match table {
                    None => partial
                        .into_iter()
                        .map(|mut r| {
                            r.extend_from(&big_values);
                            r
                        })
                        .collect(),
                    Some(_) => {
                        let rows = small.next().copied().unwrap_or_default();
                        partial
                            .iter()
                            .flat_map(|p| {
                                rows.iter().map(move |v| {
                                    let mut r = p.clone();
                                    r.extend_from(v);
                                    r
                                })
                            })
                            .collect()
                    }
                };
                partial = next;
            }
            out.extend(partial);
        }
        Ok(out)
    }

    /// [`Self::probe`], packed into batches of at most `capacity` rows.
    pub fn probe_batch(&self, batch: &ColumnBatch, capacity: usize) -> Result<Vec<ColumnBatch>> {
        let records = self.probe(batch)?;
        Record::to_batches(&records, &self.desc.output_types(), capacity)
    }
}

#[cfg(test)]
mod tests {
    use vecjoin_common::types::{DataType, Value};

    use super::*;
    use crate::hashtable::HashTableBuilder;
    use crate::plan::JoinInputDesc;

    fn desc() -> MapJoinDesc {
        MapJoinDesc::new(
            1,
            vec![
                JoinInputDesc::new(vec![0], vec![DataType::Int64], vec![1], vec![DataType::String]),
                JoinInputDesc::new(vec![0], vec![DataType::Int64], vec![1], vec![DataType::Float64]),
                JoinInputDesc::new(vec![0], vec![DataType::Int64], vec![1], vec![DataType::Bool]),
            ],
        )
    }

    fn small(key_rows: &[(i64, Value)], value_type: DataType) -> Arc<HashTableContainer> {
        let mut builder = HashTableBuilder::new(vec![DataType::Int64], vec![value_type]);
        for (k, v) in key_rows {
            builder
                .add_row(
                    JoinKey::new(vec![Value::int64(*k)]),
                    Record::from_values(vec![v.clone()]),
                )
                .unwrap();
        }
        Arc::new(builder.build())
    }

    fn tables() -> MapJoinTables {
        vec![
            Some(small(
                &[
                    (1, Value::string("a1")),
                    (1, Value::string("a2")),
                    (2, Value::string("b")),
                ],
                DataType::String,
            )),
            None,
            Some(small(
                &[(1, Value::bool_val(true)), (3, Value::bool_val(false))],
                DataType::Bool,
            )),
        ]
    }

    fn streamed(keys: &[Option<i64>]) -> ColumnBatch {
        let mut batch = ColumnBatch::new(8, &[DataType::Int64, DataType::Float64]);
        for (i, k) in keys.iter().enumerate() {
            batch.column_mut(0).unwrap().set_value(i, &Value::from(*k)).unwrap();
            batch
                .column_mut(1)
                .unwrap()
                .set_value(i, &Value::float64(i as f64))
                .unwrap();
        }
        batch.set_size(keys.len()).unwrap();
        batch
    }

    #[test]
    fn test_probe_cross_product_in_position_order() {
        let probe = MapJoinProbe::new(desc(), tables()).unwrap();
        let out = probe.probe(&streamed(&[Some(1), Some(2), None, Some(3)])).unwrap();
        assert_eq!(
            out,
            vec![
                Record::from_values(vec![
                    Value::string("a1"),
                    Value::float64(0.0),
                    Value::bool_val(true)
                ]),
                Record::from_values(vec![
                    Value::string("a2"),
                    Value::float64(0.0),
                    Value::bool_val(true)
                ]),
            ]
        );
    }

    #[test]
    fn test_probe_respects_selection() {
        let probe = MapJoinProbe::new(desc(), tables()).unwrap();
        let mut batch = streamed(&[Some(1), Some(1), Some(1)]);
        batch.set_selected(&[2]).unwrap();
        let out = probe.probe(&batch).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r[1] == Value::float64(2.0)));
    }

    #[test]
    fn test_probe_batch_packs_output() {
        let probe = MapJoinProbe::new(desc(), tables()).unwrap();
        let batches = probe.probe_batch(&streamed(&[Some(1), Some(1)]), 3).unwrap();
        assert_eq!(batches.iter().map(|b| b.size()).collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(batches[0].num_columns(), 3);
    }

    #[test]
    fn test_new_requires_every_build_table() {
        let mut t = tables();
        t[2] = None;
        let err = MapJoinProbe::new(desc(), t).unwrap_err();
        assert!(err.to_string().contains("position 2 has no hash table"));
    }

    #[test]
    fn test_new_rejects_table_for_streamed_position() {
        let mut t = tables();
        t[1] = Some(small(&[], DataType::Float64));
        assert!(MapJoinProbe::new(desc(), t).is_err());
    }

    #[test]
    fn test_new_rejects_schema_mismatch() {
        let mut t = tables();
        t[2] = Some(small(&[], DataType::String));
        assert!(matches!(
            MapJoinProbe::new(desc(), t),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
