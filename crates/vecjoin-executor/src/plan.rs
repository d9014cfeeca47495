//! The compiled-plan inputs a task hands to the hash-table lifecycle.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::DataType;
use vecjoin_storage::ColumnBatch;

use crate::bucket::BucketMapJoinContext;
use crate::config::HashTableConfig;
use crate::vector_expr::{Mode, VectorExpression};

/// Key and value projection of one join input.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinInputDesc {
    pub key_columns: Vec<usize>,
    pub value_columns: Vec<usize>,
    pub key_types: Vec<DataType>,
    pub value_types: Vec<DataType>,
}

impl JoinInputDesc {
    pub fn new(
        key_columns: Vec<usize>,
        key_types: Vec<DataType>,
        value_columns: Vec<usize>,
        value_types: Vec<DataType>,
    ) -> Self {
        Self {
            key_columns,
            value_columns,
            key_types,
            value_types,
        }
    }
}

/// Map-join operator description: which input is streamed and how every
/// input projects its keys and values.
#[derive(Debug, Clone, PartialEq)]
pub struct MapJoinDesc {
    pub big_table_position: usize,
    pub inputs: Vec<JoinInputDesc>,
    pub dump_file_prefix: String,
    pub bucket_map_join: bool,
    pub bucket_context: Option<BucketMapJoinContext>,
}

impl MapJoinDesc {
    pub fn new(big_table_position: usize, inputs: Vec<JoinInputDesc>) -> Self {
        Self {
            big_table_position,
            inputs,
            dump_file_prefix: crate::config::DEFAULT_DUMP_FILE_PREFIX.to_string(),
            bucket_map_join: false,
            bucket_context: None,
        }
    }

    /// Adopts the configured dump-file prefix. Bucket-aware loading is on
    /// when the config enables it or a bucket context is already attached.
    pub fn with_config(mut self, config: &HashTableConfig) -> Self {
        self.dump_file_prefix = config.dump_file_prefix.clone();
        self.bucket_map_join |= config.bucket_map_join;
        self
    }

    pub fn with_dump_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.dump_file_prefix = prefix.into();
        self
    }

    /// Attaches a bucket context and turns bucket-aware loading on.
    pub fn with_bucket_context(mut self, context: BucketMapJoinContext) -> Self {
        self.bucket_context = Some(context);
        self.bucket_map_join = true;
        self
    }

    pub fn num_positions(&self) -> usize {
        self.inputs.len()
    }

    pub fn input(&self, position: usize) -> Result<&JoinInputDesc> {
        self.inputs.get(position).ok_or_else(|| {
            Error::configuration(format!(
                "join position {} out of range for {} inputs",
                position,
                self.inputs.len()
            ))
        })
    }

    /// Positions that must be backed by a hash table.
    pub fn small_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.inputs.len()).filter(move |p| *p != self.big_table_position)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inputs.len() < 2 {
            return Err(Error::configuration(format!(
                "map join needs at least two inputs, got {}",
                self.inputs.len()
            )));
        }
        if self.big_table_position >= self.inputs.len() {
            return Err(Error::configuration(format!(
                "big table position {} out of range for {} inputs",
                self.big_table_position,
                self.inputs.len()
            )));
        }
        if self.dump_file_prefix.contains('/') {
            return Err(Error::configuration(format!(
                "dump file prefix {:?} must not contain '/'",
                self.dump_file_prefix
            )));
        }
        let big = &self.inputs[self.big_table_position];
        for (pos, input) in self.inputs.iter().enumerate() {
            if input.key_columns.len() != input.key_types.len()
                || input.value_columns.len() != input.value_types.len()
            {
                return Err(Error::configuration(format!(
                    "join position {} has mismatched column and type lists",
                    pos
                )));
            }
            if input.key_types != big.key_types {
                return Err(Error::configuration(format!(
                    "join position {} key types {:?} differ from big table key types {:?}",
                    pos, input.key_types, big.key_types
                )));
            }
        }
        if self.bucket_map_join {
            match &self.bucket_context {
                Some(ctx) => ctx.validate()?,
                None => {
                    return Err(Error::configuration(
                        "bucket map join enabled without a bucket context",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Column types of a joined output row, in position order.
    pub fn output_types(&self) -> Vec<DataType> {
        self.inputs
            .iter()
            .flat_map(|i| i.value_types.iter().copied())
            .collect()
    }
}

/// Identity of the running task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskContext {
    pub task_id: String,
    /// File the streamed side is currently reading, if any.
    pub current_input_path: Option<String>,
}

impl TaskContext {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            current_input_path: None,
        }
    }

    pub fn with_input_path(mut self, path: impl Into<String>) -> Self {
        self.current_input_path = Some(path.into());
        self
    }
}

/// Destination for batches produced by a local sub-pipeline.
pub trait BatchSink {
    fn consume(&mut self, batch: &ColumnBatch) -> Result<()>;
}

/// A build-side sub-pipeline that can run inside the current task.
pub trait BuildSideProducer: Send + Sync {
    /// Pushes every batch of the build side into `sink`, synchronously.
    fn produce(&self, ctx: &TaskContext, sink: &mut dyn BatchSink) -> Result<()>;
}

/// Producer over batches already in memory, optionally narrowed by a filter
/// expression before they reach the sink.
pub struct BatchesProducer {
    batches: Vec<ColumnBatch>,
    filter: Option<VectorExpression>,
}

impl BatchesProducer {
    pub fn new(batches: Vec<ColumnBatch>) -> Self {
        Self {
            batches,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: VectorExpression) -> Result<Self> {
        if filter.mode() != Mode::Filter {
            return Err(Error::configuration(
                "producer filter must be a filter-mode expression",
            ));
        }
        self.filter = Some(filter);
        Ok(self)
    }
}

impl BuildSideProducer for BatchesProducer {
    fn produce(&self, _ctx: &TaskContext, sink: &mut dyn BatchSink) -> Result<()> {
        for batch in &self.batches {
            match &self.filter {
                Some(filter) => {
                    let mut scratch = batch.clone();
                    filter.evaluate(&mut scratch)?;
                    sink.consume(&scratch)?;
                }
                None => sink.consume(batch)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for BatchesProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchesProducer")
            .field("batches", &self.batches.len())
            .field("filter", &self.filter.as_ref().map(|e| e.kind()))
            .finish()
    }
}

/// Task-local resources for building join tables: the shared base directory
/// of published tables and any direct-fetch producers keyed by position.
#[derive(Clone, Default)]
pub struct LocalWork {
    pub base_dir: Option<String>,
    pub direct_fetch: IndexMap<usize, Arc<dyn BuildSideProducer>>,
}

impl LocalWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &HashTableConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            direct_fetch: IndexMap::new(),
        }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<String>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn with_direct_fetch(
        mut self,
        position: usize,
        producer: Arc<dyn BuildSideProducer>,
    ) -> Self {
        self.direct_fetch.insert(position, producer);
        self
    }
}

impl fmt::Debug for LocalWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWork")
            .field("base_dir", &self.base_dir)
            .field("direct_fetch", &self.direct_fetch.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use vecjoin_common::types::Value;

    use super::*;
    use crate::vector_expr::{CompareOp, ExprKind};

    fn two_way() -> MapJoinDesc {
        MapJoinDesc::new(
            0,
            vec![
                JoinInputDesc::new(vec![0], vec![DataType::Int64], vec![1], vec![DataType::String]),
                JoinInputDesc::new(vec![0], vec![DataType::Int64], vec![1], vec![DataType::Bool]),
            ],
        )
    }

    struct Collect(Vec<usize>);

    impl BatchSink for Collect {
        fn consume(&mut self, batch: &ColumnBatch) -> Result<()> {
            self.0.push(batch.size());
            Ok(())
        }
    }

    #[test]
    fn test_validate_ok() {
        let desc = two_way();
        desc.validate().unwrap();
        assert_eq!(desc.small_positions().collect::<Vec<_>>(), vec![1]);
        assert_eq!(desc.output_types(), vec![DataType::String, DataType::Bool]);
    }

    #[test]
    fn test_validate_big_position_out_of_range() {
        let mut desc = two_way();
        desc.big_table_position = 2;
        assert!(matches!(desc.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_validate_key_type_mismatch() {
        let mut desc = two_way();
        desc.inputs[1].key_types = vec![DataType::String];
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_validate_bucket_join_needs_context() {
        let mut desc = two_way();
        desc.bucket_map_join = true;
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("without a bucket context"));
    }

    #[test]
    fn test_with_config_applies_prefix_and_bucket_flag() {
        let config = HashTableConfig {
            dump_file_prefix: "mj-".to_string(),
            bucket_map_join: true,
            ..HashTableConfig::default()
        };
        let desc = two_way().with_config(&config);
        assert_eq!(desc.dump_file_prefix, "mj-");
        assert!(desc.bucket_map_join);

        let attached = two_way()
            .with_bucket_context(BucketMapJoinContext::new())
            .with_config(&HashTableConfig::default());
        assert!(attached.bucket_map_join);
    }

    #[test]
    fn test_validate_prefix_with_slash() {
        let desc = two_way().with_dump_file_prefix("a/b");
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_batches_producer_applies_filter() {
        let mut batch = ColumnBatch::new(4, &[DataType::Int64]);
        for i in 0..4 {
            batch
                .column_mut(0)
                .unwrap()
                .set_value(i, &Value::int64(i as i64))
                .unwrap();
        }
        batch.set_size(4).unwrap();
        let filter = VectorExpression::filter(ExprKind::FilterLongColCompareLongScalar {
            op: CompareOp::Gt,
            input: 0,
            scalar: 1,
        })
        .unwrap();
        let producer = BatchesProducer::new(vec![batch.clone(), batch])
            .with_filter(filter)
            .unwrap();
        let mut sink = Collect(Vec::new());
        producer.produce(&TaskContext::new("t"), &mut sink).unwrap();
        assert_eq!(sink.0, vec![2, 2]);
    }

    #[test]
    fn test_batches_producer_rejects_projection_filter() {
        let e = VectorExpression::col_or_col(0, 1, 2).unwrap();
        assert!(BatchesProducer::new(vec![]).with_filter(e).is_err());
    }
}
