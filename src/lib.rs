//! vecjoin - the execution core of a distributed SQL task.
//!
//! Two pieces live here: a vectorized expression engine that evaluates
//! column-at-a-time over reusable row batches, and the hash-table lifecycle
//! of a broadcast (map-side) join.
//!
//! ```text
//! build stage:  batches -> HashTableBuilder -> HashTablePublisher -> BlobStore
//! probe task:   BlobStore / direct fetch -> HashTableLoader -> MapJoinProbe
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vecjoin::{ExecutionConfig, InMemoryBlobStore, VecJoinEngine};
//!
//! let engine = VecJoinEngine::new(Arc::new(InMemoryBlobStore::new()), ExecutionConfig::default())?;
//! let task = engine.open_join(&ctx, desc, &work)?;
//! for batch in task.probe(&streamed)? {
//!     // downstream operators
//! }
//! ```

use std::sync::Arc;

pub use vecjoin_common::error::{Error, Result};
pub use vecjoin_common::types::{DataType, Value};
pub use vecjoin_executor::{
    ArithmeticOp, BatchSink, BatchesProducer, BlobStore, BucketMapJoinContext, BucketPruner,
    BuildSideProducer, CollectingSink, CompareOp, Descriptor, ExecutionConfig, ExprArg, ExprKind,
    ExpressionCatalog, HashTableBuilder, HashTableConfig, HashTableContainer, HashTableLoader,
    HashTablePublisher, HashTableSerDe, InMemoryBlobStore, JoinInputDesc, JoinKey,
    LoaderMetrics, LocalFsBlobStore, LocalWork, MapJoinDesc, MapJoinProbe, MapJoinTables, Mode,
    TaskContext, VectorExpression, bucket_file_name, hashtable_path,
};
pub use vecjoin_executor::vector_expr;
pub use vecjoin_storage::{ColumnBatch, ColumnVector, Record};

/// Shared entry point for the tasks of one query: a blob store, the
/// execution settings, and loader counters aggregated across tasks.
///
/// Cheap to clone and safe to share across task threads.
#[derive(Clone)]
pub struct VecJoinEngine {
    store: Arc<dyn BlobStore>,
    config: ExecutionConfig,
    metrics: Arc<LoaderMetrics>,
}

impl VecJoinEngine {
    pub fn new(store: Arc<dyn BlobStore>, config: ExecutionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            metrics: Arc::new(LoaderMetrics::new()),
        })
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<LoaderMetrics> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Publisher writing under the configured base directory.
    pub fn publisher(&self) -> Result<HashTablePublisher> {
        HashTablePublisher::from_config(self.store.clone(), &self.config.hashtable)
    }

    pub fn loader(&self) -> HashTableLoader {
        HashTableLoader::new(self.store.clone())
            .with_config(&self.config.hashtable)
            .with_metrics(self.metrics.clone())
    }

    /// Task-local work seeded with the configured base directory.
    pub fn local_work(&self) -> LocalWork {
        LocalWork::from_config(&self.config.hashtable)
    }

    /// Loads every build-side table for the task and returns a probe ready for
    /// streamed batches. The configured dump-file prefix and bucket flag are
    /// applied to `desc`, so loads resolve the same paths [`Self::publisher`]
    /// writes.
    pub fn open_join(
        &self,
        ctx: &TaskContext,
        desc: MapJoinDesc,
        work: &LocalWork,
    ) -> Result<JoinTask> {
        let desc = desc.with_config(&self.config.hashtable);
        let tables = self.loader().load(ctx, &desc, work)?;
        Ok(JoinTask {
            probe: MapJoinProbe::new(desc, tables)?,
            batch_capacity: self.config.batch_capacity,
        })
    }
}

/// Map join bound to one task's loaded tables.
#[derive(Debug, Clone)]
pub struct JoinTask {
    probe: MapJoinProbe,
    batch_capacity: usize,
}

impl JoinTask {
    /// Joined output of one streamed batch, packed into output batches.
    pub fn probe(&self, batch: &ColumnBatch) -> Result<Vec<ColumnBatch>> {
        self.probe.probe_batch(batch, self.batch_capacity)
    }

    pub fn probe_records(&self, batch: &ColumnBatch) -> Result<Vec<Record>> {
        self.probe.probe(batch)
    }

    pub fn inner(&self) -> &MapJoinProbe {
        &self.probe
    }
}
